pub mod app;
pub mod averager;
pub mod decoder;
pub mod error;
pub mod event_source;
pub mod image;
pub mod mosaic;
pub mod palette;
pub mod panic_handler;
pub mod renderer;
pub mod settings;
pub mod terminal;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use averager::{Patch, PatchGrid, PatchSize, mean_color};
pub use error::MosaicError;
pub use image::{ImageBuffer, Rgb};
pub use mosaic::{Mosaic, compute_mosaic};
pub use palette::{ColorPair, Palette, ReferenceColor};
pub use renderer::{MosaicRenderer, RenderStats};
pub use terminal::{CrosstermTerminal, TerminalCapabilities, TerminalControl};
