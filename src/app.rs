use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::{error, info};

use crate::averager::PatchSize;
use crate::decoder::PixelSource;
use crate::error::{MosaicError, Result};
use crate::palette::Palette;
use crate::renderer::{MosaicRenderer, RenderStats, register_palette};
use crate::terminal::{CrosstermTerminal, MIN_COLORS, TerminalControl};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub patch_size: PatchSize,
    pub parallel: bool,
}

pub fn open_image_file(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| MosaicError::FileUnreadable {
            path: path.to_path_buf(),
            source,
        })
}

/// Fails unless the terminal can show every palette color.
pub fn preflight<T: TerminalControl>(term: &T, palette: &Palette) -> Result<()> {
    let needed = MIN_COLORS.max(palette.len() as u32);
    term.capabilities().check(needed)
}

/// Previews the PNG at `path` on stdout and waits for a key press.
pub fn run(path: &Path, options: &RunOptions) -> Result<RenderStats> {
    let input = open_image_file(path)?;
    info!("Opened {path:?}");

    let palette = Palette::terminal_default();
    let mut term = CrosstermTerminal::stdout();
    preflight(&term, &palette)?;
    term.start()?;

    run_session(input, &palette, options, &mut term)
}

/// Registers the palette, decodes `input` and presents the mosaic. The
/// terminal is torn down on every path out of here.
pub fn run_session<R: Read, T: TerminalControl>(
    input: R,
    palette: &Palette,
    options: &RunOptions,
    term: &mut T,
) -> Result<RenderStats> {
    let result = render_input(input, palette, options, term);
    let teardown = term.teardown();
    if let Err(e) = &result {
        error!("Preview failed: {e}");
    }
    let stats = result?;
    teardown?;
    Ok(stats)
}

fn render_input<R: Read, T: TerminalControl>(
    input: R,
    palette: &Palette,
    options: &RunOptions,
    term: &mut T,
) -> Result<RenderStats> {
    register_palette(term, palette)?;

    let mut source = PixelSource::init(input)?;
    let image = source.get_image()?;
    info!(
        "Decoded {}x{} image with {} channels",
        image.width(),
        image.height(),
        image.channels()
    );

    let stats = MosaicRenderer::new(palette, options.patch_size)
        .parallel(options.parallel)
        .present(image, term)?;
    source.free();
    Ok(stats)
}
