use log::{debug, info};
#[cfg(not(feature = "parallel"))]
use log::warn;

use crate::averager::PatchSize;
use crate::error::Result;
use crate::image::ImageBuffer;
use crate::mosaic::{Mosaic, compute_mosaic};
use crate::palette::{ColorPair, Palette};
use crate::terminal::TerminalControl;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub rows: usize,
    pub glyphs: usize,
}

/// Registers a color pair for every palette entry. Must run before the
/// first glyph is emitted.
pub fn register_palette<T: TerminalControl>(term: &mut T, palette: &Palette) -> Result<()> {
    for pair in palette.color_pairs() {
        term.register_color_pair(pair)?;
    }
    debug!("Registered {} color pairs", palette.len());
    Ok(())
}

/// Writes a mosaic to the terminal: one glyph per patch, a row terminator
/// after every grid row, then a flush.
pub fn emit_mosaic<T: TerminalControl>(mosaic: &Mosaic, term: &mut T) -> Result<RenderStats> {
    let mut stats = RenderStats::default();
    for row in mosaic.rows() {
        for &color in row {
            term.emit_glyph(ColorPair::for_color(color).pair_index)?;
            stats.glyphs += 1;
        }
        term.emit_row_terminator()?;
        stats.rows += 1;
    }
    term.flush()?;
    Ok(stats)
}

pub struct MosaicRenderer<'a> {
    palette: &'a Palette,
    patch_size: PatchSize,
    parallel: bool,
}

impl<'a> MosaicRenderer<'a> {
    pub fn new(palette: &'a Palette, patch_size: PatchSize) -> Self {
        Self {
            palette,
            patch_size,
            parallel: false,
        }
    }

    /// Computes grid rows on the rayon pool. Emission order is unchanged.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn mosaic(&self, image: &ImageBuffer) -> Mosaic {
        if self.parallel {
            #[cfg(feature = "parallel")]
            return crate::mosaic::compute_mosaic_parallel(image, self.patch_size, self.palette);
            #[cfg(not(feature = "parallel"))]
            warn!("Built without the parallel feature, computing sequentially");
        }
        compute_mosaic(image, self.patch_size, self.palette)
    }

    pub fn render<T: TerminalControl>(
        &self,
        image: &ImageBuffer,
        term: &mut T,
    ) -> Result<RenderStats> {
        let mosaic = self.mosaic(image);
        let stats = emit_mosaic(&mosaic, term)?;
        info!("Rendered {} rows, {} glyphs", stats.rows, stats.glyphs);
        Ok(stats)
    }

    /// [`render`](Self::render), then block until the user acknowledges.
    pub fn present<T: TerminalControl>(
        &self,
        image: &ImageBuffer,
        term: &mut T,
    ) -> Result<RenderStats> {
        let stats = self.render(image, term)?;
        term.await_acknowledgment()?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::{Emission, RecordingTerminal};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> ImageBuffer {
        let bytes = rgb.repeat((width * height) as usize);
        ImageBuffer::from_raw(width, height, 3, (width * 3) as usize, bytes).unwrap()
    }

    #[test]
    fn test_row_and_glyph_counts() {
        let palette = Palette::default();
        let renderer = MosaicRenderer::new(&palette, PatchSize::new(4, 3).unwrap());
        let mut term = RecordingTerminal::new();
        register_palette(&mut term, &palette).unwrap();

        let stats = renderer.render(&solid(10, 7, [0, 0, 0]), &mut term).unwrap();
        assert_eq!(stats, RenderStats { rows: 3, glyphs: 9 });
        assert_eq!(term.glyph_rows().len(), 3);
        assert!(term.glyph_rows().iter().all(|row| row.len() == 3));
    }

    #[test]
    fn test_flush_follows_last_row() {
        let palette = Palette::default();
        let renderer = MosaicRenderer::new(&palette, PatchSize::default());
        let mut term = RecordingTerminal::new();
        register_palette(&mut term, &palette).unwrap();
        renderer.render(&solid(1, 1, [9, 9, 9]), &mut term).unwrap();

        let tail = &term.emissions()[term.emissions().len() - 3..];
        assert_eq!(tail, &[Emission::Glyph(1), Emission::RowEnd, Emission::Flush]);
    }

    #[test]
    fn test_present_waits_for_acknowledgment() {
        let palette = Palette::default();
        let renderer = MosaicRenderer::new(&palette, PatchSize::default());
        let mut term = RecordingTerminal::new();
        register_palette(&mut term, &palette).unwrap();
        renderer.present(&solid(3, 3, [255, 0, 0]), &mut term).unwrap();
        assert_eq!(term.emissions().last(), Some(&Emission::Acknowledged));
    }

    #[test]
    fn test_rendering_without_registration_fails() {
        let palette = Palette::default();
        let renderer = MosaicRenderer::new(&palette, PatchSize::default());
        let mut term = RecordingTerminal::new();
        assert!(renderer.render(&solid(2, 2, [0, 0, 0]), &mut term).is_err());
    }
}
