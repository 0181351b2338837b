use crate::image::{ImageBuffer, Rgb};

/// Nominal tile size in pixels. Tiles on the right and bottom edges are
/// clamped to whatever is left of the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchSize {
    width: u32,
    height: u32,
}

impl PatchSize {
    pub const DEFAULT_WIDTH: u32 = 5;
    pub const DEFAULT_HEIGHT: u32 = 9;

    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self { width, height })
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Default for PatchSize {
    fn default() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
        }
    }
}

/// One tile of the image, already clamped to the image bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Patch {
    pub row: usize,
    pub column: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Patch {
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// The tiling of an image by a patch size.
#[derive(Clone, Copy, Debug)]
pub struct PatchGrid {
    image_width: u32,
    image_height: u32,
    size: PatchSize,
}

impl PatchGrid {
    pub fn new(image: &ImageBuffer, size: PatchSize) -> Self {
        Self {
            image_width: image.width(),
            image_height: image.height(),
            size,
        }
    }

    pub fn columns(&self) -> usize {
        self.image_width.div_ceil(self.size.width) as usize
    }

    pub fn rows(&self) -> usize {
        self.image_height.div_ceil(self.size.height) as usize
    }

    /// Patches of one grid row, left to right. Rows past the bottom of the
    /// image are empty.
    pub fn row(&self, row: usize) -> impl Iterator<Item = Patch> + '_ {
        let columns = if row < self.rows() { self.columns() } else { 0 };
        let y = (row as u32).saturating_mul(self.size.height);
        let height = self.image_height.saturating_sub(y).min(self.size.height);
        (0..columns).map(move |column| {
            let x = column as u32 * self.size.width;
            Patch {
                row,
                column,
                x,
                y,
                width: (self.image_width - x).min(self.size.width),
                height,
            }
        })
    }

    /// Every patch in raster order.
    pub fn patches(&self) -> impl Iterator<Item = Patch> + '_ {
        (0..self.rows()).flat_map(move |row| self.row(row))
    }
}

/// Truncating per-channel mean over the pixels of `patch`. Alpha is ignored.
pub fn mean_color(image: &ImageBuffer, patch: &Patch) -> Rgb {
    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    for y in patch.y..patch.y + patch.height {
        for x in patch.x..patch.x + patch.width {
            let p = image.pixel(x, y);
            r += p[0] as u64;
            g += p[1] as u64;
            b += p[2] as u64;
        }
    }

    let count = patch.pixel_count();
    Rgb::new((r / count) as u8, (g / count) as u8, (b / count) as u8)
}
