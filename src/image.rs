/// A fully decoded image, 8 bits per channel, RGB or RGBA.
///
/// Rows may carry trailing padding: `stride` is the byte distance between
/// the starts of consecutive rows and is at least `width * channels`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    channels: u8,
    stride: usize,
    bytes: Vec<u8>,
}

impl ImageBuffer {
    /// Wraps raw decoded bytes. Returns `None` when the geometry does not
    /// describe the given bytes.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        stride: usize,
        bytes: Vec<u8>,
    ) -> Option<Self> {
        if width == 0 || height == 0 || !matches!(channels, 3 | 4) {
            return None;
        }
        let min_stride = (width as usize).checked_mul(channels as usize)?;
        if stride < min_stride {
            return None;
        }
        let needed = stride.checked_mul(height as usize)?;
        if bytes.len() < needed {
            return None;
        }
        Some(Self {
            width,
            height,
            channels,
            stride,
            bytes,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The `channels` bytes of the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let start = y as usize * self.stride + x as usize * self.channels as usize;
        &self.bytes[start..start + self.channels as usize]
    }
}

/// An 8-bit RGB triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}
