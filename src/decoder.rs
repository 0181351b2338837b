use std::io::{self, Chain, Cursor, Read};

use log::{debug, warn};

use crate::error::{MosaicError, Result};
use crate::image::ImageBuffer;

pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Display exponent used when the file carries gamma metadata.
pub const DISPLAY_EXPONENT: f32 = 2.2;

type SignedReader<R> = Chain<Cursor<[u8; 8]>, R>;

/// A PNG being decoded into an [`ImageBuffer`].
///
/// The decoder state and the decoded buffer are one resource: both are
/// released by [`free`](Self::free), by any failed decode step, and on drop.
pub struct PixelSource<R: Read> {
    reader: Option<png::Reader<SignedReader<R>>>,
    image: Option<ImageBuffer>,
    width: u32,
    height: u32,
}

impl<R: Read> PixelSource<R> {
    /// Checks the PNG signature before any decoder state exists, then reads
    /// the header.
    pub fn init(mut input: R) -> Result<Self> {
        let mut signature = [0u8; 8];
        if let Err(e) = input.read_exact(&mut signature) {
            return Err(match e.kind() {
                io::ErrorKind::UnexpectedEof => MosaicError::BadSignature,
                _ => MosaicError::corrupt(e.to_string()),
            });
        }
        if signature != PNG_SIGNATURE {
            return Err(MosaicError::BadSignature);
        }

        let mut decoder = png::Decoder::new(Cursor::new(signature).chain(input));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let reader = decoder.read_info()?;

        let info = reader.info();
        debug!(
            "PNG header: {}x{} {:?} {:?}",
            info.width, info.height, info.color_type, info.bit_depth
        );
        let (width, height) = (info.width, info.height);

        Ok(Self {
            reader: Some(reader),
            image: None,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Decodes the whole image as 8-bit RGB or RGBA. Palette, low bit depth,
    /// transparency chunks, 16-bit samples and grayscale are all normalized.
    /// Later calls return the same buffer.
    pub fn get_image(&mut self) -> Result<&ImageBuffer> {
        let image = match self.image.take() {
            Some(image) => image,
            None => match self.decode() {
                Ok(image) => image,
                Err(e) => {
                    warn!("Decoding failed, releasing decoder: {e}");
                    self.free();
                    return Err(e);
                }
            },
        };
        Ok(self.image.insert(image))
    }

    /// The decoded buffer, if [`get_image`](Self::get_image) succeeded.
    pub fn image(&self) -> Option<&ImageBuffer> {
        self.image.as_ref()
    }

    /// Whether decoder state or a pixel buffer is still held.
    pub fn is_allocated(&self) -> bool {
        self.reader.is_some() || self.image.is_some()
    }

    /// Releases the pixel buffer and all decoder state. Safe to call any
    /// number of times.
    pub fn free(&mut self) {
        self.image = None;
        self.reader = None;
    }

    fn decode(&mut self) -> Result<ImageBuffer> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| MosaicError::corrupt("decoder state was already released"))?;

        let gamma = reader.info().source_gamma.map(|g| g.into_value());
        let mut raw = alloc_zeroed(reader.output_buffer_size())?;
        let frame = reader.next_frame(&mut raw)?;

        let in_channels = match frame.color_type {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            png::ColorType::Indexed => {
                return Err(MosaicError::corrupt("palette was not expanded"));
            }
        };
        let channels: u8 = if in_channels % 2 == 0 { 4 } else { 3 };
        let width = frame.width as usize;
        let height = frame.height as usize;
        let stride = width * channels as usize;

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(stride * height)
            .map_err(|_| MosaicError::OutOfMemory)?;
        for y in 0..height {
            let start = y * frame.line_size;
            let row = &raw[start..start + width * in_channels];
            for px in row.chunks_exact(in_channels) {
                match in_channels {
                    1 => bytes.extend_from_slice(&[px[0], px[0], px[0]]),
                    2 => bytes.extend_from_slice(&[px[0], px[0], px[0], px[1]]),
                    _ => bytes.extend_from_slice(px),
                }
            }
        }
        drop(raw);

        match gamma {
            Some(file_gamma) if file_gamma > 0.0 => {
                debug!("Applying gamma correction for file gamma {file_gamma}");
                apply_gamma(&mut bytes, channels, file_gamma);
            }
            Some(file_gamma) => warn!("Ignoring invalid file gamma {file_gamma}"),
            None => {}
        }

        ImageBuffer::from_raw(frame.width, frame.height, channels, stride, bytes)
            .ok_or_else(|| MosaicError::corrupt("decoded image has inconsistent geometry"))
    }
}

fn alloc_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| MosaicError::OutOfMemory)?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Maps color samples through `(v / 255) ^ (1 / (file_gamma * DISPLAY_EXPONENT))`.
/// Alpha samples are left alone.
fn apply_gamma(bytes: &mut [u8], channels: u8, file_gamma: f32) {
    let exponent = 1.0 / (file_gamma * DISPLAY_EXPONENT);
    let mut table = [0u8; 256];
    for (v, entry) in table.iter_mut().enumerate() {
        *entry = ((v as f32 / 255.0).powf(exponent) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    for px in bytes.chunks_exact_mut(channels as usize) {
        for sample in &mut px[..3] {
            *sample = table[*sample as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::{PngOptions, encode_png, encode_png_with};

    #[test]
    fn test_bad_signature_owns_nothing() {
        let result = PixelSource::init(Cursor::new(b"GIF89a not a png file".to_vec()));
        assert!(matches!(result, Err(MosaicError::BadSignature)));
    }

    #[test]
    fn test_short_input_is_bad_signature() {
        let result = PixelSource::init(Cursor::new(vec![137, 80, 78]));
        assert!(matches!(result, Err(MosaicError::BadSignature)));
    }

    #[test]
    fn test_truncated_header_is_corrupt() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&[0, 0, 0, 13, b'I', b'H']);
        let result = PixelSource::init(Cursor::new(data));
        assert!(matches!(result, Err(MosaicError::CorruptStream(_))));
    }

    #[test]
    fn test_rgb_image_roundtrips() {
        let data = [255, 0, 0, 0, 255, 0, 0, 0, 255, 9, 9, 9];
        let png = encode_png(2, 2, png::ColorType::Rgb, &data, None);
        let mut source = PixelSource::init(Cursor::new(png)).unwrap();
        assert_eq!((source.width(), source.height()), (2, 2));

        let image = source.get_image().unwrap();
        assert_eq!(image.channels(), 3);
        assert_eq!(image.stride(), 6);
        assert_eq!(image.pixel(1, 1), &[9, 9, 9]);
    }

    #[test]
    fn test_grayscale_expands_to_rgb() {
        let png = encode_png(2, 1, png::ColorType::Grayscale, &[17, 200], None);
        let mut source = PixelSource::init(Cursor::new(png)).unwrap();
        let image = source.get_image().unwrap();
        assert_eq!(image.channels(), 3);
        assert_eq!(image.pixel(0, 0), &[17, 17, 17]);
        assert_eq!(image.pixel(1, 0), &[200, 200, 200]);
    }

    #[test]
    fn test_grayscale_alpha_expands_to_rgba() {
        let png = encode_png(1, 1, png::ColorType::GrayscaleAlpha, &[40, 128], None);
        let mut source = PixelSource::init(Cursor::new(png)).unwrap();
        let image = source.get_image().unwrap();
        assert_eq!(image.channels(), 4);
        assert_eq!(image.pixel(0, 0), &[40, 40, 40, 128]);
    }

    #[test]
    fn test_indexed_with_transparency_expands_to_rgba() {
        let options = PngOptions {
            palette: Some(&[255, 0, 0, 0, 0, 255][..]),
            trns: Some(&[10, 255][..]),
            ..PngOptions::default()
        };
        let png = encode_png_with(2, 1, png::ColorType::Indexed, &[0, 1], &options);
        let mut source = PixelSource::init(Cursor::new(png)).unwrap();
        let image = source.get_image().unwrap();
        assert_eq!(image.channels(), 4);
        assert_eq!(image.pixel(0, 0), &[255, 0, 0, 10]);
        assert_eq!(image.pixel(1, 0), &[0, 0, 255, 255]);
    }

    #[test]
    fn test_sixteen_bit_keeps_high_byte() {
        let options = PngOptions {
            depth: Some(png::BitDepth::Sixteen),
            ..PngOptions::default()
        };
        let data = [0xAB, 0xCD, 0x12, 0x34, 0xFF, 0xFF];
        let png = encode_png_with(1, 1, png::ColorType::Rgb, &data, &options);
        let mut source = PixelSource::init(Cursor::new(png)).unwrap();
        let image = source.get_image().unwrap();
        assert_eq!(image.channels(), 3);
        assert_eq!(image.pixel(0, 0), &[171, 18, 255]);
    }

    #[test]
    fn test_one_bit_grayscale_expands_to_full_range() {
        let options = PngOptions {
            depth: Some(png::BitDepth::One),
            ..PngOptions::default()
        };
        let png = encode_png_with(2, 1, png::ColorType::Grayscale, &[0b1010_0000], &options);
        let mut source = PixelSource::init(Cursor::new(png)).unwrap();
        let image = source.get_image().unwrap();
        assert_eq!(image.channels(), 3);
        assert_eq!(image.pixel(0, 0), &[255, 255, 255]);
        assert_eq!(image.pixel(1, 0), &[0, 0, 0]);
    }

    #[test]
    fn test_no_gamma_chunk_means_no_transform() {
        let png = encode_png(1, 1, png::ColorType::Rgb, &[64, 128, 192], None);
        let mut source = PixelSource::init(Cursor::new(png)).unwrap();
        assert_eq!(source.get_image().unwrap().pixel(0, 0), &[64, 128, 192]);
    }

    #[test]
    fn test_linear_gamma_chunk_brightens() {
        let png = encode_png(1, 1, png::ColorType::Rgba, &[64, 0, 255, 64], Some(1.0));
        let mut source = PixelSource::init(Cursor::new(png)).unwrap();
        let px = source.get_image().unwrap().pixel(0, 0).to_vec();
        assert!((135..=137).contains(&px[0]), "got {}", px[0]);
        assert_eq!(px[1], 0);
        assert_eq!(px[2], 255);
        // alpha untouched
        assert_eq!(px[3], 64);
    }

    #[test]
    fn test_free_is_idempotent() {
        let png = encode_png(1, 1, png::ColorType::Rgb, &[1, 2, 3], None);
        let mut source = PixelSource::init(Cursor::new(png)).unwrap();
        source.get_image().unwrap();
        assert!(source.is_allocated());

        source.free();
        assert!(!source.is_allocated());
        assert!(source.image().is_none());
        source.free();
        assert!(!source.is_allocated());
        assert!(source.get_image().is_err());
    }

    #[test]
    fn test_corrupt_data_releases_decoder() {
        let mut png = encode_png(4, 4, png::ColorType::Rgb, &[7u8; 48], None);
        // Damage the IDAT payload, keeping the header intact
        let idat = png.windows(4).position(|w| w == b"IDAT").unwrap();
        for b in &mut png[idat + 4..idat + 12] {
            *b ^= 0xFF;
        }
        let mut source = PixelSource::init(Cursor::new(png)).unwrap();
        let err = source.get_image().unwrap_err();
        assert!(matches!(err, MosaicError::CorruptStream(_)));
        assert!(!source.is_allocated());
    }
}
