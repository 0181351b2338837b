pub mod test_helpers {
    use std::collections::HashSet;
    use std::io;

    use crate::palette::ColorPair;
    use crate::terminal::{TerminalCapabilities, TerminalControl};

    /// Everything a [`RecordingTerminal`] was asked to do, in order.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Emission {
        RegisterPair(ColorPair),
        Glyph(u16),
        RowEnd,
        Flush,
        Acknowledged,
        Teardown,
    }

    /// In-memory terminal for asserting on the emission stream
    pub struct RecordingTerminal {
        capabilities: TerminalCapabilities,
        registered: HashSet<u16>,
        emissions: Vec<Emission>,
    }

    impl RecordingTerminal {
        pub fn new() -> Self {
            Self::with_capabilities(TerminalCapabilities {
                has_colors: true,
                colors: 256,
                color_pairs: 256,
            })
        }

        pub fn with_capabilities(capabilities: TerminalCapabilities) -> Self {
            Self {
                capabilities,
                registered: HashSet::new(),
                emissions: Vec::new(),
            }
        }

        pub fn emissions(&self) -> &[Emission] {
            &self.emissions
        }

        /// Glyph pair indices grouped by terminated row
        pub fn glyph_rows(&self) -> Vec<Vec<u16>> {
            let mut rows = Vec::new();
            let mut current = Vec::new();
            for emission in &self.emissions {
                match emission {
                    Emission::Glyph(pair) => current.push(*pair),
                    Emission::RowEnd => rows.push(std::mem::take(&mut current)),
                    _ => {}
                }
            }
            rows
        }

        pub fn torn_down(&self) -> bool {
            self.emissions.contains(&Emission::Teardown)
        }
    }

    impl Default for RecordingTerminal {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TerminalControl for RecordingTerminal {
        fn capabilities(&self) -> TerminalCapabilities {
            self.capabilities
        }

        fn register_color_pair(&mut self, pair: ColorPair) -> io::Result<()> {
            self.registered.insert(pair.pair_index);
            self.emissions.push(Emission::RegisterPair(pair));
            Ok(())
        }

        fn emit_glyph(&mut self, pair_index: u16) -> io::Result<()> {
            if !self.registered.contains(&pair_index) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("color pair {pair_index} was never registered"),
                ));
            }
            self.emissions.push(Emission::Glyph(pair_index));
            Ok(())
        }

        fn emit_row_terminator(&mut self) -> io::Result<()> {
            self.emissions.push(Emission::RowEnd);
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.emissions.push(Emission::Flush);
            Ok(())
        }

        fn await_acknowledgment(&mut self) -> io::Result<()> {
            self.emissions.push(Emission::Acknowledged);
            Ok(())
        }

        fn teardown(&mut self) -> io::Result<()> {
            if !self.torn_down() {
                self.emissions.push(Emission::Teardown);
            }
            Ok(())
        }
    }

    /// Encoder settings for [`encode_png_with`]. The defaults give an 8-bit
    /// image without palette, transparency or gamma chunks.
    #[derive(Clone, Debug, Default)]
    pub struct PngOptions<'a> {
        pub depth: Option<png::BitDepth>,
        pub palette: Option<&'a [u8]>,
        pub trns: Option<&'a [u8]>,
        pub gamma: Option<f32>,
    }

    /// Encodes an 8-bit PNG in memory
    pub fn encode_png(
        width: u32,
        height: u32,
        color_type: png::ColorType,
        data: &[u8],
        gamma: Option<f32>,
    ) -> Vec<u8> {
        let options = PngOptions {
            gamma,
            ..PngOptions::default()
        };
        encode_png_with(width, height, color_type, data, &options)
    }

    /// Encodes a PNG in memory. `data` holds packed scanlines at the chosen
    /// depth, big-endian for 16-bit samples.
    pub fn encode_png_with(
        width: u32,
        height: u32,
        color_type: png::ColorType,
        data: &[u8],
        options: &PngOptions<'_>,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color_type);
            encoder.set_depth(options.depth.unwrap_or(png::BitDepth::Eight));
            if let Some(palette) = options.palette {
                encoder.set_palette(palette.to_vec());
            }
            if let Some(trns) = options.trns {
                encoder.set_trns(trns.to_vec());
            }
            if let Some(gamma) = options.gamma {
                encoder.set_source_gamma(png::ScaledFloat::new(gamma));
            }
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }
}
