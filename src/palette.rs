use crate::image::Rgb;

/// Upper bound of the terminal's color intensity scale.
pub const INTENSITY_SCALE: f32 = 1000.0;

/// A reference color as the terminal reports it, each component in
/// `0..=1000`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceColor {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl ReferenceColor {
    pub const fn new(r: u16, g: u16, b: u16) -> Self {
        Self { r, g, b }
    }

    /// Components rescaled to the 0..=255 domain of decoded pixels.
    pub fn to_rgb_f32(&self) -> [f32; 3] {
        [scale(self.r), scale(self.g), scale(self.b)]
    }
}

fn scale(c: u16) -> f32 {
    c as f32 / INTENSITY_SCALE * 255.0
}

/// Palette index drawn behind every glyph.
pub const BACKGROUND_INDEX: usize = 0;

/// Binds a reference color to a terminal style. Pair 0 is reserved by
/// terminals, so pair indices are color indices shifted by one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorPair {
    pub pair_index: u16,
    pub color_index: usize,
    pub background_index: usize,
}

impl ColorPair {
    pub fn for_color(color_index: usize) -> Self {
        Self {
            pair_index: color_index as u16 + 1,
            color_index,
            background_index: BACKGROUND_INDEX,
        }
    }
}

/// The fixed, ordered set of colors a mosaic is quantized to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<ReferenceColor>,
}

impl Palette {
    /// The eight standard terminal colors at their usual default
    /// intensities, in terminal color-number order.
    pub fn terminal_default() -> Self {
        const ON: u16 = 680;
        Self {
            colors: vec![
                ReferenceColor::new(0, 0, 0),    // black
                ReferenceColor::new(ON, 0, 0),   // red
                ReferenceColor::new(0, ON, 0),   // green
                ReferenceColor::new(ON, ON, 0),  // yellow
                ReferenceColor::new(0, 0, ON),   // blue
                ReferenceColor::new(ON, 0, ON),  // magenta
                ReferenceColor::new(0, ON, ON),  // cyan
                ReferenceColor::new(ON, ON, ON), // white
            ],
        }
    }

    pub fn new(colors: Vec<ReferenceColor>) -> Option<Self> {
        if colors.is_empty() {
            None
        } else {
            Some(Self { colors })
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color_pairs(&self) -> impl Iterator<Item = ColorPair> + '_ {
        (0..self.colors.len()).map(ColorPair::for_color)
    }

    /// Euclidean distance in RGB space between reference `index` and `target`.
    pub fn distance(&self, index: usize, target: Rgb) -> f32 {
        let [r, g, b] = self.colors[index].to_rgb_f32();
        let dr = r - target.r as f32;
        let dg = g - target.g as f32;
        let db = b - target.b as f32;
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Index of the closest reference color. Index 0 is the initial
    /// candidate and only a strictly smaller distance displaces the current
    /// best, so ties resolve to the lowest index.
    pub fn best_match(&self, target: Rgb) -> usize {
        let mut best = 0;
        let mut best_distance = self.distance(0, target);
        for index in 1..self.colors.len() {
            let d = self.distance(index, target);
            if d < best_distance {
                best = index;
                best_distance = d;
            }
        }
        best
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::terminal_default()
    }
}
