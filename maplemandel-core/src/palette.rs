//! Mapping from escape time to color.
//!
//! A palette is a pure function of the escape result: no lookup tables are
//! precomputed, so palettes can be swapped without touching the iteration core.

use serde::{Deserialize, Serialize};

use crate::EscapeTime;

/// 8-bit RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packed 0xAARRGGBB with full alpha.
    pub fn to_argb(self) -> u32 {
        0xFF00_0000 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }
}

impl From<[u8; 3]> for Color {
    fn from(c: [u8; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

/// Color reported for every point that never escapes.
pub const IN_SET_COLOR: Color = Color::BLACK;

/// A color stop in the gradient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub position: f64,
    pub color: [u8; 3],
}

impl ColorStop {
    pub fn new(position: f64, color: [u8; 3]) -> Self {
        Self { position, color }
    }
}

/// A complete palette configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub id: String,
    pub name: String,
    /// Stops sorted by position in [0, 1].
    pub stops: Vec<ColorStop>,
    /// Iterations per full gradient cycle.
    pub period: f64,
    /// Iteration offset applied before wrapping.
    #[serde(default)]
    pub offset: f64,
    /// Use the continuous escape value instead of the integer count.
    #[serde(default)]
    pub smooth_enabled: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Self::classic()
    }
}

impl Palette {
    /// Factory default palettes built into the binary.
    pub fn factory_defaults() -> Vec<Palette> {
        vec![Self::classic(), Self::fire(), Self::grayscale()]
    }

    pub fn classic() -> Self {
        Self {
            id: "classic".to_string(),
            name: "Classic".to_string(),
            stops: vec![
                ColorStop::new(0.0, [0, 7, 100]),
                ColorStop::new(0.16, [32, 107, 203]),
                ColorStop::new(0.42, [237, 255, 255]),
                ColorStop::new(0.6425, [255, 170, 0]),
                ColorStop::new(0.8575, [0, 2, 0]),
                ColorStop::new(1.0, [0, 7, 100]),
            ],
            period: 64.0,
            offset: 0.0,
            smooth_enabled: false,
        }
    }

    pub fn fire() -> Self {
        Self {
            id: "fire".to_string(),
            name: "Fire".to_string(),
            stops: vec![
                ColorStop::new(0.0, [0, 0, 0]),
                ColorStop::new(0.2, [128, 0, 0]),
                ColorStop::new(0.4, [255, 0, 0]),
                ColorStop::new(0.6, [255, 128, 0]),
                ColorStop::new(0.8, [255, 255, 0]),
                ColorStop::new(1.0, [255, 255, 255]),
            ],
            period: 128.0,
            offset: 0.0,
            smooth_enabled: false,
        }
    }

    pub fn grayscale() -> Self {
        Self {
            id: "grayscale".to_string(),
            name: "Grayscale".to_string(),
            stops: vec![
                ColorStop::new(0.0, [0, 0, 0]),
                ColorStop::new(0.5, [255, 255, 255]),
                ColorStop::new(1.0, [0, 0, 0]),
            ],
            period: 32.0,
            offset: 0.0,
            smooth_enabled: false,
        }
    }

    /// Look up a factory palette by ID.
    pub fn by_id(id: &str) -> Option<Palette> {
        Self::factory_defaults().into_iter().find(|p| p.id == id)
    }

    /// Check the invariants `color` relies on.
    pub fn validate(&self) -> Result<(), String> {
        if self.stops.is_empty() {
            return Err(format!("palette {:?} has no color stops", self.id));
        }
        if !(self.period.is_finite() && self.period > 0.0) {
            return Err(format!("palette period must be positive, got {}", self.period));
        }
        if !self.offset.is_finite() {
            return Err(format!("palette offset must be finite, got {}", self.offset));
        }
        if self
            .stops
            .windows(2)
            .any(|w| w[0].position > w[1].position)
        {
            return Err("palette stops must be sorted by position".to_string());
        }
        if self
            .stops
            .iter()
            .any(|s| !(0.0..=1.0).contains(&s.position))
        {
            return Err("palette stop positions must lie in [0, 1]".to_string());
        }
        Ok(())
    }

    /// Map an escape result to a color.
    pub fn color(&self, escape: &EscapeTime) -> Color {
        if !escape.escaped {
            return IN_SET_COLOR;
        }
        let value = if self.smooth_enabled {
            escape
                .smooth_iterations()
                .unwrap_or(escape.iterations as f64)
        } else {
            escape.iterations as f64
        };
        let t = ((value + self.offset) / self.period).rem_euclid(1.0);
        self.sample(t)
    }

    /// Linear RGB interpolation between the stops around `t`.
    fn sample(&self, t: f64) -> Color {
        let Some(first) = self.stops.first() else {
            return IN_SET_COLOR;
        };
        if t <= first.position || self.stops.len() == 1 {
            return first.color.into();
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if t <= b.position {
                let span = b.position - a.position;
                let local = if span > 0.0 {
                    (t - a.position) / span
                } else {
                    1.0
                };
                return lerp_color(a.color, b.color, local);
            }
        }
        match self.stops.last() {
            Some(last) => last.color.into(),
            None => IN_SET_COLOR,
        }
    }
}

fn lerp_color(a: [u8; 3], b: [u8; 3], t: f64) -> Color {
    let channel = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    Color::new(
        channel(a[0], b[0]),
        channel(a[1], b[1]),
        channel(a[2], b[2]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_is_always_in_set_color() {
        for palette in Palette::factory_defaults() {
            assert_eq!(palette.color(&EscapeTime::interior(500)), IN_SET_COLOR);
        }
    }

    #[test]
    fn factory_palettes_are_valid() {
        for palette in Palette::factory_defaults() {
            palette.validate().unwrap();
        }
    }

    #[test]
    fn color_is_deterministic() {
        let palette = Palette::fire();
        let e = EscapeTime::escaped(17, 256, 9.0);
        assert_eq!(palette.color(&e), palette.color(&e));
    }

    #[test]
    fn color_wraps_by_period() {
        let palette = Palette::grayscale();
        let a = palette.color(&EscapeTime::escaped(3, 1000, 5.0));
        let b = palette.color(&EscapeTime::escaped(35, 1000, 5.0));
        assert_eq!(a, b);
    }

    #[test]
    fn midpoint_of_grayscale_is_white() {
        let palette = Palette::grayscale();
        let c = palette.color(&EscapeTime::escaped(16, 1000, 5.0));
        assert_eq!(c, Color::WHITE);
    }

    #[test]
    fn validate_rejects_empty_stops() {
        let palette = Palette {
            stops: vec![],
            ..Palette::classic()
        };
        assert!(palette.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_period() {
        let palette = Palette {
            period: 0.0,
            ..Palette::classic()
        };
        assert!(palette.validate().is_err());
    }

    #[test]
    fn argb_packing() {
        assert_eq!(Color::new(0x12, 0x34, 0x56).to_argb(), 0xFF12_3456);
    }

    #[test]
    fn by_id_finds_factory_palette() {
        assert_eq!(Palette::by_id("fire"), Some(Palette::fire()));
        assert_eq!(Palette::by_id("missing"), None);
    }
}
