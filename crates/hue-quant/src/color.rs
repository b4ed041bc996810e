//! RGB color type
//!
//! Colors are stored as `f32` channels in the 0..=255 range. Floating
//! channels let quantization averages and distance calculations run
//! without repeated integer round-tripping; byte and hex conversions
//! round and clamp at the edges.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseColorError;

/// A color in RGB space.
///
/// Channels are `f32` values in the 0..=255 range. Use [`Rgb::from_u8`]
/// for byte input and [`Rgb::to_bytes`] / [`Rgb::to_hex`] for output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    /// Red channel (0.0..=255.0)
    pub r: f32,
    /// Green channel (0.0..=255.0)
    pub g: f32,
    /// Blue channel (0.0..=255.0)
    pub b: f32,
}

impl Rgb {
    /// Create a new Rgb color from float channels.
    #[inline]
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create an Rgb color from 8-bit unsigned integer values.
    ///
    /// # Example
    /// ```
    /// use hue_quant::Rgb;
    /// let red = Rgb::from_u8(255, 0, 0);
    /// assert_eq!(red.r, 255.0);
    /// ```
    #[inline]
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32,
            g: g as f32,
            b: b as f32,
        }
    }

    /// Convert to a byte array `[R, G, B]`.
    ///
    /// Rounds and clamps channels to the 0..=255 range.
    #[inline]
    pub fn to_bytes(self) -> [u8; 3] {
        [
            self.r.round().clamp(0.0, 255.0) as u8,
            self.g.round().clamp(0.0, 255.0) as u8,
            self.b.round().clamp(0.0, 255.0) as u8,
        ]
    }

    /// Format as a lowercase `#rrggbb` hex string.
    ///
    /// # Example
    /// ```
    /// use hue_quant::Rgb;
    /// assert_eq!(Rgb::from_u8(255, 128, 0).to_hex(), "#ff8000");
    /// ```
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_bytes();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Squared Euclidean distance to another color in RGB space.
    #[inline]
    pub fn distance_squared(self, other: Rgb) -> f32 {
        let dr = self.r - other.r;
        let dg = self.g - other.g;
        let db = self.b - other.b;
        dr * dr + dg * dg + db * db
    }

    /// Returns true if every channel is finite and within 0..=255.
    #[inline]
    pub fn is_valid(self) -> bool {
        [self.r, self.g, self.b]
            .iter()
            .all(|c| c.is_finite() && (0.0..=255.0).contains(c))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = ParseColorError;

    /// Parse a `#rrggbb` or `rrggbb` hex color string.
    ///
    /// # Example
    /// ```
    /// use hue_quant::Rgb;
    /// let c: Rgb = "#ff8000".parse().unwrap();
    /// assert_eq!(c.to_bytes(), [255, 128, 0]);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 {
            return Err(ParseColorError::InvalidLength);
        }
        let r = u8::from_str_radix(&hex[0..2], 16)?;
        let g = u8::from_str_radix(&hex[2..4], 16)?;
        let b = u8::from_str_radix(&hex[4..6], 16)?;
        Ok(Rgb::from_u8(r, g, b))
    }
}
