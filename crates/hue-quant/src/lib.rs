//! hue-quant: dominant-color palette extraction
//!
//! This library reduces a raster image to a small set of dominant colors
//! with relative area proportions, using a weighted median-cut quantizer
//! over the image's opaque pixels.
//!
//! # Quick Start
//!
//! ```
//! use hue_quant::quantize;
//!
//! // A 2x2 image: three red pixels, one blue (RGBA bytes).
//! let rgba = [
//!     255, 0, 0, 255, 255, 0, 0, 255,
//!     255, 0, 0, 255, 0, 0, 255, 255,
//! ];
//! let palette = quantize(&rgba, 2).unwrap();
//!
//! assert_eq!(palette.len(), 2);
//! // Entries are sorted by descending proportion: red covers 3/4.
//! assert!((palette[0].proportion - 0.75).abs() < 1e-6);
//! ```
//!
//! # Algorithm
//!
//! Median cut works on a histogram of distinct opaque colors. Starting from
//! a single box containing every histogram entry, the box with the largest
//! `weight * volume` is repeatedly split along its widest RGB axis at the
//! weighted median, until the requested number of boxes is reached or no
//! box can be split further. Each box yields one palette entry: its
//! weighted average color, with a proportion equal to the box's share of
//! the total opaque pixel count.
//!
//! Proportions therefore sum to 1 over the opaque pixels of the image, but
//! callers should not rely on that invariant for images with transparency
//! or after downstream filtering.

pub mod color;
pub mod error;
pub mod quantize;

pub use color::Rgb;
pub use error::{ParseColorError, QuantizeError};
pub use quantize::{quantize, PaletteColor};
