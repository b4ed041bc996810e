//! Weighted median-cut palette extraction.
//!
//! Operates on a histogram of distinct opaque colors rather than raw
//! pixels, so runtime scales with color variety instead of image area.

use std::collections::HashMap;

use crate::color::Rgb;
use crate::error::QuantizeError;

/// Alpha cutoff below which a pixel is treated as transparent and ignored.
const ALPHA_THRESHOLD: u8 = 128;

/// A dominant color extracted from an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteColor {
    /// The color, as float RGB channels in 0..=255.
    pub rgb: Rgb,
    /// Fraction of the image's opaque area covered by this color, in 0..=1.
    pub proportion: f32,
}

impl PaletteColor {
    /// Returns true if the color channels and proportion are finite and
    /// within their expected ranges.
    pub fn is_valid(&self) -> bool {
        self.rgb.is_valid() && self.proportion.is_finite() && (0.0..=1.0).contains(&self.proportion)
    }
}

/// A box of histogram entries for median-cut subdivision.
#[derive(Debug)]
struct ColorBox {
    /// (color, pixel count) pairs
    entries: Vec<([u8; 3], u32)>,
}

impl ColorBox {
    fn new(entries: Vec<([u8; 3], u32)>) -> Self {
        Self { entries }
    }

    fn total_weight(&self) -> u64 {
        self.entries.iter().map(|&(_, w)| w as u64).sum()
    }

    /// Range (max - min) along each RGB axis.
    fn ranges(&self) -> [u32; 3] {
        let mut min = [255u8; 3];
        let mut max = [0u8; 3];
        for (rgb, _) in &self.entries {
            for axis in 0..3 {
                min[axis] = min[axis].min(rgb[axis]);
                max[axis] = max[axis].max(rgb[axis]);
            }
        }
        [
            (max[0] - min[0]) as u32,
            (max[1] - min[1]) as u32,
            (max[2] - min[2]) as u32,
        ]
    }

    /// Split priority: heavier boxes with more color spread split first.
    fn priority(&self) -> u64 {
        let ranges = self.ranges();
        let volume = ranges.iter().map(|&r| r as u64 + 1).product::<u64>();
        self.total_weight() * volume
    }

    fn splittable(&self) -> bool {
        self.entries.len() >= 2
    }

    /// Split along the widest axis at the weighted median.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let ranges = self.ranges();
        let axis = if ranges[0] >= ranges[1] && ranges[0] >= ranges[2] {
            0
        } else if ranges[1] >= ranges[2] {
            1
        } else {
            2
        };

        self.entries.sort_unstable_by_key(|&(rgb, _)| rgb[axis]);

        let half_weight = self.total_weight() / 2;
        let mut accumulated = 0u64;
        let mut split_idx = 1;
        for (i, &(_, w)) in self.entries.iter().enumerate() {
            accumulated += w as u64;
            if accumulated >= half_weight && i + 1 < self.entries.len() {
                split_idx = i + 1;
                break;
            }
        }
        // At least one entry per side
        split_idx = split_idx.clamp(1, self.entries.len() - 1);

        let right = self.entries.split_off(split_idx);
        (ColorBox::new(self.entries), ColorBox::new(right))
    }

    /// Weighted average color of the box.
    fn average(&self) -> Rgb {
        let mut sums = [0.0f64; 3];
        let mut weight = 0.0f64;
        for &(rgb, w) in &self.entries {
            let w = w as f64;
            for axis in 0..3 {
                sums[axis] += rgb[axis] as f64 * w;
            }
            weight += w;
        }
        if weight <= 0.0 {
            return Rgb::new(0.0, 0.0, 0.0);
        }
        Rgb::new(
            (sums[0] / weight) as f32,
            (sums[1] / weight) as f32,
            (sums[2] / weight) as f32,
        )
    }
}

/// Extract up to `max_colors` dominant colors from raw RGBA pixel data.
///
/// Pixels with alpha below the transparency cutoff are ignored. An image
/// with no opaque pixels yields an empty palette; that is not an error.
///
/// Output entries are sorted by descending proportion.
///
/// # Errors
///
/// Returns [`QuantizeError::InvalidBufferLength`] if `rgba` is not a whole
/// number of RGBA quads, and [`QuantizeError::ZeroTargetColors`] if
/// `max_colors` is 0.
///
/// # Example
///
/// ```
/// use hue_quant::quantize;
///
/// let rgba = [255, 0, 0, 255, 255, 0, 0, 255, 0, 255, 0, 255, 0, 255, 0, 255];
/// let palette = quantize(&rgba, 4).unwrap();
/// assert_eq!(palette.len(), 2); // only two distinct colors exist
/// ```
pub fn quantize(rgba: &[u8], max_colors: usize) -> Result<Vec<PaletteColor>, QuantizeError> {
    if rgba.len() % 4 != 0 {
        return Err(QuantizeError::InvalidBufferLength { len: rgba.len() });
    }
    if max_colors == 0 {
        return Err(QuantizeError::ZeroTargetColors);
    }

    let mut histogram: HashMap<[u8; 3], u32> = HashMap::new();
    for px in rgba.chunks_exact(4) {
        if px[3] < ALPHA_THRESHOLD {
            continue;
        }
        *histogram.entry([px[0], px[1], px[2]]).or_insert(0) += 1;
    }
    if histogram.is_empty() {
        return Ok(Vec::new());
    }

    let total_weight: u64 = histogram.values().map(|&w| w as u64).sum();
    let mut boxes = vec![ColorBox::new(histogram.into_iter().collect())];

    while boxes.len() < max_colors {
        // Pick the splittable box with the highest priority
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.splittable())
            .max_by_key(|(_, b)| b.priority())
            .map(|(i, _)| i);
        let Some(idx) = candidate else {
            break;
        };
        let (left, right) = boxes.swap_remove(idx).split();
        boxes.push(left);
        boxes.push(right);
    }

    let mut palette: Vec<PaletteColor> = boxes
        .iter()
        .map(|b| PaletteColor {
            rgb: b.average(),
            proportion: (b.total_weight() as f64 / total_weight as f64) as f32,
        })
        .collect();

    palette.sort_by(|a, b| {
        b.proportion
            .partial_cmp(&a.proportion)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(palette)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an RGBA buffer from (color, count) runs.
    fn runs(colors: &[([u8; 3], usize)]) -> Vec<u8> {
        let mut buf = Vec::new();
        for &(rgb, count) in colors {
            for _ in 0..count {
                buf.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
            }
        }
        buf
    }

    #[test]
    fn test_solid_image_yields_single_color() {
        let rgba = runs(&[([10, 20, 30], 16)]);
        let palette = quantize(&rgba, 5).unwrap();
        assert_eq!(palette.len(), 1);
        assert_eq!(palette[0].rgb.to_bytes(), [10, 20, 30]);
        assert!((palette[0].proportion - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_two_colors_split_by_area() {
        let rgba = runs(&[([255, 0, 0], 12), ([0, 0, 255], 4)]);
        let palette = quantize(&rgba, 2).unwrap();
        assert_eq!(palette.len(), 2);
        // Sorted by descending proportion: red first
        assert_eq!(palette[0].rgb.to_bytes(), [255, 0, 0]);
        assert!((palette[0].proportion - 0.75).abs() < 1e-6);
        assert!((palette[1].proportion - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_proportions_sum_to_one() {
        let rgba = runs(&[
            ([255, 0, 0], 5),
            ([0, 255, 0], 7),
            ([0, 0, 255], 3),
            ([128, 128, 0], 9),
        ]);
        let palette = quantize(&rgba, 3).unwrap();
        let sum: f32 = palette.iter().map(|p| p.proportion).sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(palette.iter().all(|p| p.is_valid()));
    }

    #[test]
    fn test_transparent_pixels_ignored() {
        let mut rgba = runs(&[([255, 0, 0], 4)]);
        // Four fully transparent green pixels
        for _ in 0..4 {
            rgba.extend_from_slice(&[0, 255, 0, 0]);
        }
        let palette = quantize(&rgba, 4).unwrap();
        assert_eq!(palette.len(), 1);
        assert_eq!(palette[0].rgb.to_bytes(), [255, 0, 0]);
    }

    #[test]
    fn test_fully_transparent_image_yields_empty_palette() {
        let rgba = [0u8, 0, 0, 0, 255, 255, 255, 0];
        let palette = quantize(&rgba, 4).unwrap();
        assert!(palette.is_empty());
    }

    #[test]
    fn test_invalid_buffer_length() {
        let err = quantize(&[1, 2, 3], 4).unwrap_err();
        assert_eq!(err, QuantizeError::InvalidBufferLength { len: 3 });
    }

    #[test]
    fn test_zero_target_colors() {
        let err = quantize(&[0, 0, 0, 255], 0).unwrap_err();
        assert_eq!(err, QuantizeError::ZeroTargetColors);
    }

    #[test]
    fn test_more_colors_requested_than_present() {
        let rgba = runs(&[([1, 2, 3], 2), ([200, 100, 50], 2)]);
        let palette = quantize(&rgba, 8).unwrap();
        assert_eq!(palette.len(), 2);
    }

    #[test]
    fn test_dominant_color_recovered_from_noise() {
        // 90% near-red with slight channel jitter, 10% blue
        let mut colors: Vec<([u8; 3], usize)> = Vec::new();
        for i in 0..9 {
            colors.push(([250 - i as u8, i as u8, 0], 10));
        }
        colors.push(([0, 0, 255], 10));
        let palette = quantize(&runs(&colors), 2).unwrap();
        assert_eq!(palette.len(), 2);
        // The dominant entry averages the reds
        assert!(palette[0].rgb.r > 200.0);
        assert!((palette[0].proportion - 0.9).abs() < 1e-5);
    }
}
