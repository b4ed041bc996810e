//! Error types for color parsing and quantization.

use std::num::ParseIntError;

use thiserror::Error;

/// Error type for parsing hex color strings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseColorError {
    /// Hex string has invalid length (must be 6 characters after stripping '#')
    #[error("invalid hex color length (expected 6 characters)")]
    InvalidLength,

    /// Invalid hexadecimal character encountered
    #[error("invalid hex character: {0}")]
    InvalidHex(#[from] ParseIntError),
}

/// Error type for palette extraction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantizeError {
    /// Pixel buffer length is not a multiple of 4 (RGBA)
    #[error("pixel buffer length {len} is not a multiple of 4")]
    InvalidBufferLength {
        /// Actual buffer length in bytes
        len: usize,
    },

    /// Requested palette size was zero
    #[error("requested palette size must be at least 1")]
    ZeroTargetColors,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_error_display() {
        let err = QuantizeError::InvalidBufferLength { len: 7 };
        assert_eq!(err.to_string(), "pixel buffer length 7 is not a multiple of 4");

        let err = QuantizeError::ZeroTargetColors;
        assert_eq!(err.to_string(), "requested palette size must be at least 1");
    }

    #[test]
    fn test_parse_color_error_display() {
        assert_eq!(
            ParseColorError::InvalidLength.to_string(),
            "invalid hex color length (expected 6 characters)"
        );
    }
}
