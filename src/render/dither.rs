//! # Binarization
//!
//! Converts continuous-tone (grayscale) intensity buffers to the binary
//! output a thermal head can print.
//!
//! Two strategies are provided:
//!
//! - **Bayer 8x8 ordered dithering**: simulates gray by varying dot density.
//!   Deterministic, O(1) per pixel, no error accumulation. Used for images.
//! - **Fixed threshold**: everything above the cutoff prints black. Used for
//!   text, barcodes and shapes, which are already hard-edged.
//!
//! Intensity convention throughout: `0.0` = white, `1.0` = black.

/// Bayer 8x8 dithering matrix.
///
/// Values range 0-63, arranged so low values activate first at low
/// intensities and the distribution minimizes visible patterns.
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// How to turn a grayscale intensity into a printed dot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binarization {
    /// Bayer 8x8 ordered dithering
    Bayer,
    /// Fixed threshold in [0, 255]; intensity above `level/255` prints black
    Threshold(u8),
}

impl Default for Binarization {
    fn default() -> Self {
        Binarization::Threshold(127)
    }
}

/// Decide whether a pixel at (x, y) with the given intensity prints black
/// under Bayer dithering.
#[inline]
pub fn should_print(x: usize, y: usize, intensity: f32) -> bool {
    let threshold = (BAYER8[y % 8][x % 8] as f32 + 0.5) / 64.0;
    intensity > threshold
}

/// Decide a pixel under the given binarization strategy.
#[inline]
pub fn decide(x: usize, y: usize, intensity: f32, mode: Binarization) -> bool {
    match mode {
        Binarization::Bayer => should_print(x, y, intensity),
        Binarization::Threshold(level) => intensity > level as f32 / 255.0,
    }
}

/// Pack a row of booleans into bytes, MSB first. `true` = black dot.
///
/// The final byte is zero-padded on the right when the width is not a
/// multiple of 8.
pub fn pack_row(row: &[bool]) -> Vec<u8> {
    let mut packed = vec![0u8; row.len().div_ceil(8)];
    for (i, &on) in row.iter().enumerate() {
        if on {
            packed[i / 8] |= 0x80 >> (i % 8);
        }
    }
    packed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bayer_extremes() {
        // Pure white never prints, pure black always prints
        for y in 0..8 {
            for x in 0..8 {
                assert!(!should_print(x, y, 0.0));
                assert!(should_print(x, y, 1.0));
            }
        }
    }

    #[test]
    fn test_bayer_mid_gray_density() {
        // 50% gray should print roughly half the dots in an 8x8 tile
        let count = (0..64)
            .filter(|i| should_print(i % 8, i / 8, 0.5))
            .count();
        assert!((28..=36).contains(&count), "got {} dots", count);
    }

    #[test]
    fn test_threshold() {
        assert!(decide(0, 0, 0.6, Binarization::Threshold(127)));
        assert!(!decide(0, 0, 0.4, Binarization::Threshold(127)));
        // High threshold needs darker pixels
        assert!(!decide(0, 0, 0.6, Binarization::Threshold(200)));
    }

    #[test]
    fn test_pack_row() {
        let row = vec![true, true, false, false, true, false, true, false];
        assert_eq!(pack_row(&row), vec![0b1100_1010]);
    }

    #[test]
    fn test_pack_row_partial_byte() {
        // 10 pixels span 2 bytes, trailing bits padded with zeros
        let mut row = vec![false; 10];
        row[0] = true;
        row[9] = true;
        assert_eq!(pack_row(&row), vec![0b1000_0000, 0b0100_0000]);
    }

    #[test]
    fn test_pack_row_empty() {
        assert!(pack_row(&[]).is_empty());
    }
}
