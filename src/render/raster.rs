//! # Raster Buffer
//!
//! A packed bitmap ready for device transmission.
//!
//! ## Layout
//!
//! Rows are byte-packed MSB-first, one bit per pixel at 1 bpp. The stride
//! invariant holds for every buffer:
//!
//! ```text
//! stride = ceil(width * bits_per_pixel / 8)
//! data.len() = stride * height
//! ```
//!
//! Bit depth is 1 for monochrome heads; higher depths (grayscale or
//! dual-color stock) keep the same row packing with `bpp` bits per pixel.

use image::GrayImage;

use crate::render::dither::{self, Binarization};

/// Packed raster bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bits per pixel (1 = monochrome)
    pub bpp: u8,
    /// Byte-packed rows, `stride()` bytes per row
    pub data: Vec<u8>,
}

impl RasterBuffer {
    /// Create an all-white monochrome buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_depth(width, height, 1)
    }

    /// Create an all-white buffer with the given bit depth.
    pub fn with_depth(width: u32, height: u32, bpp: u8) -> Self {
        let stride = Self::stride_for(width, bpp);
        Self {
            width,
            height,
            bpp,
            data: vec![0u8; stride * height as usize],
        }
    }

    /// Row stride in bytes: `ceil(width * bpp / 8)`.
    #[inline]
    pub fn stride(&self) -> usize {
        Self::stride_for(self.width, self.bpp)
    }

    #[inline]
    fn stride_for(width: u32, bpp: u8) -> usize {
        (width as usize * bpp as usize).div_ceil(8)
    }

    /// One packed row. Panics if `y` is out of range.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Set a pixel (1 bpp only). Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        debug_assert_eq!(self.bpp, 1);
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y as usize * self.stride() + x as usize / 8;
        let mask = 0x80u8 >> (x % 8);
        if on {
            self.data[idx] |= mask;
        } else {
            self.data[idx] &= !mask;
        }
    }

    /// Read a pixel (1 bpp only). Out-of-range coordinates read as white.
    pub fn get_pixel(&self, x: u32, y: u32) -> bool {
        debug_assert_eq!(self.bpp, 1);
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.stride() + x as usize / 8;
        self.data[idx] & (0x80 >> (x % 8)) != 0
    }

    /// Binarize an f32 intensity buffer (row-major, `0.0` white, `1.0`
    /// black) into a packed monochrome raster.
    pub fn from_intensity(width: u32, height: u32, intensity: &[f32], mode: Binarization) -> Self {
        let mut raster = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = intensity
                    .get(y as usize * width as usize + x as usize)
                    .copied()
                    .unwrap_or(0.0);
                if dither::decide(x as usize, y as usize, v, mode) {
                    raster.set_pixel(x, y, true);
                }
            }
        }
        raster
    }

    /// Rotate 90 degrees clockwise. Width and height swap.
    pub fn rotate90(&self) -> Self {
        let mut out = Self::new(self.height, self.width);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get_pixel(x, y) {
                    out.set_pixel(self.height - 1 - y, x, true);
                }
            }
        }
        out
    }

    /// Rotate 180 degrees.
    pub fn rotate180(&self) -> Self {
        let mut out = Self::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get_pixel(x, y) {
                    out.set_pixel(self.width - 1 - x, self.height - 1 - y, true);
                }
            }
        }
        out
    }

    /// Rotate 270 degrees clockwise (90 counter-clockwise).
    pub fn rotate270(&self) -> Self {
        let mut out = Self::new(self.height, self.width);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get_pixel(x, y) {
                    out.set_pixel(y, self.width - 1 - x, true);
                }
            }
        }
        out
    }

    /// Export as a grayscale preview image (black dots on white).
    pub fn to_image(&self) -> GrayImage {
        let mut img = GrayImage::from_pixel(self.width.max(1), self.height.max(1), image::Luma([255]));
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get_pixel(x, y) {
                    img.put_pixel(x, y, image::Luma([0]));
                }
            }
        }
        img
    }

    /// Fraction of black pixels, for tests and diagnostics.
    pub fn ink_coverage(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }
        let mut black = 0usize;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get_pixel(x, y) {
                    black += 1;
                }
            }
        }
        black as f32 / (self.width as usize * self.height as usize) as f32
    }
}
