//! # Rendering Module
//!
//! Raster plumbing between the canvas and the protocol codec.
//!
//! ## Modules
//!
//! - [`raster`]: packed 1-bit raster buffers with the stride invariant
//!   `stride == ceil(width * bpp / 8)`
//! - [`dither`]: Bayer 8x8 ordered dithering and fixed thresholding for
//!   converting grayscale intensity to binary output

pub mod dither;
pub mod raster;

pub use dither::Binarization;
pub use raster::RasterBuffer;
