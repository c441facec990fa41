//! Image element decoding and rasterization.
//!
//! Encoded image bytes (PNG, JPEG, anything the image crate reads) are
//! decoded to grayscale, resized to the element box, and converted to ink
//! intensity. Threshold mode produces hard black/white here; dither mode
//! keeps the gray levels so the canvas-wide Bayer pass patterns them.

use image::imageops::FilterType;

use crate::canvas::{ElementRaster, ImageElement, ImageProcessing};
use crate::error::CanvasError;
use crate::units;

/// Check that the bytes decode to an image at all.
pub(crate) fn validate(data: &[u8]) -> Result<(), CanvasError> {
    if data.is_empty() {
        return Err(CanvasError::Image("image data is empty".to_string()));
    }
    image::load_from_memory(data).map_err(|e| CanvasError::Image(e.to_string()))?;
    Ok(())
}

/// Rasterize an image element into its box.
pub(crate) fn render(el: &ImageElement, px_per_mm: f32) -> Result<ElementRaster, CanvasError> {
    let box_w = units::mm_to_px(el.w, px_per_mm, 1.0).max(1) as u32;
    let box_h = units::mm_to_px(el.h, px_per_mm, 1.0).max(1) as u32;

    let decoded =
        image::load_from_memory(&el.data).map_err(|e| CanvasError::Image(e.to_string()))?;
    let gray = decoded
        .resize_exact(box_w, box_h, FilterType::Triangle)
        .to_luma8();

    let mut intensity = vec![0.0f32; (box_w * box_h) as usize];
    for (i, pixel) in gray.pixels().enumerate() {
        let luma = pixel.0[0];
        intensity[i] = match el.processing {
            ImageProcessing::Threshold { level } => {
                if luma <= level {
                    1.0
                } else {
                    0.0
                }
            }
            ImageProcessing::Dither => 1.0 - luma as f32 / 255.0,
        };
    }

    Ok(ElementRaster {
        x: units::mm_to_px(el.x, px_per_mm, 1.0),
        y: units::mm_to_px(el.y, px_per_mm, 1.0),
        width: box_w as usize,
        height: box_h as usize,
        intensity,
    })
}
