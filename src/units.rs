//! # Unit Conversion
//!
//! Millimeter/pixel/inch conversion helpers used by the canvas.
//!
//! All label geometry is expressed in millimeters by the caller and converted
//! to printer dots at render time:
//!
//! ```text
//! pixel = round(mm * dots_per_mm * scaler)
//! ```
//!
//! `dots_per_mm` comes from the printer resolution
//! ([`PrinterConfig::dots_per_mm`](crate::printer::PrinterConfig::dots_per_mm)),
//! `scaler` is the display/print magnification (1.0 for printing, larger for
//! on-screen previews). The conversion is invertible within ±1 pixel of
//! rounding error.

/// Millimeters per inch.
pub const MM_PER_INCH: f32 = 25.4;

/// Convert millimeters to pixels at the given density and magnification.
#[inline]
pub fn mm_to_px(mm: f32, dots_per_mm: f32, scaler: f32) -> i32 {
    (mm * dots_per_mm * scaler).round() as i32
}

/// Convert pixels back to millimeters at the given density and magnification.
#[inline]
pub fn px_to_mm(px: i32, dots_per_mm: f32, scaler: f32) -> f32 {
    px as f32 / (dots_per_mm * scaler)
}

/// Convert millimeters to inches.
#[inline]
pub fn mm_to_inch(mm: f32) -> f32 {
    mm / MM_PER_INCH
}

/// Convert inches to millimeters.
#[inline]
pub fn inch_to_mm(inch: f32) -> f32 {
    inch * MM_PER_INCH
}

/// Display magnification for an on-screen preview.
///
/// Given the physical template width in millimeters and the width of the
/// display area in pixels, returns the `scaler` that makes the rendered
/// preview fill the display area.
#[inline]
pub fn display_multiple(physical_mm: f32, display_px: u32, dots_per_mm: f32) -> f32 {
    if physical_mm <= 0.0 || dots_per_mm <= 0.0 {
        return 1.0;
    }
    display_px as f32 / (physical_mm * dots_per_mm)
}
