//! # Label Canvas
//!
//! An explicit, caller-owned drawing surface for one label design.
//!
//! The canvas is built in **millimeters**: the caller adds primitives (text,
//! 1D/2D barcodes, lines, shapes, images), each validated against the canvas
//! bounds and its own parameter rules at draw time. A failed draw returns an
//! error and leaves the canvas untouched. [`Canvas::render`] then converts
//! everything to printer dots and produces a packed [`RasterBuffer`].
//!
//! ```
//! use rotulo::canvas::{Canvas, Rotation, Text};
//! use rotulo::printer::PrinterConfig;
//!
//! let mut canvas = Canvas::new(50.0, 30.0, Rotation::R0, &PrinterConfig::B21)?;
//! canvas.draw_text(Text {
//!     x: 2.0, y: 2.0, w: 46.0, h: 8.0,
//!     content: "Hello".to_string(),
//!     font_size: 4.0,
//!     ..Default::default()
//! })?;
//! let raster = canvas.render(1.0)?;
//! assert_eq!(raster.stride(), (raster.width as usize).div_ceil(8));
//! # Ok::<(), rotulo::error::CanvasError>(())
//! ```
//!
//! The primitive list serializes to JSON ([`Canvas::to_json`]) as the label
//! description submitted with a print job, and round-trips back with
//! [`Canvas::from_json`].

use serde::{Deserialize, Serialize};

use crate::error::CanvasError;
use crate::printer::PrinterConfig;
use crate::render::{Binarization, RasterBuffer};
use crate::units;

pub mod barcode;
pub mod image;
pub mod shape;
pub mod text;

pub use barcode::{Symbology1d, Symbology2d};

/// Geometry tolerance for bounds checks, in millimeters.
const EPSILON_MM: f32 = 0.05;

/// Maximum canvas edge in millimeters.
const MAX_EDGE_MM: f32 = 1000.0;

// ============================================================================
// GEOMETRY
// ============================================================================

/// Rotation in quarter turns. The only angles the printer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Parse degrees; anything outside {0, 90, 180, 270} is rejected.
    pub fn from_degrees(degrees: i32) -> Result<Self, CanvasError> {
        match degrees {
            0 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            other => Err(CanvasError::InvalidRotation(other)),
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Whether this rotation swaps width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }
}

impl TryFrom<i32> for Rotation {
    type Error = CanvasError;
    fn try_from(v: i32) -> Result<Self, Self::Error> {
        Rotation::from_degrees(v)
    }
}

impl From<Rotation> for i32 {
    fn from(r: Rotation) -> i32 {
        r.degrees()
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// What happens when text exceeds its box width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineMode {
    /// Word-wrap onto additional lines
    #[default]
    Wrap,
    /// Clip at the box edge
    Clip,
}

/// Outline style for lines and shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "style")]
pub enum LineStyle {
    Solid,
    /// Dash/space lengths in millimeters
    Dashed { dash: f32, gap: f32 },
}

impl Default for LineStyle {
    fn default() -> Self {
        LineStyle::Solid
    }
}

// ============================================================================
// PRIMITIVES
// ============================================================================

/// Font style flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
}

/// Text element. Position, size and spacing are millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub content: String,
    /// Glyph height in millimeters
    pub font_size: f32,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub h_align: HAlign,
    #[serde(default)]
    pub v_align: VAlign,
    #[serde(default)]
    pub line_mode: LineMode,
    /// Extra space between characters, millimeters
    #[serde(default)]
    pub letter_spacing: f32,
    /// Extra space between lines, millimeters
    #[serde(default)]
    pub line_spacing: f32,
    #[serde(default)]
    pub style: TextStyle,
}

impl Default for Text {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: 10.0,
            h: 5.0,
            content: String::new(),
            font_size: 3.0,
            rotation: Rotation::R0,
            h_align: HAlign::Left,
            v_align: VAlign::Top,
            line_mode: LineMode::Wrap,
            letter_spacing: 0.0,
            line_spacing: 0.0,
            style: TextStyle::default(),
        }
    }
}

/// Where the human-readable text of a 1D barcode goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPosition {
    #[default]
    Below,
    Above,
    Hidden,
}

/// 1D barcode element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barcode1d {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    /// Total height including the human-readable text band
    pub h: f32,
    pub content: String,
    pub symbology: Symbology1d,
    #[serde(default)]
    pub rotation: Rotation,
    /// Height of the human-readable text band, millimeters
    #[serde(default = "default_text_height")]
    pub text_height: f32,
    #[serde(default)]
    pub text_position: TextPosition,
}

fn default_text_height() -> f32 {
    3.0
}

/// 2D barcode element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barcode2d {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub content: String,
    pub symbology: Symbology2d,
    #[serde(default)]
    pub rotation: Rotation,
}

/// Line element: a filled w x h bar, optionally dashed along its long axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default, flatten)]
    pub line_style: LineStyle,
}

/// Shape outline kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ShapeKind {
    Rectangle,
    /// Corner radius in millimeters
    RoundedRectangle { radius: f32 },
    Ellipse,
    Circle,
}

/// Shape element: an outline drawn with `line_width` ink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(flatten)]
    pub kind: ShapeKind,
    /// Outline thickness in millimeters
    pub line_width: f32,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default, flatten)]
    pub line_style: LineStyle,
}

/// How image pixels become ink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ImageProcessing {
    /// Hard cutoff: luma at or below `level` prints black
    Threshold { level: u8 },
    /// Keep grayscale and let Bayer dithering pattern it
    Dither,
}

impl Default for ImageProcessing {
    fn default() -> Self {
        ImageProcessing::Threshold { level: 127 }
    }
}

/// Image element carrying encoded image bytes (PNG, JPEG, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    /// Encoded image file contents
    pub data: Vec<u8>,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub processing: ImageProcessing,
}

/// One draw primitive on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    Text(Text),
    Barcode1d(Barcode1d),
    Barcode2d(Barcode2d),
    Line(Line),
    Shape(Shape),
    Image(ImageElement),
}

impl Primitive {
    /// Bounding footprint (x, y, w, h) in canvas millimeters, accounting for
    /// the element's own rotation (90/270 swap the box axes).
    fn footprint(&self) -> (f32, f32, f32, f32, Rotation) {
        let (x, y, w, h, r) = match self {
            Primitive::Text(t) => (t.x, t.y, t.w, t.h, t.rotation),
            Primitive::Barcode1d(b) => (b.x, b.y, b.w, b.h, b.rotation),
            Primitive::Barcode2d(b) => (b.x, b.y, b.w, b.h, b.rotation),
            Primitive::Line(l) => (l.x, l.y, l.w, l.h, l.rotation),
            Primitive::Shape(s) => (s.x, s.y, s.w, s.h, s.rotation),
            Primitive::Image(i) => (i.x, i.y, i.w, i.h, i.rotation),
        };
        if r.swaps_axes() {
            (x, y, h, w, r)
        } else {
            (x, y, w, h, r)
        }
    }
}

// ============================================================================
// CANVAS
// ============================================================================

/// Intensity buffer for one rendered element, positioned in canvas pixels.
pub(crate) struct ElementRaster {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
    /// Row-major darkness, 0.0 white to 1.0 black
    pub intensity: Vec<f32>,
}

impl ElementRaster {
    /// Rotate the intensity buffer clockwise by the element rotation.
    pub(crate) fn rotate(mut self, rotation: Rotation) -> Self {
        let (w, h) = (self.width, self.height);
        match rotation {
            Rotation::R0 => self,
            Rotation::R180 => {
                self.intensity.reverse();
                self
            }
            Rotation::R90 => {
                let mut out = vec![0.0f32; w * h];
                for y in 0..h {
                    for x in 0..w {
                        out[x * h + (h - 1 - y)] = self.intensity[y * w + x];
                    }
                }
                Self {
                    width: h,
                    height: w,
                    intensity: out,
                    ..self
                }
            }
            Rotation::R270 => {
                let mut out = vec![0.0f32; w * h];
                for y in 0..h {
                    for x in 0..w {
                        out[(w - 1 - x) * h + y] = self.intensity[y * w + x];
                    }
                }
                Self {
                    width: h,
                    height: w,
                    intensity: out,
                    ..self
                }
            }
        }
    }
}

/// A label drawing surface. See the [module docs](self) for usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Canvas {
    /// Label width in millimeters
    pub width_mm: f32,
    /// Label height in millimeters
    pub height_mm: f32,
    /// Whole-label rotation applied after compositing
    pub rotation: Rotation,
    /// Printer dot density this canvas renders for
    pub dots_per_mm: f32,
    /// Ordered draw primitives
    pub primitives: Vec<Primitive>,
}

impl Canvas {
    /// Create an empty canvas for the given printer.
    ///
    /// Fails if the dimensions are non-positive or implausibly large.
    pub fn new(
        width_mm: f32,
        height_mm: f32,
        rotation: Rotation,
        config: &PrinterConfig,
    ) -> Result<Self, CanvasError> {
        if !(width_mm > 0.0 && height_mm > 0.0) {
            return Err(CanvasError::InvalidParam(format!(
                "canvas {}x{}mm must have positive dimensions",
                width_mm, height_mm
            )));
        }
        if width_mm > MAX_EDGE_MM || height_mm > MAX_EDGE_MM {
            return Err(CanvasError::InvalidParam(format!(
                "canvas {}x{}mm exceeds {}mm edge limit",
                width_mm, height_mm, MAX_EDGE_MM
            )));
        }
        Ok(Self {
            width_mm,
            height_mm,
            rotation,
            dots_per_mm: config.dots_per_mm(),
            primitives: Vec::new(),
        })
    }

    /// Re-initialize: new dimensions and rotation, all primitives cleared.
    pub fn reset(
        &mut self,
        width_mm: f32,
        height_mm: f32,
        rotation: Rotation,
    ) -> Result<(), CanvasError> {
        if !(width_mm > 0.0 && height_mm > 0.0) || width_mm > MAX_EDGE_MM || height_mm > MAX_EDGE_MM
        {
            return Err(CanvasError::InvalidParam(format!(
                "canvas {}x{}mm out of range",
                width_mm, height_mm
            )));
        }
        self.width_mm = width_mm;
        self.height_mm = height_mm;
        self.rotation = rotation;
        self.primitives.clear();
        Ok(())
    }

    fn check_bounds(&self, p: &Primitive) -> Result<(), CanvasError> {
        let (x, y, w, h, _) = p.footprint();
        if !(w > 0.0 && h > 0.0) {
            return Err(CanvasError::InvalidParam(format!(
                "element {}x{}mm must have positive size",
                w, h
            )));
        }
        if x < -EPSILON_MM
            || y < -EPSILON_MM
            || x + w > self.width_mm + EPSILON_MM
            || y + h > self.height_mm + EPSILON_MM
        {
            return Err(CanvasError::OutOfBounds(format!(
                "element at ({}, {}) size {}x{}mm exceeds {}x{}mm canvas",
                x, y, w, h, self.width_mm, self.height_mm
            )));
        }
        Ok(())
    }

    /// Draw a text element.
    pub fn draw_text(&mut self, text: Text) -> Result<(), CanvasError> {
        if text.content.is_empty() {
            return Err(CanvasError::InvalidParam("empty text content".to_string()));
        }
        if text.font_size <= 0.0 {
            return Err(CanvasError::InvalidParam(format!(
                "font size {}mm must be positive",
                text.font_size
            )));
        }
        let p = Primitive::Text(text);
        self.check_bounds(&p)?;
        self.primitives.push(p);
        Ok(())
    }

    /// Draw a 1D barcode. Content is validated for the chosen symbology
    /// before anything is added.
    pub fn draw_barcode_1d(&mut self, barcode: Barcode1d) -> Result<(), CanvasError> {
        barcode::validate_1d(barcode.symbology, &barcode.content)?;
        let p = Primitive::Barcode1d(barcode);
        self.check_bounds(&p)?;
        self.primitives.push(p);
        Ok(())
    }

    /// Draw a 2D barcode (QR, PDF417).
    pub fn draw_barcode_2d(&mut self, barcode: Barcode2d) -> Result<(), CanvasError> {
        barcode::validate_2d(barcode.symbology, &barcode.content)?;
        let p = Primitive::Barcode2d(barcode);
        self.check_bounds(&p)?;
        self.primitives.push(p);
        Ok(())
    }

    /// Draw a line.
    pub fn draw_line(&mut self, line: Line) -> Result<(), CanvasError> {
        if let LineStyle::Dashed { dash, gap } = line.line_style {
            if dash <= 0.0 || gap <= 0.0 {
                return Err(CanvasError::InvalidParam(format!(
                    "dash segments {}/{}mm must be positive",
                    dash, gap
                )));
            }
        }
        let p = Primitive::Line(line);
        self.check_bounds(&p)?;
        self.primitives.push(p);
        Ok(())
    }

    /// Draw a shape outline.
    pub fn draw_shape(&mut self, shape: Shape) -> Result<(), CanvasError> {
        if shape.line_width <= 0.0 {
            return Err(CanvasError::InvalidParam(format!(
                "line width {}mm must be positive",
                shape.line_width
            )));
        }
        if let ShapeKind::RoundedRectangle { radius } = shape.kind {
            if radius < 0.0 {
                return Err(CanvasError::InvalidParam(
                    "corner radius must be non-negative".to_string(),
                ));
            }
        }
        let p = Primitive::Shape(shape);
        self.check_bounds(&p)?;
        self.primitives.push(p);
        Ok(())
    }

    /// Draw an image. The bytes are decoded up front so bad data fails here,
    /// not at render time.
    pub fn draw_image(&mut self, element: ImageElement) -> Result<(), CanvasError> {
        image::validate(&element.data)?;
        let p = Primitive::Image(element);
        self.check_bounds(&p)?;
        self.primitives.push(p);
        Ok(())
    }

    /// Serialize the label description to JSON.
    pub fn to_json(&self) -> Result<String, CanvasError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuild a canvas from a label JSON description.
    ///
    /// Geometry and every primitive are re-validated, so hand-edited JSON
    /// gets the same checks as the draw calls.
    pub fn from_json(json: &str) -> Result<Self, CanvasError> {
        let parsed: Canvas = serde_json::from_str(json)?;
        if !(parsed.width_mm > 0.0 && parsed.height_mm > 0.0)
            || parsed.width_mm > MAX_EDGE_MM
            || parsed.height_mm > MAX_EDGE_MM
            || parsed.dots_per_mm <= 0.0
        {
            return Err(CanvasError::InvalidParam(
                "canvas geometry out of range".to_string(),
            ));
        }
        for p in &parsed.primitives {
            parsed.check_bounds(p)?;
            match p {
                Primitive::Barcode1d(b) => barcode::validate_1d(b.symbology, &b.content)?,
                Primitive::Barcode2d(b) => barcode::validate_2d(b.symbology, &b.content)?,
                Primitive::Image(i) => image::validate(&i.data)?,
                _ => {}
            }
        }
        Ok(parsed)
    }

    /// Width in pixels at the given magnification.
    pub fn width_px(&self, scale: f32) -> u32 {
        units::mm_to_px(self.width_mm, self.dots_per_mm, scale).max(1) as u32
    }

    /// Height in pixels at the given magnification.
    pub fn height_px(&self, scale: f32) -> u32 {
        units::mm_to_px(self.height_mm, self.dots_per_mm, scale).max(1) as u32
    }

    /// Rasterize all primitives to a packed monochrome buffer.
    ///
    /// `scale` is 1.0 for printing; larger values produce magnified preview
    /// rasters. The canvas rotation is applied last, so a rotated canvas
    /// swaps the output buffer's axes.
    pub fn render(&self, scale: f32) -> Result<RasterBuffer, CanvasError> {
        if scale <= 0.0 {
            return Err(CanvasError::InvalidParam(format!(
                "render scale {} must be positive",
                scale
            )));
        }

        let width = self.width_px(scale);
        let height = self.height_px(scale);
        let px_per_mm = self.dots_per_mm * scale;
        let mut intensity = vec![0.0f32; width as usize * height as usize];

        for p in &self.primitives {
            let element = self.render_primitive(p, px_per_mm)?;
            blit_max(&mut intensity, width as usize, height as usize, &element);
        }

        let raster = RasterBuffer::from_intensity(width, height, &intensity, Binarization::Bayer);
        Ok(match self.rotation {
            Rotation::R0 => raster,
            Rotation::R90 => raster.rotate90(),
            Rotation::R180 => raster.rotate180(),
            Rotation::R270 => raster.rotate270(),
        })
    }

    /// Render the label preview image at the given display magnification.
    pub fn preview(&self, display_scale: f32) -> Result<::image::GrayImage, CanvasError> {
        Ok(self.render(display_scale)?.to_image())
    }

    fn render_primitive(
        &self,
        p: &Primitive,
        px_per_mm: f32,
    ) -> Result<ElementRaster, CanvasError> {
        let element = match p {
            Primitive::Text(t) => text::render(t, px_per_mm),
            Primitive::Barcode1d(b) => barcode::render_1d(b, px_per_mm)?,
            Primitive::Barcode2d(b) => barcode::render_2d(b, px_per_mm)?,
            Primitive::Line(l) => shape::render_line(l, px_per_mm),
            Primitive::Shape(s) => shape::render_shape(s, px_per_mm),
            Primitive::Image(i) => image::render(i, px_per_mm)?,
        };
        let rotation = p.footprint().4;
        Ok(element.rotate(rotation))
    }
}

/// Composite an element onto the canvas intensity buffer. Ink accumulates:
/// the darker value wins, so overlapping elements never erase each other.
fn blit_max(dst: &mut [f32], dst_w: usize, dst_h: usize, el: &ElementRaster) {
    for row in 0..el.height {
        let dy = el.y + row as i32;
        if dy < 0 || dy as usize >= dst_h {
            continue;
        }
        for col in 0..el.width {
            let dx = el.x + col as i32;
            if dx < 0 || dx as usize >= dst_w {
                continue;
            }
            let src = el.intensity[row * el.width + col];
            let idx = dy as usize * dst_w + dx as usize;
            if src > dst[idx] {
                dst[idx] = src;
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Canvas {
        Canvas::new(50.0, 30.0, Rotation::R0, &PrinterConfig::B21).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_dimensions() {
        let config = PrinterConfig::B21;
        assert!(Canvas::new(0.0, 30.0, Rotation::R0, &config).is_err());
        assert!(Canvas::new(50.0, -1.0, Rotation::R0, &config).is_err());
        assert!(Canvas::new(50.0, 1001.0, Rotation::R0, &config).is_err());
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(90).unwrap(), Rotation::R90);
        assert!(matches!(
            Rotation::from_degrees(45),
            Err(CanvasError::InvalidRotation(45))
        ));
    }

    #[test]
    fn test_draw_text_out_of_bounds_leaves_canvas_unchanged() {
        let mut c = canvas();
        let result = c.draw_text(Text {
            x: 45.0,
            y: 2.0,
            w: 10.0, // 45 + 10 > 50
            h: 5.0,
            content: "overflow".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(CanvasError::OutOfBounds(_))));
        assert!(c.primitives.is_empty());
    }

    #[test]
    fn test_rotated_element_footprint_swaps_axes() {
        let mut c = canvas();
        // 20x4 box rotated 90 degrees occupies 4x20; fits at x=47
        let ok = c.draw_text(Text {
            x: 45.0,
            y: 2.0,
            w: 20.0,
            h: 4.0,
            rotation: Rotation::R90,
            content: "tall".to_string(),
            ..Default::default()
        });
        assert!(ok.is_ok());
        // Same box unrotated does not fit
        let err = c.draw_text(Text {
            x: 45.0,
            y: 2.0,
            w: 20.0,
            h: 4.0,
            content: "wide".to_string(),
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_reset_clears_primitives() {
        let mut c = canvas();
        c.draw_text(Text {
            x: 1.0,
            y: 1.0,
            w: 20.0,
            h: 5.0,
            content: "x".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(c.primitives.len(), 1);
        c.reset(40.0, 20.0, Rotation::R180).unwrap();
        assert!(c.primitives.is_empty());
        assert_eq!(c.width_mm, 40.0);
        assert_eq!(c.rotation, Rotation::R180);
    }

    #[test]
    fn test_render_stride_invariant() {
        for (w, h, rot) in [
            (50.0, 30.0, Rotation::R0),
            (12.0, 40.0, Rotation::R90),
            (30.0, 30.0, Rotation::R180),
            (25.4, 10.0, Rotation::R270),
        ] {
            let c = Canvas::new(w, h, rot, &PrinterConfig::B21).unwrap();
            let raster = c.render(1.0).unwrap();
            assert_eq!(
                raster.stride(),
                (raster.width as usize * raster.bpp as usize).div_ceil(8)
            );
            assert_eq!(raster.data.len(), raster.stride() * raster.height as usize);
        }
    }

    #[test]
    fn test_render_rotation_swaps_output_axes() {
        let c0 = Canvas::new(50.0, 30.0, Rotation::R0, &PrinterConfig::B21).unwrap();
        let c90 = Canvas::new(50.0, 30.0, Rotation::R90, &PrinterConfig::B21).unwrap();
        let r0 = c0.render(1.0).unwrap();
        let r90 = c90.render(1.0).unwrap();
        assert_eq!((r90.width, r90.height), (r0.height, r0.width));
    }

    #[test]
    fn test_render_scale_rejects_non_positive() {
        assert!(canvas().render(0.0).is_err());
        assert!(canvas().render(-2.0).is_err());
    }

    #[test]
    fn test_text_marks_pixels() {
        let mut c = canvas();
        c.draw_text(Text {
            x: 2.0,
            y: 2.0,
            w: 40.0,
            h: 10.0,
            content: "ABC".to_string(),
            font_size: 6.0,
            ..Default::default()
        })
        .unwrap();
        let raster = c.render(1.0).unwrap();
        assert!(raster.ink_coverage() > 0.0);
    }

    #[test]
    fn test_json_round_trip() {
        let mut c = canvas();
        c.draw_line(Line {
            x: 1.0,
            y: 14.0,
            w: 48.0,
            h: 0.5,
            rotation: Rotation::R0,
            line_style: LineStyle::Solid,
        })
        .unwrap();
        c.draw_barcode_2d(Barcode2d {
            x: 5.0,
            y: 5.0,
            w: 15.0,
            h: 15.0,
            content: "https://example.com".to_string(),
            symbology: Symbology2d::QrCode,
            rotation: Rotation::R0,
        })
        .unwrap();

        let json = c.to_json().unwrap();
        let back = Canvas::from_json(&json).unwrap();
        assert_eq!(back.primitives, c.primitives);
        assert_eq!(back.width_mm, c.width_mm);
    }

    #[test]
    fn test_from_json_revalidates() {
        // Out-of-bounds primitive smuggled in via JSON is rejected
        let mut c = canvas();
        c.draw_line(Line {
            x: 1.0,
            y: 1.0,
            w: 10.0,
            h: 1.0,
            rotation: Rotation::R0,
            line_style: LineStyle::Solid,
        })
        .unwrap();
        let json = c.to_json().unwrap().replace("\"w\":10.0", "\"w\":500.0");
        assert!(Canvas::from_json(&json).is_err());
    }

    #[test]
    fn test_ean13_alphabetic_rejected_canvas_unchanged() {
        let mut c = canvas();
        let result = c.draw_barcode_1d(Barcode1d {
            x: 5.0,
            y: 5.0,
            w: 40.0,
            h: 12.0,
            content: "abcde".to_string(),
            symbology: Symbology1d::Ean13,
            rotation: Rotation::R0,
            text_height: 3.0,
            text_position: TextPosition::Below,
        });
        assert!(matches!(result, Err(CanvasError::InvalidContent { .. })));
        assert!(c.primitives.is_empty());
    }

    #[test]
    fn test_element_raster_rotate90() {
        // 2x1 buffer [a, b] rotated cw becomes 1x2 [a; b]
        let el = ElementRaster {
            x: 0,
            y: 0,
            width: 2,
            height: 1,
            intensity: vec![0.25, 0.75],
        };
        let rot = el.rotate(Rotation::R90);
        assert_eq!((rot.width, rot.height), (1, 2));
        assert_eq!(rot.intensity, vec![0.25, 0.75]);
    }

    #[test]
    fn test_element_raster_rotate180() {
        let el = ElementRaster {
            x: 0,
            y: 0,
            width: 2,
            height: 1,
            intensity: vec![0.25, 0.75],
        };
        let rot = el.rotate(Rotation::R180);
        assert_eq!(rot.intensity, vec![0.75, 0.25]);
    }
}
