//! Line and shape outline rasterization.
//!
//! Lines are filled bars (dashes run along the long axis). Shapes are
//! outlines drawn as the set difference between the full figure and the
//! figure shrunk by the line width, which handles rectangles, rounded
//! rectangles and ellipses with one membership test each.

use crate::canvas::{ElementRaster, Line, LineStyle, Shape, ShapeKind};
use crate::units;

/// Rasterize a line element.
pub(crate) fn render_line(line: &Line, px_per_mm: f32) -> ElementRaster {
    let w = units::mm_to_px(line.w, px_per_mm, 1.0).max(1) as usize;
    let h = units::mm_to_px(line.h, px_per_mm, 1.0).max(1) as usize;
    let mut intensity = vec![0.0f32; w * h];

    let dash_period = dash_period_px(line.line_style, px_per_mm);
    let horizontal = w >= h;

    for y in 0..h {
        for x in 0..w {
            let along = if horizontal { x } else { y };
            if dash_visible(along, dash_period) {
                intensity[y * w + x] = 1.0;
            }
        }
    }

    ElementRaster {
        x: units::mm_to_px(line.x, px_per_mm, 1.0),
        y: units::mm_to_px(line.y, px_per_mm, 1.0),
        width: w,
        height: h,
        intensity,
    }
}

/// Rasterize a shape outline.
pub(crate) fn render_shape(shape: &Shape, px_per_mm: f32) -> ElementRaster {
    let w = units::mm_to_px(shape.w, px_per_mm, 1.0).max(1) as usize;
    let h = units::mm_to_px(shape.h, px_per_mm, 1.0).max(1) as usize;
    let lw = (units::mm_to_px(shape.line_width, px_per_mm, 1.0).max(1)) as f32;
    let radius = match shape.kind {
        ShapeKind::RoundedRectangle { radius } => {
            units::mm_to_px(radius, px_per_mm, 1.0).max(0) as f32
        }
        _ => 0.0,
    };
    let dash_period = dash_period_px(shape.line_style, px_per_mm);

    let mut intensity = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let outer = inside(shape.kind, px, py, w as f32, h as f32, radius);
            let inner = inside_shrunk(shape.kind, px, py, w as f32, h as f32, radius, lw);
            if outer && !inner && dash_visible_outline(x, y, w, h, dash_period) {
                intensity[y * w + x] = 1.0;
            }
        }
    }

    ElementRaster {
        x: units::mm_to_px(shape.x, px_per_mm, 1.0),
        y: units::mm_to_px(shape.y, px_per_mm, 1.0),
        width: w,
        height: h,
        intensity,
    }
}

fn dash_period_px(style: LineStyle, px_per_mm: f32) -> Option<(usize, usize)> {
    match style {
        LineStyle::Solid => None,
        LineStyle::Dashed { dash, gap } => Some((
            units::mm_to_px(dash, px_per_mm, 1.0).max(1) as usize,
            units::mm_to_px(gap, px_per_mm, 1.0).max(1) as usize,
        )),
    }
}

fn dash_visible(along: usize, period: Option<(usize, usize)>) -> bool {
    match period {
        None => true,
        Some((dash, gap)) => along % (dash + gap) < dash,
    }
}

/// Dash phase for outlines: measured along the nearest edge so corners stay
/// drawn.
fn dash_visible_outline(
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    period: Option<(usize, usize)>,
) -> bool {
    let Some(period) = period else { return true };
    // Distance along the perimeter, approximated by the dominant axis of the
    // nearest edge.
    let to_top = y;
    let to_bottom = h - 1 - y;
    let to_left = x;
    let to_right = w - 1 - x;
    let vertical_edge = to_left.min(to_right) < to_top.min(to_bottom);
    let along = if vertical_edge { y } else { x };
    dash_visible(along, Some(period))
}

fn inside(kind: ShapeKind, px: f32, py: f32, w: f32, h: f32, radius: f32) -> bool {
    match kind {
        ShapeKind::Rectangle => px >= 0.0 && px <= w && py >= 0.0 && py <= h,
        ShapeKind::RoundedRectangle { .. } => inside_rounded(px, py, w, h, radius),
        ShapeKind::Ellipse => inside_ellipse(px, py, w / 2.0, h / 2.0, w / 2.0, h / 2.0),
        ShapeKind::Circle => {
            let r = w.min(h) / 2.0;
            inside_ellipse(px, py, w / 2.0, h / 2.0, r, r)
        }
    }
}

fn inside_shrunk(kind: ShapeKind, px: f32, py: f32, w: f32, h: f32, radius: f32, lw: f32) -> bool {
    if 2.0 * lw >= w.min(h) {
        // Outline thicker than the figure: fully filled
        return false;
    }
    match kind {
        ShapeKind::Rectangle => px >= lw && px <= w - lw && py >= lw && py <= h - lw,
        ShapeKind::RoundedRectangle { .. } => {
            inside_rounded(px - lw, py - lw, w - 2.0 * lw, h - 2.0 * lw, (radius - lw).max(0.0))
        }
        ShapeKind::Ellipse => {
            inside_ellipse(px, py, w / 2.0, h / 2.0, w / 2.0 - lw, h / 2.0 - lw)
        }
        ShapeKind::Circle => {
            let r = w.min(h) / 2.0 - lw;
            inside_ellipse(px, py, w / 2.0, h / 2.0, r, r)
        }
    }
}

fn inside_ellipse(px: f32, py: f32, cx: f32, cy: f32, rx: f32, ry: f32) -> bool {
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let dx = (px - cx) / rx;
    let dy = (py - cy) / ry;
    dx * dx + dy * dy <= 1.0
}

fn inside_rounded(px: f32, py: f32, w: f32, h: f32, radius: f32) -> bool {
    if px < 0.0 || px > w || py < 0.0 || py > h {
        return false;
    }
    let r = radius.min(w / 2.0).min(h / 2.0);
    if r <= 0.0 {
        return true;
    }
    // Corner circle centers
    let cx = px.clamp(r, w - r);
    let cy = py.clamp(r, h - r);
    let dx = px - cx;
    let dy = py - cy;
    dx * dx + dy * dy <= r * r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Rotation;

    fn shape(kind: ShapeKind) -> Shape {
        Shape {
            x: 0.0,
            y: 0.0,
            w: 10.0,
            h: 10.0,
            kind,
            line_width: 0.5,
            rotation: Rotation::R0,
            line_style: LineStyle::Solid,
        }
    }

    fn at(el: &ElementRaster, x: usize, y: usize) -> f32 {
        el.intensity[y * el.width + x]
    }

    #[test]
    fn test_solid_line_fills_bar() {
        let line = Line {
            x: 0.0,
            y: 0.0,
            w: 10.0,
            h: 1.0,
            rotation: Rotation::R0,
            line_style: LineStyle::Solid,
        };
        let el = render_line(&line, 8.0);
        assert!(el.intensity.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_dashed_line_has_gaps() {
        let line = Line {
            x: 0.0,
            y: 0.0,
            w: 20.0,
            h: 0.5,
            rotation: Rotation::R0,
            line_style: LineStyle::Dashed { dash: 2.0, gap: 1.0 },
        };
        let el = render_line(&line, 8.0);
        assert!(el.intensity.iter().any(|&v| v == 1.0));
        assert!(el.intensity.iter().any(|&v| v == 0.0));
    }

    #[test]
    fn test_rectangle_outline_hollow_center() {
        let el = render_shape(&shape(ShapeKind::Rectangle), 8.0);
        // Edges inked, center clear
        assert_eq!(at(&el, 0, 0), 1.0);
        assert_eq!(at(&el, el.width - 1, el.height - 1), 1.0);
        assert_eq!(at(&el, el.width / 2, el.height / 2), 0.0);
    }

    #[test]
    fn test_ellipse_outline_corners_clear() {
        let el = render_shape(&shape(ShapeKind::Ellipse), 8.0);
        // Corners are outside the ellipse
        assert_eq!(at(&el, 0, 0), 0.0);
        // Midpoint of the left edge lies on the outline
        assert_eq!(at(&el, 0, el.height / 2), 1.0);
        assert_eq!(at(&el, el.width / 2, el.height / 2), 0.0);
    }

    #[test]
    fn test_rounded_rectangle_corner_clipped() {
        let mut s = shape(ShapeKind::RoundedRectangle { radius: 3.0 });
        s.line_width = 0.5;
        let el = render_shape(&s, 8.0);
        // Sharp corner pixel is outside the rounded figure
        assert_eq!(at(&el, 0, 0), 0.0);
        // Edge midpoints remain on the outline
        assert_eq!(at(&el, el.width / 2, 0), 1.0);
    }

    #[test]
    fn test_circle_in_wide_box_uses_min_axis() {
        let mut s = shape(ShapeKind::Circle);
        s.w = 20.0;
        s.h = 10.0;
        let el = render_shape(&s, 8.0);
        // Leftmost column lies outside the centered circle
        assert!(el.intensity[..el.height]
            .iter()
            .enumerate()
            .all(|(i, _)| at(&el, 0, i) == 0.0));
    }

    #[test]
    fn test_thick_outline_fills_figure() {
        let mut s = shape(ShapeKind::Rectangle);
        s.line_width = 6.0; // twice the half-extent of a 10mm box
        let el = render_shape(&s, 8.0);
        assert_eq!(at(&el, el.width / 2, el.height / 2), 1.0);
    }
}
