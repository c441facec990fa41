//! Text layout and glyph rasterization.
//!
//! Glyphs come from the Spleen 12x24 bitmap font, scaled with nearest
//! neighbor to the requested size. Layout supports word wrap or clipping,
//! horizontal/vertical alignment, letter and line spacing, and the four
//! style flags (bold, italic, underline, strikethrough).

use spleen_font::{FONT_12X24, PSF2Font};

use crate::canvas::{ElementRaster, HAlign, LineMode, Text, VAlign};
use crate::units;

/// Source glyph dimensions of the Spleen face we scale from.
const SRC_W: usize = 12;
const SRC_H: usize = 24;

/// Glyph cell in pixels, derived from the font size.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cell {
    pub width: usize,
    pub height: usize,
}

impl Cell {
    pub(crate) fn for_height(height_px: usize) -> Self {
        let height = height_px.max(4);
        // Spleen 12x24 is a 1:2 face
        Self {
            width: (height / 2).max(2),
            height,
        }
    }
}

/// One laid-out character cell.
pub(crate) fn glyph_bitmap(font: &mut PSF2Font<'_>, ch: char, cell: Cell) -> Vec<u8> {
    let mut src = vec![0u8; SRC_W * SRC_H];
    let utf8 = ch.to_string();
    match font.glyph_for_utf8(utf8.as_bytes()) {
        Some(rows) => {
            for (y, row) in rows.enumerate() {
                for (x, on) in row.enumerate() {
                    if y < SRC_H && x < SRC_W && on {
                        src[y * SRC_W + x] = 1;
                    }
                }
            }
        }
        None => draw_box(&mut src, SRC_W, SRC_H),
    }

    let mut dst = vec![0u8; cell.width * cell.height];
    scale_bitmap(&src, SRC_W, SRC_H, &mut dst, cell.width, cell.height);
    dst
}

/// Scale a bitmap with nearest neighbor.
fn scale_bitmap(src: &[u8], src_w: usize, src_h: usize, dst: &mut [u8], dst_w: usize, dst_h: usize) {
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx * src_w / dst_w;
            let sy = dy * src_h / dst_h;
            dst[dy * dst_w + dx] = src[sy * src_w + sx];
        }
    }
}

/// Box outline for characters the font does not cover.
fn draw_box(glyph: &mut [u8], width: usize, height: usize) {
    for x in 0..width {
        glyph[x] = 1;
        glyph[(height - 1) * width + x] = 1;
    }
    for y in 0..height {
        glyph[y * width] = 1;
        glyph[y * width + width - 1] = 1;
    }
}

/// Stamp one string onto an intensity buffer at (origin_x, origin_y).
/// Used for barcode human-readable bands as well as text elements.
pub(crate) fn draw_string(
    font: &mut PSF2Font<'_>,
    intensity: &mut [f32],
    buf_w: usize,
    buf_h: usize,
    origin_x: i32,
    origin_y: i32,
    s: &str,
    cell: Cell,
    letter_spacing_px: usize,
) {
    let advance = cell.width + letter_spacing_px;
    for (i, ch) in s.chars().enumerate() {
        let glyph = glyph_bitmap(font, ch, cell);
        let gx = origin_x + (i * advance) as i32;
        for y in 0..cell.height {
            let py = origin_y + y as i32;
            if py < 0 || py as usize >= buf_h {
                continue;
            }
            for x in 0..cell.width {
                if glyph[y * cell.width + x] == 0 {
                    continue;
                }
                let px = gx + x as i32;
                if px < 0 || px as usize >= buf_w {
                    continue;
                }
                intensity[py as usize * buf_w + px as usize] = 1.0;
            }
        }
    }
}

/// Width in pixels of a laid-out string.
fn line_width_px(s: &str, cell: Cell, letter_spacing_px: usize) -> usize {
    let n = s.chars().count();
    if n == 0 {
        0
    } else {
        n * cell.width + (n - 1) * letter_spacing_px
    }
}

/// Break content into display lines for the given box width.
fn layout_lines(content: &str, mode: LineMode, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    for paragraph in content.split('\n') {
        match mode {
            LineMode::Clip => {
                lines.push(paragraph.chars().take(max_chars).collect());
            }
            LineMode::Wrap => {
                let mut current = String::new();
                for word in paragraph.split(' ') {
                    let word_len = word.chars().count();
                    let current_len = current.chars().count();
                    if current.is_empty() {
                        if word_len <= max_chars {
                            current.push_str(word);
                        } else {
                            // Break an oversized word across lines
                            let mut rest: Vec<char> = word.chars().collect();
                            while rest.len() > max_chars {
                                lines.push(rest.drain(..max_chars).collect());
                            }
                            current = rest.into_iter().collect();
                        }
                    } else if current_len + 1 + word_len <= max_chars {
                        current.push(' ');
                        current.push_str(word);
                    } else {
                        lines.push(std::mem::take(&mut current));
                        if word_len <= max_chars {
                            current.push_str(word);
                        } else {
                            let mut rest: Vec<char> = word.chars().collect();
                            while rest.len() > max_chars {
                                lines.push(rest.drain(..max_chars).collect());
                            }
                            current = rest.into_iter().collect();
                        }
                    }
                }
                lines.push(current);
            }
        }
    }
    lines
}

/// Rasterize a text element into its (unrotated) box.
pub(crate) fn render(text: &Text, px_per_mm: f32) -> ElementRaster {
    let box_w = units::mm_to_px(text.w, px_per_mm, 1.0).max(1) as usize;
    let box_h = units::mm_to_px(text.h, px_per_mm, 1.0).max(1) as usize;
    let x_px = units::mm_to_px(text.x, px_per_mm, 1.0);
    let y_px = units::mm_to_px(text.y, px_per_mm, 1.0);

    let cell = Cell::for_height(units::mm_to_px(text.font_size, px_per_mm, 1.0).max(4) as usize);
    let letter_spacing = units::mm_to_px(text.letter_spacing.max(0.0), px_per_mm, 1.0).max(0) as usize;
    let line_spacing = units::mm_to_px(text.line_spacing.max(0.0), px_per_mm, 1.0).max(0) as usize;
    let advance = cell.width + letter_spacing;

    let max_chars = if box_w >= cell.width {
        (box_w - cell.width) / advance + 1
    } else {
        1
    };
    let lines = layout_lines(&text.content, text.line_mode, max_chars);

    let mut intensity = vec![0.0f32; box_w * box_h];
    let mut font = match PSF2Font::new(FONT_12X24) {
        Ok(f) => f,
        Err(_) => {
            // Embedded font data; if it will not parse there is nothing to draw.
            return ElementRaster {
                x: x_px,
                y: y_px,
                width: box_w,
                height: box_h,
                intensity,
            };
        }
    };

    let line_h = cell.height + line_spacing;
    let total_h = if lines.is_empty() {
        0
    } else {
        lines.len() * cell.height + (lines.len() - 1) * line_spacing
    };
    let y0 = match text.v_align {
        VAlign::Top => 0,
        VAlign::Middle => (box_h as i32 - total_h as i32) / 2,
        VAlign::Bottom => box_h as i32 - total_h as i32,
    };

    for (row, line) in lines.iter().enumerate() {
        let width = line_width_px(line, cell, letter_spacing);
        let x0 = match text.h_align {
            HAlign::Left => 0,
            HAlign::Center => (box_w as i32 - width as i32) / 2,
            HAlign::Right => box_w as i32 - width as i32,
        };
        let ly = y0 + (row * line_h) as i32;

        if text.style.italic || text.style.bold {
            draw_styled_line(
                &mut font,
                &mut intensity,
                box_w,
                box_h,
                x0,
                ly,
                line,
                cell,
                letter_spacing,
                text.style.bold,
                text.style.italic,
            );
        } else {
            draw_string(
                &mut font,
                &mut intensity,
                box_w,
                box_h,
                x0,
                ly,
                line,
                cell,
                letter_spacing,
            );
        }

        let rule_thickness = (cell.height / 16).max(1);
        if text.style.underline {
            let top = ly + cell.height as i32 - rule_thickness as i32;
            draw_rule(&mut intensity, box_w, box_h, x0, top, width, rule_thickness);
        }
        if text.style.strikethrough {
            let top = ly + (cell.height / 2) as i32;
            draw_rule(&mut intensity, box_w, box_h, x0, top, width, rule_thickness);
        }
    }

    ElementRaster {
        x: x_px,
        y: y_px,
        width: box_w,
        height: box_h,
        intensity,
    }
}

/// Glyph stamping with bold dilation and italic shear.
fn draw_styled_line(
    font: &mut PSF2Font<'_>,
    intensity: &mut [f32],
    buf_w: usize,
    buf_h: usize,
    origin_x: i32,
    origin_y: i32,
    s: &str,
    cell: Cell,
    letter_spacing_px: usize,
    bold: bool,
    italic: bool,
) {
    let advance = cell.width + letter_spacing_px;
    // Shear the top of the cell right by a quarter of its height
    let max_shear = if italic { (cell.height / 4) as i32 } else { 0 };
    for (i, ch) in s.chars().enumerate() {
        let glyph = glyph_bitmap(font, ch, cell);
        let gx = origin_x + (i * advance) as i32;
        for y in 0..cell.height {
            let py = origin_y + y as i32;
            if py < 0 || py as usize >= buf_h {
                continue;
            }
            let shear = max_shear * (cell.height - 1 - y) as i32 / cell.height.max(1) as i32;
            for x in 0..cell.width {
                if glyph[y * cell.width + x] == 0 {
                    continue;
                }
                let base = gx + x as i32 + shear;
                let reach = if bold { 2 } else { 1 };
                for dx in 0..reach {
                    let px = base + dx;
                    if px >= 0 && (px as usize) < buf_w {
                        intensity[py as usize * buf_w + px as usize] = 1.0;
                    }
                }
            }
        }
    }
}

/// Horizontal rule for underline / strikethrough.
fn draw_rule(
    intensity: &mut [f32],
    buf_w: usize,
    buf_h: usize,
    x: i32,
    y: i32,
    width: usize,
    thickness: usize,
) {
    for dy in 0..thickness {
        let py = y + dy as i32;
        if py < 0 || py as usize >= buf_h {
            continue;
        }
        for dx in 0..width {
            let px = x + dx as i32;
            if px >= 0 && (px as usize) < buf_w {
                intensity[py as usize * buf_w + px as usize] = 1.0;
            }
        }
    }
}
