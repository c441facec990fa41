//! Barcode validation, encoding and rasterization.
//!
//! 1D symbologies are encoded with the barcoders crate, except UPC-E which
//! barcoders does not cover: its zero-suppressed patterns are generated here
//! from the standard parity tables. 2D codes use the qrcode and pdf417
//! crates. Every symbology gets a content check at draw time so invalid data
//! is rejected before it reaches the canvas.

use barcoders::sym::codabar::Codabar;
use barcoders::sym::code39::Code39;
use barcoders::sym::code93::Code93;
use barcoders::sym::code128::Code128;
use barcoders::sym::ean8::EAN8;
use barcoders::sym::ean13::EAN13;
use barcoders::sym::tf::TF;
use serde::{Deserialize, Serialize};
use spleen_font::{FONT_12X24, PSF2Font};

use crate::canvas::text::{self, Cell};
use crate::canvas::{Barcode1d, Barcode2d, ElementRaster, TextPosition};
use crate::error::CanvasError;
use crate::units;

// ============================================================================
// SYMBOLOGIES
// ============================================================================

/// Linear barcode symbologies and their wire type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology1d {
    Code128,
    UpcA,
    UpcE,
    Ean8,
    Ean13,
    Code93,
    Code39,
    Codabar,
    Itf25,
}

impl Symbology1d {
    pub fn code(self) -> u8 {
        match self {
            Symbology1d::Code128 => 20,
            Symbology1d::UpcA => 21,
            Symbology1d::UpcE => 22,
            Symbology1d::Ean8 => 23,
            Symbology1d::Ean13 => 24,
            Symbology1d::Code93 => 25,
            Symbology1d::Code39 => 26,
            Symbology1d::Codabar => 27,
            Symbology1d::Itf25 => 28,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CanvasError> {
        Ok(match code {
            20 => Symbology1d::Code128,
            21 => Symbology1d::UpcA,
            22 => Symbology1d::UpcE,
            23 => Symbology1d::Ean8,
            24 => Symbology1d::Ean13,
            25 => Symbology1d::Code93,
            26 => Symbology1d::Code39,
            27 => Symbology1d::Codabar,
            28 => Symbology1d::Itf25,
            other => return Err(CanvasError::UnknownTypeCode(other)),
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Symbology1d::Code128 => "CODE128",
            Symbology1d::UpcA => "UPC-A",
            Symbology1d::UpcE => "UPC-E",
            Symbology1d::Ean8 => "EAN-8",
            Symbology1d::Ean13 => "EAN-13",
            Symbology1d::Code93 => "CODE93",
            Symbology1d::Code39 => "CODE39",
            Symbology1d::Codabar => "CODABAR",
            Symbology1d::Itf25 => "ITF-25",
        }
    }
}

/// Matrix barcode symbologies and their wire type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology2d {
    QrCode,
    Pdf417,
    DataMatrix,
    Aztec,
}

impl Symbology2d {
    pub fn code(self) -> u8 {
        match self {
            Symbology2d::QrCode => 31,
            Symbology2d::Pdf417 => 32,
            Symbology2d::DataMatrix => 33,
            Symbology2d::Aztec => 34,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CanvasError> {
        Ok(match code {
            31 => Symbology2d::QrCode,
            32 => Symbology2d::Pdf417,
            33 => Symbology2d::DataMatrix,
            34 => Symbology2d::Aztec,
            other => return Err(CanvasError::UnknownTypeCode(other)),
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Symbology2d::QrCode => "QR",
            Symbology2d::Pdf417 => "PDF417",
            Symbology2d::DataMatrix => "DATA_MATRIX",
            Symbology2d::Aztec => "AZTEC",
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

fn invalid(symbology: &'static str, reason: impl Into<String>) -> CanvasError {
    CanvasError::InvalidContent {
        symbology,
        reason: reason.into(),
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn digits(s: &str) -> Vec<u8> {
    s.bytes().map(|b| b - b'0').collect()
}

/// EAN/UPC modulo-10 check digit: weight 3 on the rightmost data digit,
/// alternating leftward.
fn ean_check(data: &[u8]) -> u8 {
    let sum: u32 = data
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| d as u32 * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Validate content for a linear symbology. Checks character set, length,
/// and (for retail codes supplied with one) the check digit.
pub fn validate_1d(symbology: Symbology1d, content: &str) -> Result<(), CanvasError> {
    let name = symbology.name();
    if content.is_empty() {
        return Err(invalid(name, "content is empty"));
    }
    match symbology {
        Symbology1d::Code128 | Symbology1d::Code93 => {
            if !content.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
                return Err(invalid(name, "content must be printable ASCII"));
            }
        }
        Symbology1d::Code39 => {
            const CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";
            if let Some(bad) = content.chars().find(|c| !CHARSET.contains(*c)) {
                return Err(invalid(name, format!("character {:?} not in CODE39 set", bad)));
            }
        }
        Symbology1d::Codabar => {
            let body = strip_codabar_guards(content).1;
            const CHARSET: &str = "0123456789-$:/.+";
            if body.is_empty() {
                return Err(invalid(name, "content is empty between guards"));
            }
            if let Some(bad) = body.chars().find(|c| !CHARSET.contains(*c)) {
                return Err(invalid(name, format!("character {:?} not in CODABAR set", bad)));
            }
        }
        Symbology1d::Itf25 => {
            if !all_digits(content) {
                return Err(invalid(name, "content must be numeric"));
            }
            if content.len() % 2 != 0 {
                return Err(invalid(name, "interleaved 2 of 5 needs an even digit count"));
            }
        }
        Symbology1d::Ean13 => validate_retail(name, content, 12)?,
        Symbology1d::Ean8 => validate_retail(name, content, 7)?,
        Symbology1d::UpcA => validate_retail(name, content, 11)?,
        Symbology1d::UpcE => {
            upce_normalize(content)?;
        }
    }
    Ok(())
}

/// Retail codes take `data_len` digits, or `data_len + 1` with the check
/// digit included, in which case the check must be correct.
fn validate_retail(name: &'static str, content: &str, data_len: usize) -> Result<(), CanvasError> {
    if !all_digits(content) {
        return Err(invalid(name, "content must be numeric"));
    }
    let d = digits(content);
    if d.len() == data_len {
        Ok(())
    } else if d.len() == data_len + 1 {
        let expected = ean_check(&d[..data_len]);
        if d[data_len] == expected {
            Ok(())
        } else {
            Err(invalid(
                name,
                format!("check digit {} should be {}", d[data_len], expected),
            ))
        }
    } else {
        Err(invalid(
            name,
            format!("expected {} or {} digits, got {}", data_len, data_len + 1, d.len()),
        ))
    }
}

/// Validate content for a matrix symbology by performing the encode.
pub fn validate_2d(symbology: Symbology2d, content: &str) -> Result<(), CanvasError> {
    match symbology {
        Symbology2d::QrCode => {
            qr_matrix(content)?;
            Ok(())
        }
        Symbology2d::Pdf417 => {
            pdf417_matrix(content)?;
            Ok(())
        }
        Symbology2d::DataMatrix | Symbology2d::Aztec => {
            Err(CanvasError::UnsupportedSymbology(symbology.name()))
        }
    }
}

// ============================================================================
// 1D ENCODING
// ============================================================================

/// Encode to modules: true = bar, false = space.
pub fn encode_1d(symbology: Symbology1d, content: &str) -> Result<Vec<bool>, CanvasError> {
    validate_1d(symbology, content)?;
    let name = symbology.name();
    let to_bools = |encoded: Vec<u8>| encoded.into_iter().map(|m| m == 1).collect::<Vec<bool>>();

    Ok(match symbology {
        Symbology1d::Code128 => {
            // barcoders requires a character set prefix; Set B covers the
            // widest range of printable characters.
            let prefixed = format!("\u{0181}{}", content);
            to_bools(
                Code128::new(&prefixed)
                    .map_err(|e| invalid(name, e.to_string()))?
                    .encode(),
            )
        }
        Symbology1d::Code93 => to_bools(
            Code93::new(content)
                .map_err(|e| invalid(name, e.to_string()))?
                .encode(),
        ),
        Symbology1d::Code39 => to_bools(
            Code39::new(content)
                .map_err(|e| invalid(name, e.to_string()))?
                .encode(),
        ),
        Symbology1d::Codabar => {
            let (guarded, body) = strip_codabar_guards(content);
            let full = if guarded {
                content.to_string()
            } else {
                format!("A{}A", body)
            };
            to_bools(
                Codabar::new(&full)
                    .map_err(|e| invalid(name, e.to_string()))?
                    .encode(),
            )
        }
        Symbology1d::Itf25 => to_bools(
            TF::interleaved(content)
                .map_err(|e| invalid(name, e.to_string()))?
                .encode(),
        ),
        Symbology1d::Ean13 => {
            let d = digits(content);
            to_bools(
                EAN13::new(&content[..12.min(d.len())])
                    .map_err(|e| invalid(name, e.to_string()))?
                    .encode(),
            )
        }
        Symbology1d::Ean8 => {
            let d = digits(content);
            to_bools(
                EAN8::new(&content[..7.min(d.len())])
                    .map_err(|e| invalid(name, e.to_string()))?
                    .encode(),
            )
        }
        Symbology1d::UpcA => {
            // UPC-A is EAN-13 with a leading zero
            let d = digits(content);
            let data = format!("0{}", &content[..11.min(d.len())]);
            to_bools(
                EAN13::new(&data)
                    .map_err(|e| invalid(name, e.to_string()))?
                    .encode(),
            )
        }
        Symbology1d::UpcE => encode_upce(content)?,
    })
}

fn strip_codabar_guards(content: &str) -> (bool, &str) {
    let bytes = content.as_bytes();
    let is_guard = |b: u8| (b'A'..=b'D').contains(&b);
    if bytes.len() >= 3 && is_guard(bytes[0]) && is_guard(bytes[bytes.len() - 1]) {
        (true, &content[1..content.len() - 1])
    } else {
        (false, content)
    }
}

// ============================================================================
// UPC-E
// ============================================================================

// EAN/UPC digit patterns, 7 modules each.
const L_PATTERNS: [u8; 10] = [
    0b0001101, 0b0011001, 0b0010011, 0b0111101, 0b0100011, 0b0110001, 0b0101111, 0b0111011,
    0b0110111, 0b0001011,
];
const G_PATTERNS: [u8; 10] = [
    0b0100111, 0b0110011, 0b0011011, 0b0100001, 0b0011101, 0b0111001, 0b0000101, 0b0010001,
    0b0001001, 0b0010111,
];

// Parity selection for number system 0, indexed by check digit.
// true = even parity (G pattern); number system 1 inverts.
const UPCE_PARITY: [[bool; 6]; 10] = [
    [true, true, true, false, false, false],
    [true, true, false, true, false, false],
    [true, true, false, false, true, false],
    [true, true, false, false, false, true],
    [true, false, true, true, false, false],
    [true, false, false, true, true, false],
    [true, false, false, false, true, true],
    [true, false, true, false, true, false],
    [true, false, true, false, false, true],
    [true, false, false, true, false, true],
];

/// Normalize UPC-E content to (number_system, six payload digits).
///
/// Accepts 6 digits (number system 0 assumed), 7 (NS + payload), or
/// 8 (NS + payload + check digit, verified against the UPC-A expansion).
fn upce_normalize(content: &str) -> Result<(u8, [u8; 6]), CanvasError> {
    let name = "UPC-E";
    if !all_digits(content) {
        return Err(invalid(name, "content must be numeric"));
    }
    let d = digits(content);
    let (ns, payload, check) = match d.len() {
        6 => (0u8, &d[..6], None),
        7 => (d[0], &d[1..7], None),
        8 => (d[0], &d[1..7], Some(d[7])),
        n => return Err(invalid(name, format!("expected 6 to 8 digits, got {}", n))),
    };
    if ns > 1 {
        return Err(invalid(name, format!("number system {} must be 0 or 1", ns)));
    }
    let mut six = [0u8; 6];
    six.copy_from_slice(payload);
    let expected = upce_check_digit(ns, &six);
    if let Some(given) = check {
        if given != expected {
            return Err(invalid(
                name,
                format!("check digit {} should be {}", given, expected),
            ));
        }
    }
    Ok((ns, six))
}

/// Expand the zero-suppressed form to UPC-A digits and take its check digit.
fn upce_check_digit(ns: u8, d: &[u8; 6]) -> u8 {
    let expanded: [u8; 11] = match d[5] {
        0..=2 => [ns, d[0], d[1], d[5], 0, 0, 0, 0, d[2], d[3], d[4]],
        3 => [ns, d[0], d[1], d[2], 0, 0, 0, 0, 0, d[3], d[4]],
        4 => [ns, d[0], d[1], d[2], d[3], 0, 0, 0, 0, 0, d[4]],
        _ => [ns, d[0], d[1], d[2], d[3], d[4], 0, 0, 0, 0, d[5]],
    };
    ean_check(&expanded)
}

/// UPC-E modules: start guard, six parity-encoded digits, end guard.
fn encode_upce(content: &str) -> Result<Vec<bool>, CanvasError> {
    let (ns, d) = upce_normalize(content)?;
    let check = upce_check_digit(ns, &d);
    let parity = UPCE_PARITY[check as usize];

    let mut modules = Vec::with_capacity(3 + 6 * 7 + 6);
    modules.extend([true, false, true]); // start guard
    for (i, &digit) in d.iter().enumerate() {
        let even = parity[i] != (ns == 1); // number system 1 inverts parity
        let pattern = if even {
            G_PATTERNS[digit as usize]
        } else {
            L_PATTERNS[digit as usize]
        };
        for bit in (0..7).rev() {
            modules.push((pattern >> bit) & 1 == 1);
        }
    }
    modules.extend([false, true, false, true, false, true]); // end guard
    Ok(modules)
}

// ============================================================================
// 2D ENCODING
// ============================================================================

/// QR module matrix: (modules, side length).
pub fn qr_matrix(content: &str) -> Result<(Vec<bool>, usize), CanvasError> {
    use qrcode::{EcLevel, QrCode};
    if content.is_empty() {
        return Err(invalid("QR", "content is empty"));
    }
    let code = QrCode::with_error_correction_level(content, EcLevel::M)
        .map_err(|e| invalid("QR", e.to_string()))?;
    let size = code.width();
    let mut modules = vec![false; size * size];
    for y in 0..size {
        for x in 0..size {
            modules[y * size + x] = code[(x, y)] == qrcode::Color::Dark;
        }
    }
    Ok((modules, size))
}

/// PDF417 module matrix: (modules, width, height).
pub fn pdf417_matrix(content: &str) -> Result<(Vec<bool>, usize, usize), CanvasError> {
    use pdf417::{END_PATTERN, PDF417, PDF417Encoder, START_PATTERN};

    const COLS: u8 = 4;
    const ROWS: u8 = 10;
    // width = start(17) + left row indicator(17) + data cols + right row
    // indicator(17) + end(18)
    const WIDTH: usize = START_PATTERN.size() as usize
        + 17
        + (COLS as usize * 17)
        + 17
        + END_PATTERN.size() as usize;
    const HEIGHT: usize = ROWS as usize;

    if content.is_empty() {
        return Err(invalid("PDF417", "content is empty"));
    }
    let mut codewords = [0u16; (ROWS * COLS) as usize];
    let (level, filled) = PDF417Encoder::new(&mut codewords, false)
        .append_ascii(content)
        .fit_seal()
        .ok_or_else(|| invalid("PDF417", "content does not fit the symbol"))?;

    let barcode = PDF417::new(filled, ROWS, COLS, level);
    let mut modules = vec![false; WIDTH * HEIGHT];
    for (i, bit) in barcode.bits().enumerate() {
        if i < modules.len() {
            modules[i] = bit;
        }
    }
    Ok((modules, WIDTH, HEIGHT))
}

// ============================================================================
// RASTERIZATION
// ============================================================================

/// Rasterize a 1D barcode with its human-readable band.
pub(crate) fn render_1d(b: &Barcode1d, px_per_mm: f32) -> Result<ElementRaster, CanvasError> {
    let modules = encode_1d(b.symbology, &b.content)?;

    let box_w = units::mm_to_px(b.w, px_per_mm, 1.0).max(1) as usize;
    let box_h = units::mm_to_px(b.h, px_per_mm, 1.0).max(1) as usize;
    let band_h = match b.text_position {
        TextPosition::Hidden => 0,
        _ => (units::mm_to_px(b.text_height, px_per_mm, 1.0).max(0) as usize).min(box_h / 2),
    };
    let bars_h = box_h - band_h;

    let module_px = (box_w / modules.len()).max(1);
    let bars_w = (modules.len() * module_px).min(box_w);
    let x_offset = (box_w - bars_w) / 2;
    let bars_y = match b.text_position {
        TextPosition::Above => band_h,
        _ => 0,
    };

    let mut intensity = vec![0.0f32; box_w * box_h];
    for (i, &dark) in modules.iter().enumerate() {
        if !dark {
            continue;
        }
        let x0 = x_offset + i * module_px;
        for x in x0..(x0 + module_px).min(box_w) {
            for y in bars_y..bars_y + bars_h {
                intensity[y * box_w + x] = 1.0;
            }
        }
    }

    if band_h >= 6 {
        if let Ok(mut font) = PSF2Font::new(FONT_12X24) {
            let cell = Cell::for_height(band_h.saturating_sub(2).max(4));
            let text_w = b.content.chars().count() * cell.width;
            let tx = (box_w as i32 - text_w as i32) / 2;
            let ty = match b.text_position {
                TextPosition::Above => 0,
                _ => bars_h as i32 + 1,
            };
            text::draw_string(
                &mut font,
                &mut intensity,
                box_w,
                box_h,
                tx,
                ty,
                &b.content,
                cell,
                0,
            );
        }
    }

    Ok(ElementRaster {
        x: units::mm_to_px(b.x, px_per_mm, 1.0),
        y: units::mm_to_px(b.y, px_per_mm, 1.0),
        width: box_w,
        height: box_h,
        intensity,
    })
}

/// Rasterize a 2D barcode, scaled to fit and centered in its box.
pub(crate) fn render_2d(b: &Barcode2d, px_per_mm: f32) -> Result<ElementRaster, CanvasError> {
    let box_w = units::mm_to_px(b.w, px_per_mm, 1.0).max(1) as usize;
    let box_h = units::mm_to_px(b.h, px_per_mm, 1.0).max(1) as usize;

    let (modules, mod_w, mod_h) = match b.symbology {
        Symbology2d::QrCode => {
            let (m, size) = qr_matrix(&b.content)?;
            (m, size, size)
        }
        Symbology2d::Pdf417 => pdf417_matrix(&b.content)?,
        Symbology2d::DataMatrix | Symbology2d::Aztec => {
            return Err(CanvasError::UnsupportedSymbology(b.symbology.name()));
        }
    };

    let scale_x = (box_w / mod_w).max(1);
    let scale_y = match b.symbology {
        // PDF417 rows are tall; let them fill the box height
        Symbology2d::Pdf417 => (box_h / mod_h).max(1),
        _ => scale_x.min((box_h / mod_h).max(1)),
    };
    let scale_x = match b.symbology {
        Symbology2d::QrCode => scale_x.min(scale_y),
        _ => scale_x,
    };
    let scale_y = match b.symbology {
        Symbology2d::QrCode => scale_x,
        _ => scale_y,
    };

    let draw_w = (mod_w * scale_x).min(box_w);
    let draw_h = (mod_h * scale_y).min(box_h);
    let x0 = (box_w - draw_w) / 2;
    let y0 = (box_h - draw_h) / 2;

    let mut intensity = vec![0.0f32; box_w * box_h];
    for my in 0..mod_h {
        for mx in 0..mod_w {
            if !modules[my * mod_w + mx] {
                continue;
            }
            for sy in 0..scale_y {
                let py = y0 + my * scale_y + sy;
                if py >= box_h {
                    continue;
                }
                for sx in 0..scale_x {
                    let px = x0 + mx * scale_x + sx;
                    if px < box_w {
                        intensity[py * box_w + px] = 1.0;
                    }
                }
            }
        }
    }

    Ok(ElementRaster {
        x: units::mm_to_px(b.x, px_per_mm, 1.0),
        y: units::mm_to_px(b.y, px_per_mm, 1.0),
        width: box_w,
        height: box_h,
        intensity,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Type Codes ==========

    #[test]
    fn test_type_codes_round_trip() {
        for code in 20..=28 {
            assert_eq!(Symbology1d::from_code(code).unwrap().code(), code);
        }
        for code in 31..=34 {
            assert_eq!(Symbology2d::from_code(code).unwrap().code(), code);
        }
        assert!(matches!(
            Symbology1d::from_code(19),
            Err(CanvasError::UnknownTypeCode(19))
        ));
        assert!(matches!(
            Symbology2d::from_code(35),
            Err(CanvasError::UnknownTypeCode(35))
        ));
    }

    // ========== Validation ==========

    #[test]
    fn test_ean13_check_digit() {
        // 4006381333931 is a valid EAN-13
        assert!(validate_1d(Symbology1d::Ean13, "400638133393").is_ok());
        assert!(validate_1d(Symbology1d::Ean13, "4006381333931").is_ok());
        assert!(validate_1d(Symbology1d::Ean13, "4006381333932").is_err());
        assert!(validate_1d(Symbology1d::Ean13, "40063813339").is_err());
        assert!(validate_1d(Symbology1d::Ean13, "abcdefghijkl").is_err());
    }

    #[test]
    fn test_ean8_lengths() {
        assert!(validate_1d(Symbology1d::Ean8, "9638507").is_ok());
        // 96385074 carries the correct check digit
        assert!(validate_1d(Symbology1d::Ean8, "96385074").is_ok());
        assert!(validate_1d(Symbology1d::Ean8, "96385075").is_err());
    }

    #[test]
    fn test_itf_requires_even_digits() {
        assert!(validate_1d(Symbology1d::Itf25, "1234").is_ok());
        assert!(validate_1d(Symbology1d::Itf25, "123").is_err());
        assert!(validate_1d(Symbology1d::Itf25, "12a4").is_err());
    }

    #[test]
    fn test_code39_charset() {
        assert!(validate_1d(Symbology1d::Code39, "HELLO-123 $").is_ok());
        assert!(validate_1d(Symbology1d::Code39, "hello").is_err());
    }

    #[test]
    fn test_codabar_guards_optional() {
        assert!(validate_1d(Symbology1d::Codabar, "12345").is_ok());
        assert!(validate_1d(Symbology1d::Codabar, "A12:34B").is_ok());
        assert!(validate_1d(Symbology1d::Codabar, "12E45").is_err());
    }

    #[test]
    fn test_code128_printable_ascii_only() {
        assert!(validate_1d(Symbology1d::Code128, "Hello-123!").is_ok());
        assert!(validate_1d(Symbology1d::Code128, "caf\u{e9}").is_err());
        assert!(validate_1d(Symbology1d::Code128, "").is_err());
    }

    // ========== 1D Encoding ==========

    #[test]
    fn test_ean13_is_95_modules() {
        let modules = encode_1d(Symbology1d::Ean13, "400638133393").unwrap();
        assert_eq!(modules.len(), 95);
        assert!(modules.iter().any(|&m| m));
    }

    #[test]
    fn test_upca_encodes_via_ean13() {
        let modules = encode_1d(Symbology1d::UpcA, "03600029145").unwrap();
        assert_eq!(modules.len(), 95);
    }

    #[test]
    fn test_code128_encodes() {
        let modules = encode_1d(Symbology1d::Code128, "Hello").unwrap();
        assert!(!modules.is_empty());
        // Starts with a bar
        assert!(modules[0]);
    }

    // ========== UPC-E ==========

    #[test]
    fn test_upce_check_digit_from_expansion() {
        // 654321 expands (last digit 1) to 06510000432, check digit 7
        assert_eq!(upce_check_digit(0, &[6, 5, 4, 3, 2, 1]), 7);
        assert!(validate_1d(Symbology1d::UpcE, "06543217").is_ok());
        assert!(validate_1d(Symbology1d::UpcE, "06543216").is_err());
    }

    #[test]
    fn test_upce_module_count() {
        // start(3) + 6 digits * 7 + end(6)
        let modules = encode_upce("654321").unwrap();
        assert_eq!(modules.len(), 51);
        assert_eq!(&modules[..3], &[true, false, true]);
        assert_eq!(
            &modules[45..],
            &[false, true, false, true, false, true]
        );
    }

    #[test]
    fn test_upce_number_system_must_be_0_or_1() {
        assert!(upce_normalize("2654321").is_err());
        assert!(upce_normalize("1654321").is_ok());
    }

    #[test]
    fn test_upce_parity_differs_between_number_systems() {
        let ns0 = encode_upce("0654321").unwrap();
        let ns1 = encode_upce("1654321").unwrap();
        assert_ne!(ns0, ns1);
    }

    // ========== 2D ==========

    #[test]
    fn test_qr_matrix_square() {
        let (modules, size) = qr_matrix("https://example.com").unwrap();
        assert_eq!(modules.len(), size * size);
        // Finder pattern corner is dark
        assert!(modules[0]);
    }

    #[test]
    fn test_qr_empty_rejected() {
        assert!(qr_matrix("").is_err());
    }

    #[test]
    fn test_pdf417_capacity_limit() {
        assert!(pdf417_matrix("short payload").is_ok());
        let oversized = "x".repeat(2000);
        assert!(matches!(
            pdf417_matrix(&oversized),
            Err(CanvasError::InvalidContent { .. })
        ));
    }

    #[test]
    fn test_datamatrix_and_aztec_unsupported() {
        for sym in [Symbology2d::DataMatrix, Symbology2d::Aztec] {
            assert!(matches!(
                validate_2d(sym, "data"),
                Err(CanvasError::UnsupportedSymbology(_))
            ));
        }
    }

    // ========== Rasterization ==========

    fn barcode_1d(symbology: Symbology1d, content: &str) -> Barcode1d {
        Barcode1d {
            x: 0.0,
            y: 0.0,
            w: 40.0,
            h: 12.0,
            content: content.to_string(),
            symbology,
            rotation: crate::canvas::Rotation::R0,
            text_height: 3.0,
            text_position: TextPosition::Below,
        }
    }

    #[test]
    fn test_render_1d_fills_box() {
        let el = render_1d(&barcode_1d(Symbology1d::Code128, "ROTULO"), 8.0).unwrap();
        assert_eq!(el.intensity.len(), el.width * el.height);
        assert!(el.intensity.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn test_render_1d_hidden_text_uses_full_height() {
        let mut b = barcode_1d(Symbology1d::Code128, "ROTULO");
        b.text_position = TextPosition::Hidden;
        let el = render_1d(&b, 8.0).unwrap();
        // Bottom row carries bars when no text band is reserved
        let last_row = &el.intensity[(el.height - 1) * el.width..];
        assert!(last_row.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn test_render_2d_qr_centered_square() {
        let b = Barcode2d {
            x: 0.0,
            y: 0.0,
            w: 20.0,
            h: 20.0,
            content: "test".to_string(),
            symbology: Symbology2d::QrCode,
            rotation: crate::canvas::Rotation::R0,
        };
        let el = render_2d(&b, 8.0).unwrap();
        assert!(el.intensity.iter().any(|&v| v > 0.0));
    }
}
