// SPDX-License-Identifier: GPL-3.0-only

//! EAN-13 row-scan decoder
//!
//! Locates and reads a single EAN-13 symbol (the carrier symbology for
//! ISBN-13) in a grayscale image by scanning horizontal rows. Each row is
//! binarized, run-length encoded, and searched for the guard-digit-guard
//! structure of the symbol. Parity and checksum must both validate before
//! anything is reported, so partial or ambiguous scans never produce a
//! payload.

use image::GrayImage;

/// Number of bar/space runs in a full symbol:
/// start guard (3) + 6 digits (24) + middle guard (5) + 6 digits (24) + end guard (3)
const SYMBOL_RUNS: usize = 59;

/// Minimum intensity spread within a row before we bother binarizing
const MIN_CONTRAST: u8 = 32;

/// Maximum total module error across the 4 runs of a digit
const MAX_PATTERN_ERROR: f32 = 1.6;

/// Maximum per-run module error for guard patterns
const GUARD_ERROR_PER_RUN: f32 = 0.4;

/// Required quiet zone on either side of the symbol, in modules
const QUIET_ZONE_MODULES: f32 = 3.0;

/// L-code run widths for digits 0-9 (space, bar, space, bar)
///
/// G codes are these reversed; R codes have the same widths starting with
/// a bar, which run-length matching handles for free.
const L_PATTERNS: [[u32; 4]; 10] = [
    [3, 2, 1, 1], // 0
    [2, 2, 2, 1], // 1
    [2, 1, 2, 2], // 2
    [1, 4, 1, 1], // 3
    [1, 1, 3, 2], // 4
    [1, 2, 3, 1], // 5
    [1, 1, 1, 4], // 6
    [1, 3, 1, 2], // 7
    [1, 2, 1, 3], // 8
    [3, 1, 1, 2], // 9
];

/// Left-half parity patterns indexed by the implied first digit
/// (bit 5 = leftmost of the six digits; 0 = L, 1 = G)
const PARITY_PATTERNS: [u8; 10] = [
    0b000000, // 0
    0b001011, // 1
    0b001101, // 2
    0b001110, // 3
    0b010011, // 4
    0b011001, // 5
    0b011100, // 6
    0b010101, // 7
    0b010110, // 8
    0b011010, // 9
];

/// 7-bit L codes, MSB-first (leftmost module in the high bit)
const L_CODES: [u8; 10] = [
    0b0001101, 0b0011001, 0b0010011, 0b0111101, 0b0100011, 0b0110001, 0b0101111, 0b0111011,
    0b0110111, 0b0001011,
];

/// A decoded symbol with its pixel extent in the scanned image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ean13Symbol {
    /// The 13-digit payload
    pub text: String,
    /// Left edge of the symbol (start guard), in pixels
    pub x: u32,
    /// Topmost row that decoded to this payload
    pub y: u32,
    /// Symbol width from start guard to end guard
    pub width: u32,
    /// Vertical extent over which rows agreed on the payload
    pub height: u32,
}

/// One bar or space run within a row
#[derive(Debug, Clone, Copy)]
struct Run {
    start: u32,
    width: u32,
    black: bool,
}

/// A successful single-row decode
struct RowHit {
    digits: [u8; 13],
    x_start: u32,
    x_end: u32,
}

/// Scan an image for an EAN-13 symbol
///
/// Rows are sampled every `row_step` pixels. The first payload found
/// wins; subsequent rows only serve to extend its vertical extent. If a
/// later row decodes a *different* payload the scan stops and keeps the
/// first — ordering among simultaneously visible symbols is unspecified.
pub fn scan_image(image: &GrayImage, row_step: u32) -> Option<Ean13Symbol> {
    let step = row_step.max(1);
    let (width, height) = image.dimensions();
    let raw = image.as_raw();

    let mut found: Option<(String, u32, u32, u32, u32)> = None;

    let mut y = 0;
    while y < height {
        let start = (y * width) as usize;
        let row = &raw[start..start + width as usize];

        match (decode_row(row), &mut found) {
            (Some(hit), None) => {
                let text = digits_to_string(&hit.digits);
                found = Some((text, hit.x_start, hit.x_end, y, y));
            }
            (Some(hit), Some((text, x0, x1, _, y1))) => {
                if digits_to_string(&hit.digits) != *text {
                    break;
                }
                *x0 = (*x0).min(hit.x_start);
                *x1 = (*x1).max(hit.x_end);
                *y1 = y;
            }
            (None, Some(_)) => break, // ran past the bottom edge of the symbol
            (None, None) => {}
        }

        y += step;
    }

    found.map(|(text, x0, x1, y0, y1)| Ean13Symbol {
        text,
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0 + 1,
    })
}

/// Attempt to decode one row of pixels
fn decode_row(row: &[u8]) -> Option<RowHit> {
    let (min, max) = row
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if max.saturating_sub(min) < MIN_CONTRAST {
        return None;
    }
    let threshold = min + (max - min) / 2;

    let runs = run_lengths(row, threshold);
    if runs.len() < SYMBOL_RUNS {
        return None;
    }

    for i in 0..=(runs.len() - SYMBOL_RUNS) {
        if !runs[i].black {
            continue;
        }
        if let Some(hit) = decode_at(row.len() as u32, &runs, i) {
            return Some(hit);
        }
    }
    None
}

/// Run-length encode a thresholded row
fn run_lengths(row: &[u8], threshold: u8) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut start = 0u32;
    let mut black = row[0] <= threshold;

    for (x, &v) in row.iter().enumerate().skip(1) {
        let is_black = v <= threshold;
        if is_black != black {
            runs.push(Run {
                start,
                width: x as u32 - start,
                black,
            });
            start = x as u32;
            black = is_black;
        }
    }
    runs.push(Run {
        start,
        width: row.len() as u32 - start,
        black,
    });
    runs
}

/// Try to read a full symbol starting at run index `i` (a black run)
fn decode_at(row_len: u32, runs: &[Run], i: usize) -> Option<RowHit> {
    let symbol = &runs[i..i + SYMBOL_RUNS];

    // Start guard: bar-space-bar of equal widths
    if guard_error(&symbol[0..3]) > 3.0 * GUARD_ERROR_PER_RUN {
        return None;
    }
    let module = symbol[0..3].iter().map(|r| r.width).sum::<u32>() as f32 / 3.0;
    let quiet = QUIET_ZONE_MODULES * module;

    // Quiet zone before the start guard
    let leading_white = if i > 0 {
        runs[i - 1].width as f32
    } else {
        symbol[0].start as f32
    };
    if leading_white < quiet {
        return None;
    }

    let mut digits = [0u8; 13];
    let mut parity = 0u8;
    let mut pos = 3;

    // Left half: six digits, L or G encoded
    for j in 0..6 {
        let widths = run_widths(&symbol[pos..pos + 4]);
        let (digit, is_g) = match_left_digit(&widths)?;
        digits[1 + j] = digit;
        if is_g {
            parity |= 1 << (5 - j);
        }
        pos += 4;
    }

    // Middle guard: five alternating modules
    if guard_error(&symbol[pos..pos + 5]) > 5.0 * GUARD_ERROR_PER_RUN {
        return None;
    }
    pos += 5;

    // Right half: six R-encoded digits (same run widths as L)
    for j in 0..6 {
        let widths = run_widths(&symbol[pos..pos + 4]);
        let digit = match_right_digit(&widths)?;
        digits[7 + j] = digit;
        pos += 4;
    }

    // End guard
    if guard_error(&symbol[pos..pos + 3]) > 3.0 * GUARD_ERROR_PER_RUN {
        return None;
    }

    // Quiet zone after the end guard
    let end = symbol[SYMBOL_RUNS - 1];
    let x_end = end.start + end.width;
    let trailing_white = if i + SYMBOL_RUNS < runs.len() {
        runs[i + SYMBOL_RUNS].width as f32
    } else {
        (row_len - x_end) as f32
    };
    if trailing_white < quiet {
        return None;
    }

    // The first digit is implied by the left-half parity pattern
    digits[0] = PARITY_PATTERNS.iter().position(|&p| p == parity)? as u8;

    if !checksum_ok(&digits) {
        return None;
    }

    Some(RowHit {
        digits,
        x_start: symbol[0].start,
        x_end,
    })
}

fn run_widths(runs: &[Run]) -> [u32; 4] {
    [runs[0].width, runs[1].width, runs[2].width, runs[3].width]
}

/// Normalized deviation of a guard's runs from equal single-module widths
fn guard_error(runs: &[Run]) -> f32 {
    let total: u32 = runs.iter().map(|r| r.width).sum();
    if total == 0 {
        return f32::MAX;
    }
    let module = total as f32 / runs.len() as f32;
    runs.iter()
        .map(|r| (r.width as f32 / module - 1.0).abs())
        .sum()
}

/// Total module error of 4 run widths against a digit pattern
fn pattern_error(widths: &[u32; 4], pattern: &[u32; 4]) -> f32 {
    let total: u32 = widths.iter().sum();
    if total < 4 {
        return f32::MAX;
    }
    let module = total as f32 / 7.0;
    widths
        .iter()
        .zip(pattern)
        .map(|(&w, &p)| (w as f32 / module - p as f32).abs())
        .sum()
}

/// Match a left-half digit against both L and G (reversed L) patterns
fn match_left_digit(widths: &[u32; 4]) -> Option<(u8, bool)> {
    let mut best: Option<(u8, bool, f32)> = None;

    for (digit, pattern) in L_PATTERNS.iter().enumerate() {
        let err_l = pattern_error(widths, pattern);
        let reversed = [pattern[3], pattern[2], pattern[1], pattern[0]];
        let err_g = pattern_error(widths, &reversed);

        for (err, is_g) in [(err_l, false), (err_g, true)] {
            if err <= MAX_PATTERN_ERROR
                && best.map(|(_, _, b)| err < b).unwrap_or(true)
            {
                best = Some((digit as u8, is_g, err));
            }
        }
    }

    best.map(|(digit, is_g, _)| (digit, is_g))
}

/// Match a right-half digit (R codes share run widths with L codes)
fn match_right_digit(widths: &[u32; 4]) -> Option<u8> {
    let mut best: Option<(u8, f32)> = None;

    for (digit, pattern) in L_PATTERNS.iter().enumerate() {
        let err = pattern_error(widths, pattern);
        if err <= MAX_PATTERN_ERROR && best.map(|(_, b)| err < b).unwrap_or(true) {
            best = Some((digit as u8, err));
        }
    }

    best.map(|(digit, _)| digit)
}

/// Validate the EAN-13 check digit
fn checksum_ok(digits: &[u8; 13]) -> bool {
    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, &d)| d as u32 * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    (10 - sum % 10) % 10 == digits[12] as u32
}

fn digits_to_string(digits: &[u8; 13]) -> String {
    digits.iter().map(|&d| (b'0' + d) as char).collect()
}

/// Render an ideal row of pixels for a 13-digit code
///
/// Produces `quiet_zone_modules` white modules, the 95 symbol modules,
/// and the trailing quiet zone, each module `module_px` pixels wide
/// (black = 0, white = 255). The code's check digit is encoded as given,
/// valid or not, so fixtures for negative tests can be built too.
/// Returns `None` unless `code` is exactly 13 ASCII digits.
pub fn synthesize_row(code: &str, module_px: u32, quiet_zone_modules: u32) -> Option<Vec<u8>> {
    let digits = parse_digits(code)?;
    let modules = encode_modules(&digits);

    let mut row = Vec::new();
    for _ in 0..quiet_zone_modules * module_px {
        row.push(255u8);
    }
    for dark in modules {
        let value = if dark { 0u8 } else { 255u8 };
        for _ in 0..module_px {
            row.push(value);
        }
    }
    for _ in 0..quiet_zone_modules * module_px {
        row.push(255u8);
    }
    Some(row)
}

/// Render a test image: the synthesized row repeated `symbol_rows` times
/// with white margins above and below
pub fn synthesize_image(code: &str, module_px: u32, symbol_rows: u32) -> Option<GrayImage> {
    const MARGIN_ROWS: u32 = 8;

    let row = synthesize_row(code, module_px, 6)?;
    let width = row.len() as u32;
    let height = symbol_rows + 2 * MARGIN_ROWS;

    let mut data = Vec::with_capacity((width * height) as usize);
    for _ in 0..MARGIN_ROWS * width {
        data.push(255u8);
    }
    for _ in 0..symbol_rows {
        data.extend_from_slice(&row);
    }
    for _ in 0..MARGIN_ROWS * width {
        data.push(255u8);
    }

    GrayImage::from_raw(width, height, data)
}

fn parse_digits(code: &str) -> Option<[u8; 13]> {
    let bytes = code.as_bytes();
    if bytes.len() != 13 || !bytes.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut digits = [0u8; 13];
    for (i, &b) in bytes.iter().enumerate() {
        digits[i] = b - b'0';
    }
    Some(digits)
}

/// Expand 13 digits into the symbol's 95 modules (true = dark)
fn encode_modules(digits: &[u8; 13]) -> Vec<bool> {
    let mut modules = Vec::with_capacity(95);
    let push_code = |modules: &mut Vec<bool>, code: u8| {
        for bit in (0..7).rev() {
            modules.push(code >> bit & 1 == 1);
        }
    };

    modules.extend([true, false, true]);

    let parity = PARITY_PATTERNS[digits[0] as usize];
    for j in 0..6 {
        let l = L_CODES[digits[1 + j] as usize];
        let code = if parity >> (5 - j) & 1 == 1 {
            reverse7(!l & 0x7F) // G code
        } else {
            l
        };
        push_code(&mut modules, code);
    }

    modules.extend([false, true, false, true, false]);

    for j in 0..6 {
        let r = !L_CODES[digits[7 + j] as usize] & 0x7F;
        push_code(&mut modules, r);
    }

    modules.extend([true, false, true]);
    modules
}

fn reverse7(code: u8) -> u8 {
    (0..7).fold(0, |acc, i| (acc << 1) | (code >> i & 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_ISBN: &str = "9780306406157";

    #[test]
    fn test_synthesized_row_decodes() {
        let row = synthesize_row(VALID_ISBN, 2, 6).expect("valid code");
        let hit = decode_row(&row).expect("decodes");
        assert_eq!(digits_to_string(&hit.digits), VALID_ISBN);
    }

    #[test]
    fn test_symbol_extent_covers_guards() {
        let row = synthesize_row(VALID_ISBN, 3, 6).expect("valid code");
        let hit = decode_row(&row).expect("decodes");
        // 6 quiet modules of 3px on each side around 95 symbol modules
        assert_eq!(hit.x_start, 18);
        assert_eq!(hit.x_end, 18 + 95 * 3);
    }

    #[test]
    fn test_wide_modules_decode() {
        let row = synthesize_row(VALID_ISBN, 5, 6).expect("valid code");
        let hit = decode_row(&row).expect("decodes");
        assert_eq!(digits_to_string(&hit.digits), VALID_ISBN);
    }

    #[test]
    fn test_bad_check_digit_is_rejected() {
        // Same code with the check digit off by one
        let row = synthesize_row("9780306406158", 2, 6).expect("13 digits");
        assert!(decode_row(&row).is_none());
    }

    #[test]
    fn test_missing_quiet_zone_is_rejected() {
        let row = synthesize_row(VALID_ISBN, 2, 0).expect("valid code");
        assert!(decode_row(&row).is_none());
    }

    #[test]
    fn test_flat_row_yields_nothing() {
        let row = vec![200u8; 400];
        assert!(decode_row(&row).is_none());
    }

    #[test]
    fn test_noise_row_yields_nothing() {
        // Deterministic pseudo-noise; nothing resembling guard structure
        // should survive parity + checksum validation
        let mut state = 0x12345678u32;
        let row: Vec<u8> = (0..600)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                (state >> 24) as u8
            })
            .collect();
        assert!(decode_row(&row).is_none());
    }

    #[test]
    fn test_scan_image_reports_region() {
        let image = synthesize_image(VALID_ISBN, 2, 20).expect("image");
        let symbol = scan_image(&image, 4).expect("found");

        assert_eq!(symbol.text, VALID_ISBN);
        assert_eq!(symbol.x, 12); // 6 quiet modules of 2px
        assert_eq!(symbol.width, 95 * 2);
        assert!(symbol.height >= 12, "height {} too small", symbol.height);
        assert!(symbol.y >= 8 && symbol.y < 8 + 4);
    }

    #[test]
    fn test_scan_image_blank_yields_nothing() {
        let image = GrayImage::from_pixel(320, 240, image::Luma([255]));
        assert!(scan_image(&image, 4).is_none());
    }

    #[test]
    fn test_encode_modules_is_95_wide() {
        let digits = parse_digits(VALID_ISBN).expect("digits");
        assert_eq!(encode_modules(&digits).len(), 95);
    }

    #[test]
    fn test_checksum_examples() {
        assert!(checksum_ok(&parse_digits("9780306406157").unwrap()));
        assert!(checksum_ok(&parse_digits("9787115428028").unwrap()));
        assert!(!checksum_ok(&parse_digits("9780306406156").unwrap()));
    }

    #[test]
    fn test_synthesize_rejects_non_digit_input() {
        assert!(synthesize_row("978030640615x", 2, 6).is_none());
        assert!(synthesize_row("97803", 2, 6).is_none());
    }
}
