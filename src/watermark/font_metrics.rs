//! Advance widths of the standard Helvetica-Bold face.
//!
//! Standard 14 fonts are not embedded, so their widths come from the Adobe
//! font metrics. Only the printable ASCII range is covered; the watermark
//! text never leaves it.

/// Widths for characters 32..=126, in 1/1000 em.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for characters outside the table.
const FALLBACK_WIDTH: u16 = 556;

/// Advance width of one character in 1/1000 em.
pub fn helvetica_bold_char_width(c: char) -> u16 {
    match c as u32 {
        code @ 32..=126 => HELVETICA_BOLD_WIDTHS[(code - 32) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Width of `text` set in Helvetica-Bold at `font_size` points, without kerning.
pub fn helvetica_bold_text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| helvetica_bold_char_width(c) as u32).sum();
    units as f32 * font_size / 1000.0
}
