//! Text watermark rendering.
//!
//! Renders the watermark text into a single transparent pattern cell that the
//! compositor repeats over the image.
//!
//! # Example
//!
//! ```ignore
//! use highline_watermark::watermark::pattern::{ImageDimensions, ImagePattern};
//! use highline_watermark::watermark::text_renderer::{render_pattern_cell, TextRenderOptions};
//!
//! let pattern = ImagePattern::for_image(ImageDimensions::new(800, 600));
//! let options = TextRenderOptions::watermark(pattern.font_size);
//! let cell = render_pattern_cell(&pattern, &options).unwrap();
//! assert_eq!(cell.dimensions(), pattern.cell_size());
//! ```

use super::pattern::ImagePattern;
use super::WatermarkError;
use crate::constants::{IMAGE_WATERMARK_OPACITY, IMAGE_WATERMARK_RGB, WATERMARK_TEXT};
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::sync::OnceLock;

/// Embedded bold face, parsed on first use.
static WATERMARK_FONT: OnceLock<FontRef<'static>> = OnceLock::new();

/// DejaVu Sans Bold (see fonts/LICENSE-DejaVu.txt).
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans-Bold.ttf");

/// Get the watermark font, parsing it lazily.
fn watermark_font() -> Result<&'static FontRef<'static>, WatermarkError> {
    if let Some(font) = WATERMARK_FONT.get() {
        return Ok(font);
    }

    let font = FontRef::try_from_slice(EMBEDDED_FONT_DATA)
        .map_err(|e| WatermarkError::RenderError(format!("Invalid embedded font: {}", e)))?;

    Ok(WATERMARK_FONT.get_or_init(|| font))
}

/// RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The watermark orange.
    pub fn watermark() -> Self {
        let [r, g, b] = IMAGE_WATERMARK_RGB;
        Self::new(r, g, b)
    }
}

/// Options for text rendering.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    /// The text to render.
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Text color (RGB).
    pub color: Color,
    /// Opacity (0.0 to 1.0).
    pub opacity: f32,
}

impl TextRenderOptions {
    /// The fixed watermark text and color at the given size.
    pub fn watermark(font_size: f32) -> Self {
        Self {
            text: WATERMARK_TEXT.to_string(),
            font_size,
            color: Color::watermark(),
            opacity: IMAGE_WATERMARK_OPACITY,
        }
    }
}

/// Render one pattern cell.
///
/// The cell is transparent except for the text, which starts at
/// `pattern.text_x` with its baseline on `pattern.baseline_y`. Glyphs that
/// overrun the cell are clipped.
pub fn render_pattern_cell(
    pattern: &ImagePattern,
    options: &TextRenderOptions,
) -> Result<RgbaImage, WatermarkError> {
    if options.text.is_empty() {
        return Err(WatermarkError::RenderError(
            "Cannot render empty text".to_string(),
        ));
    }

    let (cell_width, cell_height) = pattern.cell_size();
    if cell_width == 0 || cell_height == 0 {
        return Err(WatermarkError::RenderError(format!(
            "Invalid pattern cell {}x{}",
            cell_width, cell_height
        )));
    }

    let font = watermark_font()?;
    let scale = PxScale::from(options.font_size);
    let scaled_font = font.as_scaled(scale);

    let mut cell = RgbaImage::new(cell_width, cell_height);
    let alpha = options.opacity.clamp(0.0, 1.0) * 255.0;

    let mut cursor_x = pattern.text_x;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in options.text.chars() {
        let glyph_id = scaled_font.glyph_id(c);

        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(
            scale,
            ab_glyph::point(cursor_x, pattern.baseline_y),
        );

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();

            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;

                if x >= 0 && y >= 0 && x < cell_width as i32 && y < cell_height as i32 {
                    let a = (coverage.clamp(0.0, 1.0) * alpha) as u8;

                    // Overlapping glyph edges keep the stronger coverage
                    let existing = cell.get_pixel(x as u32, y as u32)[3];
                    if a > existing {
                        cell.put_pixel(
                            x as u32,
                            y as u32,
                            Rgba([options.color.r, options.color.g, options.color.b, a]),
                        );
                    }
                }
            });
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    Ok(cell)
}
