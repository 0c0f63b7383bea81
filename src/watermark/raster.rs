//! Raster image watermarking.
//!
//! decode → check size → render cell → composite pattern → re-encode in the
//! source container.

use super::compositor::{Compositor, PatternLayer};
use super::encoder::EncoderFactory;
use super::outcome::WatermarkOutcome;
use super::pattern::{ImageDimensions, ImagePattern};
use super::text_renderer::{render_pattern_cell, TextRenderOptions};
use super::WatermarkError;
use bytes::Bytes;
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Stamp an image, falling back to the original bytes on any failure.
pub fn watermark_image(data: Bytes, max_pixels: u64) -> WatermarkOutcome {
    let attempt = try_watermark_image(&data, max_pixels);
    WatermarkOutcome::from_attempt(data, attempt)
}

/// Stamp an image and return the re-encoded bytes.
pub fn try_watermark_image(data: &[u8], max_pixels: u64) -> Result<Vec<u8>, WatermarkError> {
    let (format, dims) = read_header(data)?;
    check_pixel_limit(dims, max_pixels)?;

    let img = decode_image(data, format)?;
    let has_alpha = img.color().has_alpha();
    let mut canvas = img.to_rgba8();

    let pattern = ImagePattern::for_image(ImageDimensions::new(canvas.width(), canvas.height()));
    let cell = render_pattern_cell(&pattern, &TextRenderOptions::watermark(pattern.font_size))?;

    tracing::debug!(
        width = canvas.width(),
        height = canvas.height(),
        format = ?format,
        font_size = pattern.font_size,
        "Compositing image watermark"
    );

    let mut compositor = Compositor::new();
    compositor.add_layer(PatternLayer::new(cell, pattern));
    compositor.apply(&mut canvas);

    let encoder = EncoderFactory::for_format(format)?;
    let keep_alpha = has_alpha && encoder.supports_transparency();
    let encoded = encoder.encode(&canvas, keep_alpha)?;
    Ok(encoded.data)
}

/// Sniff the container and read the declared dimensions without decoding pixels.
fn read_header(data: &[u8]) -> Result<(ImageFormat, ImageDimensions), WatermarkError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| WatermarkError::DecodeError(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| WatermarkError::DecodeError("Unrecognised image format".to_string()))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| WatermarkError::DecodeError(e.to_string()))?;

    Ok((format, ImageDimensions::new(width, height)))
}

/// Reject empty images and decompression bombs before decoding.
fn check_pixel_limit(dims: ImageDimensions, max_pixels: u64) -> Result<(), WatermarkError> {
    if dims.width == 0 || dims.height == 0 {
        return Err(WatermarkError::DecodeError(format!(
            "Image has zero dimension {}x{}",
            dims.width, dims.height
        )));
    }

    if dims.pixels() > max_pixels {
        return Err(WatermarkError::ImageTooLarge {
            width: dims.width,
            height: dims.height,
            limit: max_pixels,
        });
    }

    Ok(())
}

/// Decode image data into a DynamicImage
fn decode_image(data: &[u8], format: ImageFormat) -> Result<DynamicImage, WatermarkError> {
    ImageReader::with_format(Cursor::new(data), format)
        .decode()
        .map_err(|e| WatermarkError::DecodeError(e.to_string()))
}
