//! Format-preserving image encoders
//!
//! A stamped image is written back in the container it arrived in, so a
//! `.png` upload stays a PNG and a `.jpg` stays a JPEG. The encoder is picked
//! from the format sniffed off the source bytes, not from the filename.

use super::WatermarkError;
use crate::constants::JPEG_REENCODE_QUALITY;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    /// The encoded image data
    pub data: Vec<u8>,
}

/// Trait for image encoders
///
/// The trait is object-safe so [`EncoderFactory`] can hand out boxed encoders.
pub trait ImageEncoder: Send + Sync {
    /// Encode an RGBA image.
    ///
    /// `keep_alpha` is false when the source had no alpha channel; encoders
    /// then write RGB so the output matches the source layout.
    fn encode(&self, image: &RgbaImage, keep_alpha: bool) -> Result<EncodedImage, WatermarkError>;

    /// Check if this encoder supports transparency
    fn supports_transparency(&self) -> bool;
}

/// JPEG encoder using the image crate
pub struct JpegEncoder {
    /// Quality value (1-100)
    pub quality: u8,
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self {
            quality: JPEG_REENCODE_QUALITY,
        }
    }
}

impl ImageEncoder for JpegEncoder {
    fn encode(&self, image: &RgbaImage, _keep_alpha: bool) -> Result<EncodedImage, WatermarkError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;

        // JPEG has no alpha channel
        let rgb_data = rgba_to_rgb(image.as_raw());

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, self.quality.clamp(1, 100));

        encoder
            .write_image(
                &rgb_data,
                image.width(),
                image.height(),
                image::ColorType::Rgb8,
            )
            .map_err(|e| WatermarkError::EncodeError(format!("jpeg: {}", e)))?;

        Ok(EncodedImage {
            data: output.into_inner(),
        })
    }

    fn supports_transparency(&self) -> bool {
        false
    }
}

/// PNG encoder using the image crate
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn encode(&self, image: &RgbaImage, keep_alpha: bool) -> Result<EncodedImage, WatermarkError> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;
        use image::ImageEncoder as _;

        let mut output = Cursor::new(Vec::new());
        let encoder = ImagePngEncoder::new(&mut output);

        let result = if keep_alpha {
            encoder.write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )
        } else {
            encoder.write_image(
                &rgba_to_rgb(image.as_raw()),
                image.width(),
                image.height(),
                image::ColorType::Rgb8,
            )
        };
        result.map_err(|e| WatermarkError::EncodeError(format!("png: {}", e)))?;

        Ok(EncodedImage {
            data: output.into_inner(),
        })
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// WebP encoder using the image crate
///
/// Note: The `image` crate only supports lossless WebP encoding.
pub struct WebPEncoder;

impl ImageEncoder for WebPEncoder {
    fn encode(&self, image: &RgbaImage, keep_alpha: bool) -> Result<EncodedImage, WatermarkError> {
        use image::codecs::webp::WebPEncoder as ImageWebPEncoder;
        use image::ImageEncoder as _;

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageWebPEncoder::new_lossless(&mut output);

        let result = if keep_alpha {
            encoder.write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )
        } else {
            encoder.write_image(
                &rgba_to_rgb(image.as_raw()),
                image.width(),
                image.height(),
                image::ColorType::Rgb8,
            )
        };
        result.map_err(|e| WatermarkError::EncodeError(format!("webp: {}", e)))?;

        Ok(EncodedImage {
            data: output.into_inner(),
        })
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Encoder for the remaining containers (GIF, TIFF, BMP).
///
/// Goes through `DynamicImage::write_to`; animated GIFs keep only the frame
/// that was decoded.
pub struct ContainerEncoder {
    format: ImageFormat,
}

impl ImageEncoder for ContainerEncoder {
    fn encode(&self, image: &RgbaImage, keep_alpha: bool) -> Result<EncodedImage, WatermarkError> {
        let dynamic = if keep_alpha {
            DynamicImage::ImageRgba8(image.clone())
        } else {
            DynamicImage::ImageRgba8(image.clone()).into_rgb8().into()
        };

        let mut output = Cursor::new(Vec::new());
        dynamic
            .write_to(&mut output, self.format)
            .map_err(|e| WatermarkError::EncodeError(format!("{:?}: {}", self.format, e)))?;

        Ok(EncodedImage {
            data: output.into_inner(),
        })
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Factory for creating encoders based on the source container
pub struct EncoderFactory;

impl EncoderFactory {
    /// Create an encoder that writes the given container format.
    pub fn for_format(format: ImageFormat) -> Result<Box<dyn ImageEncoder>, WatermarkError> {
        match format {
            ImageFormat::Jpeg => Ok(Box::new(JpegEncoder::default())),
            ImageFormat::Png => Ok(Box::new(PngEncoder)),
            ImageFormat::WebP => Ok(Box::new(WebPEncoder)),
            ImageFormat::Gif | ImageFormat::Tiff | ImageFormat::Bmp => {
                Ok(Box::new(ContainerEncoder { format }))
            }
            other => Err(WatermarkError::EncodeError(format!(
                "No encoder for {:?}",
                other
            ))),
        }
    }
}

/// Convert RGBA to RGB by discarding alpha channel
fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let pixel_count = rgba.len() / 4;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&chunk[..3]);
    }

    rgb
}
