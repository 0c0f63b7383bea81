//! Watermark error types.
//!
//! Defines errors that can occur while stamping a document. None of these
//! reach the caller of [`process_file_with_watermark`](super::process_file_with_watermark);
//! the dispatch layer folds every one of them into an unchanged outcome.

use std::fmt;

/// Errors that can occur during watermark processing.
#[derive(Debug)]
pub enum WatermarkError {
    /// Failed to decode the source image or read its dimensions
    DecodeError(String),

    /// Image exceeds the configured pixel limit
    ImageTooLarge { width: u32, height: u32, limit: u64 },

    /// Failed to render the watermark text
    RenderError(String),

    /// Failed to re-encode the stamped image
    EncodeError(String),

    /// PDF could not be parsed
    PdfOpenError(String),

    /// PDF is encrypted and needs a user password to open
    PdfPasswordRequired,

    /// PDF is encrypted with a scheme this engine cannot unlock
    PdfUnsupportedEncryption(String),

    /// PDF page could not be stamped or the document could not be saved
    PdfWriteError(String),
}

impl WatermarkError {
    /// Whether this failure is an expected outcome for real-world uploads.
    ///
    /// Protected or damaged bank statements fail to open routinely, so they
    /// are logged quietly instead of as warnings. An encryption scheme the
    /// engine cannot handle is a gap worth a warning.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::PdfOpenError(_) | Self::PdfPasswordRequired)
    }
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeError(msg) => write!(f, "Failed to decode image: {}", msg),
            Self::ImageTooLarge {
                width,
                height,
                limit,
            } => write!(
                f,
                "Image {}x{} exceeds pixel limit of {}",
                width, height, limit
            ),
            Self::RenderError(msg) => write!(f, "Failed to render watermark text: {}", msg),
            Self::EncodeError(msg) => write!(f, "Failed to encode watermarked image: {}", msg),
            Self::PdfOpenError(msg) => write!(f, "Failed to open PDF: {}", msg),
            Self::PdfPasswordRequired => write!(f, "PDF requires a user password to open"),
            Self::PdfUnsupportedEncryption(msg) => {
                write!(f, "PDF uses unsupported encryption: {}", msg)
            }
            Self::PdfWriteError(msg) => write!(f, "Failed to write watermarked PDF: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}
