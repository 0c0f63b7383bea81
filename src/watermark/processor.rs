//! Watermark processor: the entry point for uploaded files.
//!
//! Classifies each upload, routes it to the raster or PDF watermarker and
//! reports the result. Processing never fails: anything that cannot be
//! stamped comes back byte-for-byte unchanged under its original name.
//!
//! # Example
//!
//! ```ignore
//! use highline_watermark::watermark::{process_file_with_watermark, UploadedFile};
//!
//! let upload = UploadedFile::new(bytes, "statement.pdf", "application/pdf");
//! let processed = process_file_with_watermark(&upload);
//! if processed.watermarked {
//!     assert_eq!(processed.filename, "WM_statement.pdf");
//! }
//! ```

use super::classifier::{ExtensionClassifier, FileClassifier, FileKind};
use super::outcome::WatermarkOutcome;
use super::pdf::watermark_pdf;
use super::raster::watermark_image;
use crate::constants::{DEFAULT_MAX_IMAGE_PIXELS, WATERMARKED_FILENAME_PREFIX};
use bytes::Bytes;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A file as received from the applicant.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Raw file contents
    pub data: Bytes,
    /// Client-supplied filename
    pub filename: String,
    /// Client-supplied MIME type (informational only)
    pub content_type: String,
}

impl UploadedFile {
    pub fn new(
        data: impl Into<Bytes>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }
}

/// Result of processing one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFile {
    /// Stamped bytes, or the original bytes when `watermarked` is false
    pub data: Bytes,
    /// `WM_` + original name when stamped, otherwise the original name
    pub filename: String,
    /// Whether a watermark was applied
    pub watermarked: bool,
    /// How the upload was classified
    pub kind: FileKind,
}

/// Tunable limits for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkSettings {
    /// Uploads larger than this are passed through unstamped; `None` accepts any size
    pub max_file_size_bytes: Option<usize>,
    /// Images declaring more pixels than this are passed through unstamped
    pub max_image_pixels: u64,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            max_file_size_bytes: None,
            max_image_pixels: DEFAULT_MAX_IMAGE_PIXELS,
        }
    }
}

/// Routes uploads to the right watermarker.
#[derive(Clone)]
pub struct WatermarkProcessor {
    classifier: Arc<dyn FileClassifier>,
    settings: WatermarkSettings,
}

impl Default for WatermarkProcessor {
    fn default() -> Self {
        Self::new(WatermarkSettings::default())
    }
}

impl std::fmt::Debug for WatermarkProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkProcessor")
            .field("settings", &self.settings)
            .finish()
    }
}

impl WatermarkProcessor {
    /// Create a processor that classifies by filename extension.
    pub fn new(settings: WatermarkSettings) -> Self {
        Self {
            classifier: Arc::new(ExtensionClassifier),
            settings,
        }
    }

    /// Replace the classification strategy.
    pub fn with_classifier(mut self, classifier: impl FileClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Classify a filename with this processor's strategy.
    pub fn classify(&self, filename: &str) -> FileKind {
        self.classifier.classify(filename)
    }

    /// Watermark one upload.
    ///
    /// Always returns; on any failure the original bytes and name come back
    /// with `watermarked = false`.
    pub fn process(&self, file: &UploadedFile) -> ProcessedFile {
        let kind = self.classify(&file.filename);

        tracing::debug!(
            filename = %file.filename,
            size = file.data.len(),
            content_type = %file.content_type,
            kind = %kind,
            "Processing upload"
        );

        let outcome = match (kind, self.settings.max_file_size_bytes) {
            (FileKind::Other, _) => WatermarkOutcome::Unchanged(file.data.clone()),
            (_, Some(limit)) if file.data.len() > limit => {
                tracing::warn!(
                    filename = %file.filename,
                    size = file.data.len(),
                    limit,
                    "Upload exceeds size limit, not watermarking"
                );
                WatermarkOutcome::Unchanged(file.data.clone())
            }
            (FileKind::Image, _) => guarded(&file.filename, &file.data, || {
                watermark_image(file.data.clone(), self.settings.max_image_pixels)
            }),
            (FileKind::Pdf, _) => guarded(&file.filename, &file.data, || {
                watermark_pdf(file.data.clone())
            }),
        };

        let watermarked = outcome.is_watermarked();
        let filename = if watermarked {
            format!("{}{}", WATERMARKED_FILENAME_PREFIX, file.filename)
        } else {
            file.filename.clone()
        };

        tracing::info!(
            filename = %file.filename,
            kind = %kind,
            watermarked,
            "Upload processed"
        );

        ProcessedFile {
            data: outcome.into_bytes(),
            filename,
            watermarked,
            kind,
        }
    }
}

/// Run a watermarker, turning a panic inside the codec into an unchanged result.
fn guarded(
    filename: &str,
    data: &Bytes,
    watermark: impl FnOnce() -> WatermarkOutcome,
) -> WatermarkOutcome {
    match panic::catch_unwind(AssertUnwindSafe(watermark)) {
        Ok(outcome) => outcome,
        Err(cause) => {
            let message = cause
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| cause.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            tracing::warn!(
                filename = %filename,
                panic = %message,
                "Watermarker panicked, keeping original"
            );
            WatermarkOutcome::Unchanged(data.clone())
        }
    }
}

/// Watermark one upload with default settings.
pub fn process_file_with_watermark(file: &UploadedFile) -> ProcessedFile {
    WatermarkProcessor::default().process(file)
}
