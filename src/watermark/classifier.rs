//! File classification.
//!
//! Decides which watermarking strategy applies to an upload. The default
//! strategy looks only at the filename extension; content is never inspected,
//! so a mislabeled file is routed by its name and degrades gracefully inside
//! the chosen watermarker.

use serde::Serialize;
use std::fmt;

/// Extensions handled by the raster watermarker (lower-case, with the dot).
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".tiff", ".gif", ".bmp"];

/// Extension handled by the PDF watermarker.
pub const PDF_EXTENSION: &str = ".pdf";

/// Kind of document, derived from its filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Pdf,
    Other,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Image => write!(f, "image"),
            FileKind::Pdf => write!(f, "pdf"),
            FileKind::Other => write!(f, "other"),
        }
    }
}

/// Strategy for classifying an upload.
///
/// Implementations must be pure and total: every filename maps to a kind.
pub trait FileClassifier: Send + Sync {
    fn classify(&self, filename: &str) -> FileKind;
}

/// Classifies by the text after the last `.`, ignoring case.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionClassifier;

impl FileClassifier for ExtensionClassifier {
    fn classify(&self, filename: &str) -> FileKind {
        let ext = match extension_of(filename) {
            Some(ext) => ext.to_ascii_lowercase(),
            None => return FileKind::Other,
        };

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            FileKind::Image
        } else if ext == PDF_EXTENSION {
            FileKind::Pdf
        } else {
            FileKind::Other
        }
    }
}

/// Classify a filename with the default [`ExtensionClassifier`].
pub fn classify(filename: &str) -> FileKind {
    ExtensionClassifier.classify(filename)
}

/// Extension including the leading dot, or `None` when the name has no dot.
fn extension_of(filename: &str) -> Option<&str> {
    filename.rfind('.').map(|idx| &filename[idx..])
}
