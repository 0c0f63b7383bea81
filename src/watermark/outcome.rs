//! Result of a watermarking attempt.

use super::WatermarkError;
use bytes::Bytes;

/// What a watermarker hands back.
///
/// `Unchanged` always carries the caller's original bytes, so a failed
/// attempt can be forwarded as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkOutcome {
    /// The document was stamped; these are the new bytes.
    Watermarked(Bytes),
    /// The document was left alone; these are the original bytes.
    Unchanged(Bytes),
}

impl WatermarkOutcome {
    /// Fold a fallible attempt into an outcome, logging the failure.
    ///
    /// Expected failures (protected PDFs) are logged at info, the rest at warn.
    pub fn from_attempt(original: Bytes, attempt: Result<Vec<u8>, WatermarkError>) -> Self {
        match attempt {
            Ok(stamped) => Self::Watermarked(Bytes::from(stamped)),
            Err(e) if e.is_expected() => {
                tracing::info!(error = %e, "Document left unwatermarked");
                Self::Unchanged(original)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Watermarking failed, keeping original");
                Self::Unchanged(original)
            }
        }
    }

    pub fn is_watermarked(&self) -> bool {
        matches!(self, Self::Watermarked(_))
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Watermarked(b) | Self::Unchanged(b) => b,
        }
    }
}
