// Attachment builder - turns processed uploads into the email attachment set
//
// Staff always receive the untouched original. The stamped copy is added
// next to it only when watermarking succeeded.

use crate::constants::{
    ATTACHMENT_WARN_BYTES, ORIGINAL_ATTACHMENT_PREFIX, WATERMARKED_ATTACHMENT_PREFIX,
};
use crate::error::IntakeError;
use crate::watermark::{ProcessedFile, UploadedFile};
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which document slot an upload was submitted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLabel {
    /// Bank statement, numbered from 1 in submission order
    Statement(usize),
    /// Driver's licence
    DriversLicence,
    /// Void cheque
    VoidCheque,
}

impl fmt::Display for DocumentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentLabel::Statement(n) => write!(f, "Statement{}", n),
            DocumentLabel::DriversLicence => write!(f, "DL"),
            DocumentLabel::VoidCheque => write!(f, "VC"),
        }
    }
}

/// One email attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Bytes,
}

/// Name and size of an attachment, for manifests and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentSummary {
    pub filename: String,
    pub bytes: usize,
}

impl Attachment {
    pub fn summary(&self) -> AttachmentSummary {
        AttachmentSummary {
            filename: self.filename.clone(),
            bytes: self.content.len(),
        }
    }
}

/// Split a filename into base name and extension at the last `.`.
///
/// The extension keeps its dot. A name without a dot is all base.
pub fn split_filename(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) => filename.split_at(idx),
        None => (filename, ""),
    }
}

/// Last path segment of a client-supplied name.
///
/// Both `/` and `\` separate segments. Names that reduce to nothing usable
/// become `upload`.
pub fn client_file_name(filename: &str) -> &str {
    match filename.rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name,
        _ => "upload",
    }
}

/// Insert `-n` before the extension of `filename`.
fn numbered(filename: &str, n: usize) -> String {
    let (base, ext) = split_filename(filename);
    format!("{}-{}{}", base, n, ext)
}

/// Attachments for one upload: the original, then the stamped copy if any.
pub fn attachments_for(
    label: &DocumentLabel,
    original: &UploadedFile,
    processed: &ProcessedFile,
) -> Vec<Attachment> {
    let (base, ext) = split_filename(client_file_name(&original.filename));

    let mut attachments = vec![Attachment {
        filename: format!("{}{}_{}{}", ORIGINAL_ATTACHMENT_PREFIX, label, base, ext),
        content: original.data.clone(),
    }];

    if processed.watermarked {
        attachments.push(Attachment {
            filename: format!("{}{}_{}{}", WATERMARKED_ATTACHMENT_PREFIX, label, base, ext),
            content: processed.data.clone(),
        });
    } else {
        tracing::info!(
            filename = %original.filename,
            label = %label,
            "Watermarking failed, only the original is attached"
        );
    }

    attachments
}

/// Ordered attachments for one submission.
///
/// Names are unique within a set; a repeated name gets a `-2`, `-3`, ...
/// suffix before its extension.
#[derive(Debug, Clone, Default)]
pub struct AttachmentSet {
    attachments: Vec<Attachment>,
    names: HashSet<String>,
}

impl AttachmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the attachments for one processed upload.
    pub fn add(&mut self, label: &DocumentLabel, original: &UploadedFile, processed: &ProcessedFile) {
        for mut attachment in attachments_for(label, original, processed) {
            if self.names.contains(&attachment.filename) {
                let renamed = (2..)
                    .map(|n| numbered(&attachment.filename, n))
                    .find(|name| !self.names.contains(name))
                    .unwrap_or_default();
                tracing::info!(
                    filename = %attachment.filename,
                    renamed = %renamed,
                    "Attachment name already used, renaming"
                );
                attachment.filename = renamed;
            }
            self.names.insert(attachment.filename.clone());
            self.attachments.push(attachment);
        }
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter()
    }

    /// Combined size of every attachment in bytes.
    pub fn total_bytes(&self) -> usize {
        self.attachments.iter().map(|a| a.content.len()).sum()
    }

    /// Whether the set is close to the email provider's size limit.
    pub fn is_oversized(&self) -> bool {
        self.total_bytes() > ATTACHMENT_WARN_BYTES
    }

    /// Log the set and warn when it is close to the provider limit.
    pub fn log_summary(&self) {
        let total = self.total_bytes();
        tracing::info!(
            attachments = self.len(),
            total_bytes = total,
            total_mb = %format!("{:.2}", total as f64 / 1024.0 / 1024.0),
            "Attachment set prepared"
        );

        if self.is_oversized() {
            tracing::warn!(
                total_bytes = total,
                threshold = ATTACHMENT_WARN_BYTES,
                "Attachments are very large and may exceed the email size limit"
            );
        }
    }

    /// Write every attachment into `dir`, creating it if needed.
    ///
    /// Returns the written paths in attachment order.
    pub fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, IntakeError> {
        std::fs::create_dir_all(dir).map_err(|e| IntakeError::write(dir, e))?;

        let mut written = Vec::with_capacity(self.len());
        for attachment in &self.attachments {
            let path = dir.join(&attachment.filename);
            std::fs::write(&path, &attachment.content).map_err(|e| IntakeError::write(&path, e))?;
            tracing::debug!(
                path = %path.display(),
                bytes = attachment.content.len(),
                "Attachment written"
            );
            written.push(path);
        }

        Ok(written)
    }
}
