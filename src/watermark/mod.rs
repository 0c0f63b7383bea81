//! Watermark module for stamping uploaded documents.
//!
//! Applicant uploads (bank statements, driver's licences, void cheques) get a
//! visible, tiled, semi-transparent "HIGHLINE FUNDING" watermark before they
//! are forwarded to staff.
//!
//! # Features
//!
//! - **Images** (`.jpg .jpeg .png .webp .tiff .gif .bmp`): the text is
//!   rendered into a pattern cell, rotated −35° and tiled over the whole
//!   image, then written back in the original container
//! - **PDFs**: every page gets rotated Helvetica-Bold runs over a virtual area
//!   three times the page size; owner-password-only documents are stamped
//!   and stay encrypted
//! - **Graceful degradation**: any failure returns the original bytes with
//!   `watermarked = false`, never an error
//!
//! Classification is by filename extension only, behind [`FileClassifier`].

pub mod classifier;
pub mod compositor;
pub mod encoder;
pub mod error;
pub mod font_metrics;
pub mod outcome;
pub mod pattern;
pub mod pdf;
pub mod pdf_security;
pub mod processor;
pub mod raster;
pub mod text_renderer;

// Re-export main types for convenience
pub use classifier::{classify, ExtensionClassifier, FileClassifier, FileKind};
pub use compositor::{Compositor, PatternLayer};
pub use encoder::{EncodedImage, EncoderFactory, ImageEncoder};
pub use error::WatermarkError;
pub use font_metrics::helvetica_bold_text_width;
pub use outcome::WatermarkOutcome;
pub use pattern::{ImageDimensions, ImagePattern, PageGeometry, PdfTileLayout};
pub use pdf::{try_watermark_pdf, watermark_pdf};
pub use pdf_security::{CryptMethod, DocumentCipher};
pub use processor::{
    process_file_with_watermark, ProcessedFile, UploadedFile, WatermarkProcessor,
    WatermarkSettings,
};
pub use raster::{try_watermark_image, watermark_image};
pub use text_renderer::{render_pattern_cell, Color, TextRenderOptions};
