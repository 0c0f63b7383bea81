// Highline Watermark Library
// Tiled text watermarks for applicant uploads (images and PDFs)

pub mod attachments;
pub mod batch;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod watermark;
