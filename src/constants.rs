// Constants module - fixed watermark appearance and configuration defaults
//
// The watermark appearance is deliberately not configurable: every stamped
// document must look the same regardless of deployment. Defaults for the
// tunable parts (limits, logging, output) live here too so config.rs and the
// tests agree on them.

// =============================================================================
// Watermark appearance
// =============================================================================

/// Text stamped onto every document
pub const WATERMARK_TEXT: &str = "HIGHLINE FUNDING";

/// Rotation applied to the tiled pattern, in degrees (negative = clockwise on screen)
pub const WATERMARK_ROTATION_DEGREES: f32 = -35.0;

/// Watermark colour for raster images (#FF8C42)
pub const IMAGE_WATERMARK_RGB: [u8; 3] = [255, 140, 66];

/// Opacity of the raster text fill
pub const IMAGE_WATERMARK_OPACITY: f32 = 0.35;

/// Watermark colour for PDF pages, as PDF DeviceRGB components
pub const PDF_WATERMARK_RGB: [f32; 3] = [1.0, 0.55, 0.26];

/// Opacity of every PDF tile
pub const PDF_WATERMARK_OPACITY: f32 = 0.20;

// =============================================================================
// Image pattern geometry
// =============================================================================

/// Font size is min(width, height) divided by this
pub const IMAGE_FONT_DIVISOR: f32 = 12.0;

/// Smallest font size used on raster images
pub const IMAGE_MIN_FONT_SIZE: f32 = 30.0;

/// Pattern cell width as a multiple of the font size
pub const IMAGE_CELL_WIDTH_FACTOR: f32 = 14.0;

/// Pattern cell height as a multiple of the font size
pub const IMAGE_CELL_HEIGHT_FACTOR: f32 = 5.0;

/// Horizontal offset of the text inside a pattern cell, in pixels
pub const IMAGE_TEXT_OFFSET_X: f32 = 10.0;

/// Baseline of the text inside a pattern cell, as a multiple of the font size
pub const IMAGE_BASELINE_FACTOR: f32 = 1.2;

/// JPEG quality used when re-encoding stamped photos
pub const JPEG_REENCODE_QUALITY: u8 = 85;

// =============================================================================
// PDF tiling geometry
// =============================================================================

/// Font size is min(width, height) divided by this
pub const PDF_FONT_DIVISOR: f32 = 18.0;

/// Smallest font size used on PDF pages, in points
pub const PDF_MIN_FONT_SIZE: f32 = 24.0;

/// Horizontal tile step as a multiple of the rendered text width
pub const PDF_HORIZONTAL_STEP_FACTOR: f32 = 1.8;

/// Vertical tile step as a fraction of the horizontal step
pub const PDF_VERTICAL_STEP_FACTOR: f32 = 0.5;

/// Standard 14 font used for PDF tiles
pub const PDF_BASE_FONT: &str = "Helvetica-Bold";

// =============================================================================
// Output naming
// =============================================================================

/// Prefix added to a successfully watermarked file
pub const WATERMARKED_FILENAME_PREFIX: &str = "WM_";

/// Prefix of the untouched attachment copy
pub const ORIGINAL_ATTACHMENT_PREFIX: &str = "ORIGINAL_";

/// Prefix of the stamped attachment copy
pub const WATERMARKED_ATTACHMENT_PREFIX: &str = "WATERMARKED_";

/// Attachment sets above this size get a warning (provider limit is 40 MiB)
pub const ATTACHMENT_WARN_BYTES: usize = 35 * 1024 * 1024;

// =============================================================================
// Limits defaults
// =============================================================================

/// Default maximum decoded image size (100 megapixels)
pub const DEFAULT_MAX_IMAGE_PIXELS: u64 = 100_000_000;

// =============================================================================
// Processing defaults
// =============================================================================

/// Default worker count when parallel processing is enabled
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default directory the CLI writes attachments to
pub const DEFAULT_OUTPUT_DIR: &str = "watermarked";

/// Default tracing filter when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "highline_watermark=info";
