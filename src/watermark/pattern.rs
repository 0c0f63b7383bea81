//! Pattern geometry for the tiled watermark.
//!
//! Both watermarkers tile the same rotated text, but they lay it out
//! differently:
//!
//! - **Images** render the text once into a rectangular cell and repeat that
//!   cell over an infinite plane rotated by the pattern angle. Every canvas
//!   pixel is mapped back into cell space with [`ImagePattern::cell_coordinates`].
//! - **PDF pages** draw the text as individual rotated runs whose origins form
//!   a grid over a virtual area three times the page size in each direction,
//!   see [`PdfTileLayout::tile_origins`].
//!
//! Everything here is pure arithmetic so it can be tested without decoding or
//! rendering anything.

use crate::constants::{
    IMAGE_BASELINE_FACTOR, IMAGE_CELL_HEIGHT_FACTOR, IMAGE_CELL_WIDTH_FACTOR, IMAGE_FONT_DIVISOR,
    IMAGE_MIN_FONT_SIZE, IMAGE_TEXT_OFFSET_X, PDF_FONT_DIVISOR, PDF_HORIZONTAL_STEP_FACTOR,
    PDF_MIN_FONT_SIZE, PDF_VERTICAL_STEP_FACTOR, WATERMARK_ROTATION_DEGREES,
};

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count.
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Layout of the repeating cell used on raster images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePattern {
    /// Font size in pixels
    pub font_size: f32,
    /// Cell width in pixels
    pub cell_width: f32,
    /// Cell height in pixels
    pub cell_height: f32,
    /// Left edge of the text inside the cell
    pub text_x: f32,
    /// Baseline of the text inside the cell
    pub baseline_y: f32,
    cos: f32,
    sin: f32,
}

impl ImagePattern {
    /// Build the pattern for an image of the given size.
    ///
    /// `font_size = max(min(width, height) / 12, 30)`; the cell is
    /// `14 × font_size` wide and `5 × font_size` tall.
    pub fn for_image(dims: ImageDimensions) -> Self {
        let shorter = dims.width.min(dims.height) as f32;
        let font_size = (shorter / IMAGE_FONT_DIVISOR).max(IMAGE_MIN_FONT_SIZE);

        // Cell space is the canvas rotated by the opposite of the pattern angle
        let theta = (-WATERMARK_ROTATION_DEGREES).to_radians();

        Self {
            font_size,
            cell_width: font_size * IMAGE_CELL_WIDTH_FACTOR,
            cell_height: font_size * IMAGE_CELL_HEIGHT_FACTOR,
            text_x: IMAGE_TEXT_OFFSET_X,
            baseline_y: font_size * IMAGE_BASELINE_FACTOR,
            cos: theta.cos(),
            sin: theta.sin(),
        }
    }

    /// Cell size rounded up to whole pixels.
    pub fn cell_size(&self) -> (u32, u32) {
        (
            self.cell_width.ceil() as u32,
            self.cell_height.ceil() as u32,
        )
    }

    /// Map a canvas point into cell coordinates.
    ///
    /// The result always lies in `[0, cell_width) × [0, cell_height)`.
    pub fn cell_coordinates(&self, x: f32, y: f32) -> (f32, f32) {
        let qx = x * self.cos - y * self.sin;
        let qy = x * self.sin + y * self.cos;

        let u = qx.rem_euclid(self.cell_width);
        let v = qy.rem_euclid(self.cell_height);

        // rem_euclid can round up to the modulus itself for tiny negatives
        (
            if u >= self.cell_width { 0.0 } else { u },
            if v >= self.cell_height { 0.0 } else { v },
        )
    }
}

/// Size of a PDF page in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Tile layout for one PDF page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfTileLayout {
    /// Font size in points
    pub font_size: f32,
    /// Horizontal distance between tile origins
    pub step_x: f32,
    /// Vertical distance between tile rows
    pub step_y: f32,
    page: PageGeometry,
}

impl PdfTileLayout {
    /// Build the layout for a page.
    ///
    /// `text_width` measures the watermark text at a given font size.
    pub fn for_page<F>(page: PageGeometry, text_width: F) -> Self
    where
        F: Fn(f32) -> f32,
    {
        let shorter = page.width.min(page.height);
        let font_size = (shorter / PDF_FONT_DIVISOR).max(PDF_MIN_FONT_SIZE);
        let step_x = text_width(font_size) * PDF_HORIZONTAL_STEP_FACTOR;

        Self {
            font_size,
            step_x,
            step_y: step_x * PDF_VERTICAL_STEP_FACTOR,
            page,
        }
    }

    /// Origins of every tile, row by row from the bottom of the virtual area.
    ///
    /// Rows run over `[-height, 2·height)` and columns over
    /// `[-width, 2·width)`. Returns nothing when the step is not positive.
    pub fn tile_origins(&self) -> Vec<(f32, f32)> {
        if !(self.step_x > 0.0 && self.step_y > 0.0) {
            return Vec::new();
        }

        let w = self.page.width;
        let h = self.page.height;
        let mut origins = Vec::new();

        // Positions are computed from an index so long rows do not drift
        let mut row = 0u32;
        loop {
            let y = -h + row as f32 * self.step_y;
            if y >= 2.0 * h {
                break;
            }

            let mut col = 0u32;
            loop {
                let x = -w + col as f32 * self.step_x;
                if x >= 2.0 * w {
                    break;
                }
                origins.push((x, y));
                col += 1;
            }

            row += 1;
        }

        origins
    }
}
