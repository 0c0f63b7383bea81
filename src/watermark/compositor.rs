//! Watermark compositor for blending the tiled pattern onto images.
//!
//! The pattern is never materialised at image size. Each target pixel is
//! mapped into cell space through [`ImagePattern::cell_coordinates`] and the
//! cell pixel found there is blended over it with the Porter-Duff "over"
//! operator. Rows are blended in parallel.
//!
//! # Example
//!
//! ```ignore
//! use highline_watermark::watermark::compositor::{Compositor, PatternLayer};
//!
//! let mut compositor = Compositor::new();
//! compositor.add_layer(PatternLayer::new(cell, pattern));
//! compositor.apply(&mut target_image);
//! ```

use super::pattern::ImagePattern;
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// A rotated, infinitely repeating cell to be composited onto an image.
#[derive(Clone)]
pub struct PatternLayer {
    /// One rendered pattern cell (RGBA).
    pub cell: RgbaImage,
    /// Geometry used to map target pixels into the cell.
    pub pattern: ImagePattern,
}

impl PatternLayer {
    pub fn new(cell: RgbaImage, pattern: ImagePattern) -> Self {
        Self { cell, pattern }
    }

    /// Cell pixel covering the target pixel at (x, y).
    fn sample(&self, x: u32, y: u32) -> Rgba<u8> {
        // Sample at the pixel centre
        let (u, v) = self
            .pattern
            .cell_coordinates(x as f32 + 0.5, y as f32 + 0.5);

        let cx = (u as u32).min(self.cell.width().saturating_sub(1));
        let cy = (v as u32).min(self.cell.height().saturating_sub(1));
        *self.cell.get_pixel(cx, cy)
    }
}

impl std::fmt::Debug for PatternLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternLayer")
            .field("cell", &(self.cell.width(), self.cell.height()))
            .field("pattern", &self.pattern)
            .finish()
    }
}

/// Compositor for applying pattern layers to images.
#[derive(Debug, Default)]
pub struct Compositor {
    layers: Vec<PatternLayer>,
}

impl Compositor {
    /// Create a new compositor with no layers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern layer to the compositor.
    pub fn add_layer(&mut self, layer: PatternLayer) {
        self.layers.push(layer);
    }

    /// Apply all layers to the target image.
    ///
    /// Layers are applied in the order they were added.
    pub fn apply(&self, target: &mut RgbaImage) {
        for layer in &self.layers {
            blend_layer(target, layer);
        }
    }
}

/// Blend a pattern layer over every pixel of the target image.
fn blend_layer(target: &mut RgbaImage, layer: &PatternLayer) {
    if layer.cell.width() == 0 || layer.cell.height() == 0 {
        return;
    }

    let row_len = target.width() as usize * 4;
    if row_len == 0 {
        return;
    }

    target
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let fg = layer.sample(x as u32, y as u32);
                if fg[3] == 0 {
                    continue;
                }

                let bg = Rgba([px[0], px[1], px[2], px[3]]);
                let out = blend_pixels(bg, fg);
                px.copy_from_slice(&out.0);
            }
        });
}

/// Blend two pixels using alpha compositing.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>) -> Rgba<u8> {
    let fg_alpha = foreground[3] as f32 / 255.0;
    let bg_alpha = background[3] as f32 / 255.0;

    // Porter-Duff "over" operator
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
