//! Cached glyph bitmaps and their keys

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::font::RasterizedGlyph;

/// Cache key: one codepoint at one point size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphKey {
    pub codepoint: char,
    pub point_size: u32,
}

impl GlyphKey {
    pub fn new(codepoint: char, point_size: u32) -> Self {
        Self {
            codepoint,
            point_size,
        }
    }
}

/// Caption text color (opaque RGB; coverage supplies alpha)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TextColor {
    pub const WHITE: TextColor = TextColor { r: 255, g: 255, b: 255 };
    pub const BLACK: TextColor = TextColor { r: 0, g: 0, b: 0 };
    pub const YELLOW: TextColor = TextColor { r: 255, g: 255, b: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::WHITE
    }
}

/// RGBA glyph image: color in channels 0-2, coverage in channel 3.
///
/// Fields are private so a bitmap can't change after it is built; the
/// compositing workers read it concurrently through an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphBitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl GlyphBitmap {
    /// Colorize a coverage mask
    pub fn from_coverage(width: u32, height: u32, coverage: &[u8], color: TextColor) -> Self {
        let len = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(len * 4);
        for &alpha in coverage.iter().take(len) {
            pixels.extend_from_slice(&[color.r, color.g, color.b, alpha]);
        }
        // Short coverage leaves the remainder transparent
        pixels.resize(len * 4, 0);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Wrap an existing RGBA buffer; `None` if the length does not match
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// No visible pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGBA of one pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        let px = self.pixels.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// A cached glyph with its placement offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub bitmap: Arc<GlyphBitmap>,
    /// Horizontal offset from the pen position
    pub left: i32,
    /// Rows above the baseline
    pub top: i32,
}

impl CacheEntry {
    pub fn new(bitmap: GlyphBitmap, left: i32, top: i32) -> Self {
        Self {
            bitmap: Arc::new(bitmap),
            left,
            top,
        }
    }

    /// Build an entry from rasterizer output
    pub fn from_rasterized(glyph: &RasterizedGlyph, color: TextColor) -> Self {
        let m = glyph.metrics;
        Self::new(
            GlyphBitmap::from_coverage(m.width, m.height, &glyph.coverage, color),
            m.bitmap_left,
            m.bitmap_top,
        )
    }
}
