//! Font faces at a fixed point size

mod fixed_point;
mod locator;
mod synthetic;
mod ttf;

pub use fixed_point::F26Dot6;
pub use locator::FontLocator;
pub use synthetic::{SyntheticFace, SyntheticGlyph};
pub use ttf::{MissingGlyphPolicy, TtfFontFace};

use crate::Result;

/// Per-glyph placement metrics in whole pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphMetrics {
    /// Horizontal pen advance
    pub advance_x: i32,
    /// Distance from the pen position to the bitmap's left edge
    pub bitmap_left: i32,
    /// Distance from the baseline up to the bitmap's top row
    pub bitmap_top: i32,
    /// Bitmap width
    pub width: u32,
    /// Bitmap rows
    pub height: u32,
}

/// Pairwise kerning adjustment in whole pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KerningOffset {
    pub dx: i32,
    pub dy: i32,
}

impl KerningOffset {
    pub const ZERO: KerningOffset = KerningOffset { dx: 0, dy: 0 };

    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// A rasterized glyph: metrics plus an 8-bit coverage mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterizedGlyph {
    pub metrics: GlyphMetrics,
    /// `width * height` coverage values, row-major
    pub coverage: Vec<u8>,
}

impl RasterizedGlyph {
    /// A glyph with an advance but no visible pixels (e.g. space)
    pub fn blank(advance_x: i32) -> Self {
        Self {
            metrics: GlyphMetrics {
                advance_x,
                ..GlyphMetrics::default()
            },
            coverage: Vec::new(),
        }
    }
}

/// A font loaded at one fixed point size.
///
/// Implementations must be shareable between the layout pass and the
/// compositing workers, hence `Send + Sync`.
pub trait FontFace: Send + Sync {
    /// Point size every metric is produced at
    fn point_size(&self) -> u32;

    /// Metrics for one codepoint
    fn glyph_metrics(&self, codepoint: char) -> Result<GlyphMetrics>;

    /// Kerning between an adjacent pair.
    ///
    /// Returns [`KerningOffset::ZERO`] when there is no previous character or
    /// the font carries no kerning data.
    fn kerning(&self, prev: Option<char>, curr: char) -> KerningOffset;

    /// Rasterize one codepoint into a coverage mask
    fn rasterize(&self, codepoint: char) -> Result<RasterizedGlyph>;
}
