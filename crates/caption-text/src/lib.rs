//! Caption Text - glyph production for caption overlays
//!
//! This crate turns caption strings into positioned, cached glyph bitmaps:
//! - Font loading at a fixed point size (ttf-parser, fontdb)
//! - Glyph rasterization to coverage masks (tiny-skia)
//! - Memoized pairwise kerning
//! - Single-line text measurement
//! - A glyph cache that persists across runs in a versioned binary file

pub mod cache;
pub mod font;
pub mod glyph;
pub mod kerning;
pub mod layout;

pub use cache::{CacheStats, GlyphCache};
pub use font::{
    F26Dot6, FontFace, FontLocator, GlyphMetrics, KerningOffset, MissingGlyphPolicy,
    RasterizedGlyph, SyntheticFace, SyntheticGlyph, TtfFontFace,
};
pub use glyph::{CacheEntry, GlyphBitmap, GlyphKey, TextColor};
pub use kerning::KerningResolver;
pub use layout::{PositionedGlyph, TextLayout, TextLayoutEngine};

/// Text error types
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("Failed to load font {source_name}: {reason}")]
    FontLoad { source_name: String, reason: String },

    #[error("Glyph not found for {0:?}")]
    GlyphNotFound(char),

    #[error("Rasterization failed for {codepoint:?}: {reason}")]
    Rasterization { codepoint: char, reason: String },

    #[error("Glyph cache I/O failed: {0}")]
    CacheIo(#[from] std::io::Error),
}

impl TextError {
    pub(crate) fn font_load(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::FontLoad {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TextError>;
