//! In-memory font faces built from glyph tables
//!
//! Used where a deterministic face is needed without a font file: tests,
//! benchmarks and demos. Every query is counted so callers can observe how
//! often the caching layers above fall through to the face.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{FontFace, GlyphMetrics, KerningOffset, RasterizedGlyph};
use crate::{Result, TextError};

/// One glyph of a [`SyntheticFace`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticGlyph {
    pub metrics: GlyphMetrics,
    pub coverage: Vec<u8>,
}

impl SyntheticGlyph {
    /// A glyph whose every pixel has the same coverage
    pub fn solid(metrics: GlyphMetrics, alpha: u8) -> Self {
        let len = metrics.width as usize * metrics.height as usize;
        Self {
            metrics,
            coverage: vec![alpha; len],
        }
    }

    /// A glyph with only an advance
    pub fn blank(advance_x: i32) -> Self {
        let blank = RasterizedGlyph::blank(advance_x);
        Self {
            metrics: blank.metrics,
            coverage: blank.coverage,
        }
    }
}

/// Deterministic font face with call counters
#[derive(Debug, Default)]
pub struct SyntheticFace {
    point_size: u32,
    glyphs: HashMap<char, SyntheticGlyph>,
    kerning: HashMap<(char, char), KerningOffset>,
    metrics_calls: AtomicUsize,
    kerning_calls: AtomicUsize,
    rasterize_calls: AtomicUsize,
}

impl SyntheticFace {
    pub fn new(point_size: u32) -> Self {
        Self {
            point_size,
            ..Self::default()
        }
    }

    /// Add or replace a glyph
    pub fn with_glyph(mut self, codepoint: char, glyph: SyntheticGlyph) -> Self {
        self.glyphs.insert(codepoint, glyph);
        self
    }

    /// Add a kerning pair
    pub fn with_kerning(mut self, prev: char, curr: char, offset: KerningOffset) -> Self {
        self.kerning.insert((prev, curr), offset);
        self
    }

    /// Number of `glyph_metrics` queries served
    pub fn metrics_calls(&self) -> usize {
        self.metrics_calls.load(Ordering::SeqCst)
    }

    /// Number of `kerning` queries served
    pub fn kerning_calls(&self) -> usize {
        self.kerning_calls.load(Ordering::SeqCst)
    }

    /// Number of `rasterize` queries served
    pub fn rasterize_calls(&self) -> usize {
        self.rasterize_calls.load(Ordering::SeqCst)
    }

    fn glyph(&self, codepoint: char) -> Result<&SyntheticGlyph> {
        self.glyphs
            .get(&codepoint)
            .ok_or(TextError::GlyphNotFound(codepoint))
    }
}

impl FontFace for SyntheticFace {
    fn point_size(&self) -> u32 {
        self.point_size
    }

    fn glyph_metrics(&self, codepoint: char) -> Result<GlyphMetrics> {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.glyph(codepoint)?.metrics)
    }

    fn kerning(&self, prev: Option<char>, curr: char) -> KerningOffset {
        self.kerning_calls.fetch_add(1, Ordering::SeqCst);
        prev.and_then(|p| self.kerning.get(&(p, curr)).copied())
            .unwrap_or(KerningOffset::ZERO)
    }

    fn rasterize(&self, codepoint: char) -> Result<RasterizedGlyph> {
        self.rasterize_calls.fetch_add(1, Ordering::SeqCst);
        let glyph = self.glyph(codepoint)?;
        Ok(RasterizedGlyph {
            metrics: glyph.metrics,
            coverage: glyph.coverage.clone(),
        })
    }
}
