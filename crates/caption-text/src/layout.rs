//! Single-line text measurement

use crate::font::{FontFace, GlyphMetrics};
use crate::kerning::KerningResolver;
use crate::Result;

/// Pixel extent of one line of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextLayout {
    /// Sum of advances plus kerning corrections
    pub width: i32,
    /// Running max of `height - bitmap_top`, never below 0
    pub height: i32,
    /// Running max of `-bitmap_top`, never below 0
    pub baseline: i32,
}

/// A glyph with its pen position relative to the start of the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionedGlyph {
    pub codepoint: char,
    /// Pen x after kerning is applied, before this glyph's advance
    pub pen_x: i32,
    pub metrics: GlyphMetrics,
}

/// Measures text with a face and its kerning resolver.
///
/// Single pass, left to right. No line breaking, no bidi.
pub struct TextLayoutEngine<'a> {
    face: &'a dyn FontFace,
    kerning: &'a KerningResolver,
}

impl<'a> TextLayoutEngine<'a> {
    pub fn new(face: &'a dyn FontFace, kerning: &'a KerningResolver) -> Self {
        Self { face, kerning }
    }

    /// Compute `(width, height, baseline)` for `text`
    pub fn measure(&self, text: &str) -> Result<TextLayout> {
        self.layout(text).map(|(layout, _)| layout)
    }

    /// Measure and return every glyph's pen position
    pub fn layout(&self, text: &str) -> Result<(TextLayout, Vec<PositionedGlyph>)> {
        let mut layout = TextLayout::default();
        let mut glyphs = Vec::with_capacity(text.len());
        let mut prev = None;

        for c in text.chars() {
            let metrics = self.face.glyph_metrics(c)?;
            let rows = metrics.height as i32;

            // Tall glyphs make `rows - top` negative; the max absorbs it
            layout.height = layout.height.max(rows - metrics.bitmap_top);
            layout.baseline = layout.baseline.max(-metrics.bitmap_top);

            layout.width += self.kerning.resolve(prev, c).dx;
            glyphs.push(PositionedGlyph {
                codepoint: c,
                pen_x: layout.width,
                metrics,
            });
            layout.width += metrics.advance_x;

            prev = Some(c);
        }

        Ok((layout, glyphs))
    }
}
