//! TrueType/OpenType faces rasterized with tiny-skia

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use super::{F26Dot6, FontFace, GlyphMetrics, KerningOffset, RasterizedGlyph};
use crate::{Result, TextError};

/// What to draw when the font has no mapping for a codepoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingGlyphPolicy {
    /// Fail with [`TextError::GlyphNotFound`]
    #[default]
    Fail,
    /// Draw the font's `.notdef` glyph (glyph id 0)
    NotDef,
    /// Draw another character's glyph instead
    Substitute(char),
}

/// A font file parsed with ttf-parser at a fixed pixel size.
///
/// One point maps to one pixel (72 dpi). The font bytes are owned; the
/// ttf-parser face is re-parsed per query, which only walks the table
/// directory.
pub struct TtfFontFace {
    data: Vec<u8>,
    face_index: u32,
    point_size: u32,
    units_per_em: u16,
    missing_glyph: MissingGlyphPolicy,
    source_name: String,
}

impl fmt::Debug for TtfFontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtfFontFace")
            .field("source", &self.source_name)
            .field("face_index", &self.face_index)
            .field("point_size", &self.point_size)
            .field("units_per_em", &self.units_per_em)
            .field("missing_glyph", &self.missing_glyph)
            .finish()
    }
}

impl TtfFontFace {
    /// Load the first face of a font file
    pub fn load(path: impl AsRef<Path>, point_size: u32) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| TextError::font_load(path.display().to_string(), e))?;
        Self::from_data(data, 0, point_size, path.display().to_string())
    }

    /// Parse a face from font bytes already in memory
    pub fn from_data(
        data: Vec<u8>,
        face_index: u32,
        point_size: u32,
        source_name: impl Into<String>,
    ) -> Result<Self> {
        let source_name = source_name.into();
        if point_size == 0 {
            return Err(TextError::font_load(source_name, "point size must be positive"));
        }

        let units_per_em = Face::parse(&data, face_index)
            .map_err(|e| TextError::font_load(source_name.clone(), e))?
            .units_per_em();

        tracing::debug!(
            "Loaded font {} (face {}, {} upem) at {}pt",
            source_name,
            face_index,
            units_per_em,
            point_size
        );

        Ok(Self {
            data,
            face_index,
            point_size,
            units_per_em,
            missing_glyph: MissingGlyphPolicy::default(),
            source_name,
        })
    }

    /// Set the policy for codepoints the font has no glyph for
    pub fn with_missing_glyph_policy(mut self, policy: MissingGlyphPolicy) -> Self {
        self.missing_glyph = policy;
        self
    }

    /// Current missing-glyph policy
    pub fn missing_glyph_policy(&self) -> MissingGlyphPolicy {
        self.missing_glyph
    }

    /// Units per em of the parsed face
    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn face(&self) -> Result<Face<'_>> {
        Face::parse(&self.data, self.face_index)
            .map_err(|e| TextError::font_load(self.source_name.clone(), e))
    }

    fn scale(&self, units: i32) -> F26Dot6 {
        F26Dot6::from_font_units(units, self.point_size, self.units_per_em)
    }

    fn resolve_glyph(&self, face: &Face<'_>, codepoint: char) -> Result<GlyphId> {
        if let Some(glyph) = face.glyph_index(codepoint) {
            return Ok(glyph);
        }
        match self.missing_glyph {
            MissingGlyphPolicy::Fail => Err(TextError::GlyphNotFound(codepoint)),
            MissingGlyphPolicy::NotDef => Ok(GlyphId(0)),
            MissingGlyphPolicy::Substitute(fallback) => face
                .glyph_index(fallback)
                .ok_or(TextError::GlyphNotFound(codepoint)),
        }
    }

    fn metrics_for(&self, face: &Face<'_>, glyph: GlyphId) -> GlyphMetrics {
        let advance = face.glyph_hor_advance(glyph).unwrap_or(0);
        let advance_x = self.scale(i32::from(advance)).floor_px();

        let Some(bbox) = face.glyph_bounding_box(glyph) else {
            return GlyphMetrics {
                advance_x,
                ..GlyphMetrics::default()
            };
        };

        let left = self.scale(i32::from(bbox.x_min)).floor_px();
        let right = self.scale(i32::from(bbox.x_max)).ceil_px();
        let top = self.scale(i32::from(bbox.y_max)).ceil_px();
        let bottom = self.scale(i32::from(bbox.y_min)).floor_px();

        GlyphMetrics {
            advance_x,
            bitmap_left: left,
            bitmap_top: top,
            width: (right - left).max(0) as u32,
            height: (top - bottom).max(0) as u32,
        }
    }
}

impl FontFace for TtfFontFace {
    fn point_size(&self) -> u32 {
        self.point_size
    }

    fn glyph_metrics(&self, codepoint: char) -> Result<GlyphMetrics> {
        let face = self.face()?;
        let glyph = self.resolve_glyph(&face, codepoint)?;
        Ok(self.metrics_for(&face, glyph))
    }

    fn kerning(&self, prev: Option<char>, curr: char) -> KerningOffset {
        let Some(prev) = prev else {
            return KerningOffset::ZERO;
        };
        let Ok(face) = self.face() else {
            return KerningOffset::ZERO;
        };
        let (Some(left), Some(right)) = (face.glyph_index(prev), face.glyph_index(curr)) else {
            return KerningOffset::ZERO;
        };
        let Some(kern) = face.tables().kern else {
            return KerningOffset::ZERO;
        };

        let units = kern
            .subtables
            .into_iter()
            .filter(|st| st.horizontal && !st.variable && !st.has_cross_stream)
            .find_map(|st| st.glyphs_kerning(left, right))
            .map_or(0, i32::from);

        KerningOffset::new(self.scale(units).floor_px(), 0)
    }

    fn rasterize(&self, codepoint: char) -> Result<RasterizedGlyph> {
        let face = self.face()?;
        let glyph = self.resolve_glyph(&face, codepoint)?;
        let metrics = self.metrics_for(&face, glyph);

        if metrics.width == 0 || metrics.height == 0 {
            return Ok(RasterizedGlyph::blank(metrics.advance_x));
        }

        let scale = self.point_size as f32 / f32::from(self.units_per_em);
        let mut builder = PathBuilder::new(
            scale,
            metrics.bitmap_left as f32,
            metrics.bitmap_top as f32,
        );
        if face.outline_glyph(glyph, &mut builder).is_none() {
            // Bitmap-only or empty glyph
            return Ok(RasterizedGlyph::blank(metrics.advance_x));
        }
        let Some(path) = builder.finish() else {
            return Ok(RasterizedGlyph::blank(metrics.advance_x));
        };

        let mut pixmap = tiny_skia::Pixmap::new(metrics.width, metrics.height).ok_or_else(|| {
            TextError::Rasterization {
                codepoint,
                reason: format!("invalid pixmap size {}x{}", metrics.width, metrics.height),
            }
        })?;

        let mut paint = tiny_skia::Paint::default();
        paint.set_color(tiny_skia::Color::WHITE);
        paint.anti_alias = true;

        pixmap.fill_path(
            &path,
            &paint,
            tiny_skia::FillRule::Winding,
            tiny_skia::Transform::identity(),
            None,
        );

        let coverage = pixmap.pixels().iter().map(|p| p.alpha()).collect();

        Ok(RasterizedGlyph { metrics, coverage })
    }
}

/// Converts ttf-parser outlines into a tiny-skia path in bitmap space
struct PathBuilder {
    builder: tiny_skia::PathBuilder,
    scale: f32,
    left: f32,
    top: f32,
}

impl PathBuilder {
    fn new(scale: f32, left: f32, top: f32) -> Self {
        Self {
            builder: tiny_skia::PathBuilder::new(),
            scale,
            left,
            top,
        }
    }

    fn transform_x(&self, x: f32) -> f32 {
        x * self.scale - self.left
    }

    fn transform_y(&self, y: f32) -> f32 {
        self.top - y * self.scale // Flip Y axis
    }

    fn finish(self) -> Option<tiny_skia::Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for PathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(self.transform_x(x), self.transform_y(y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(self.transform_x(x), self.transform_y(y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quad_to(
            self.transform_x(x1),
            self.transform_y(y1),
            self.transform_x(x),
            self.transform_y(y),
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(
            self.transform_x(x1),
            self.transform_y(y1),
            self.transform_x(x2),
            self.transform_y(y2),
            self.transform_x(x),
            self.transform_y(y),
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
