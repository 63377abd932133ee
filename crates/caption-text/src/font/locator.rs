//! System font lookup (fontdb)

use std::path::Path;

use fontdb::{Database, Family, Query, Stretch, Style, Weight};

use super::TtfFontFace;
use crate::{Result, TextError};

/// Resolves font family names to loaded faces
pub struct FontLocator {
    db: Database,
}

impl std::fmt::Debug for FontLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontLocator")
            .field("faces", &self.db.len())
            .finish()
    }
}

impl FontLocator {
    /// Create an empty locator
    pub fn new() -> Self {
        Self { db: Database::new() }
    }

    /// Create a locator with system fonts loaded
    pub fn with_system_fonts() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        tracing::debug!("Font locator loaded {} system faces", db.len());
        Self { db }
    }

    /// Add a font file to the search set
    pub fn load_font_file(&mut self, path: &Path) -> Result<()> {
        self.db
            .load_font_file(path)
            .map_err(|e| TextError::font_load(path.display().to_string(), e))
    }

    /// Number of known faces
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Check if no faces are known
    pub fn is_empty(&self) -> bool {
        self.db.len() == 0
    }

    /// Load the best regular face for `family` at `point_size`.
    ///
    /// Generic CSS names (`serif`, `sans-serif`, `monospace`, `cursive`,
    /// `fantasy`) map to fontdb's generic families.
    pub fn load(&self, family: &str, point_size: u32) -> Result<TtfFontFace> {
        let families = [generic_family(family)];
        let id = self
            .db
            .query(&Query {
                families: &families,
                weight: Weight::NORMAL,
                stretch: Stretch::Normal,
                style: Style::Normal,
            })
            .ok_or_else(|| TextError::font_load(family, "no matching face"))?;

        self.db
            .with_face_data(id, |data, index| {
                TtfFontFace::from_data(data.to_vec(), index, point_size, family)
            })
            .ok_or_else(|| TextError::font_load(family, "face data unavailable"))?
    }
}

impl Default for FontLocator {
    fn default() -> Self {
        Self::new()
    }
}

fn generic_family(name: &str) -> Family<'_> {
    match name {
        "serif" => Family::Serif,
        "sans-serif" => Family::SansSerif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        other => Family::Name(other),
    }
}
