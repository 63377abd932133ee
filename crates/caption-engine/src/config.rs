//! Engine Configuration

use std::path::{Path, PathBuf};

use caption_render::{Alignment, PersistPolicy, SchedulerOptions};
use caption_text::{MissingGlyphPolicy, TextColor};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

/// Where the caption font comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSource {
    /// A font file on disk
    Path(PathBuf),
    /// A family name resolved against the system fonts
    Family(String),
}

impl Default for FontSource {
    fn default() -> Self {
        FontSource::Family("sans-serif".to_string())
    }
}

/// Engine configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Caption font
    pub font: FontSource,

    /// Character size in points (one point per pixel)
    pub point_size: u32,

    /// Caption text color
    pub text_color: TextColor,

    /// Placement of the caption on each frame
    pub alignment: Alignment,

    /// Glyph cache file; `None` keeps the cache in memory only
    pub cache_path: Option<PathBuf>,

    /// When the glyph cache is written back
    pub persist: PersistPolicy,

    /// Compositing threads (0 = one per CPU)
    pub workers: usize,

    /// Handling of characters the font cannot draw
    pub missing_glyph: MissingGlyphPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            font: FontSource::default(),
            point_size: 100,
            text_color: TextColor::WHITE,
            alignment: Alignment::Center,
            cache_path: Some(PathBuf::from("font_cache.bin")),
            persist: PersistPolicy::Deferred,
            workers: 0,
            missing_glyph: MissingGlyphPolicy::Fail,
        }
    }
}

impl Config {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!("Loading config from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.point_size == 0 {
            return Err(EngineError::Config("point_size must be positive".into()));
        }
        match &self.font {
            FontSource::Family(name) if name.trim().is_empty() => {
                Err(EngineError::Config("font family is empty".into()))
            }
            FontSource::Path(path) if path.as_os_str().is_empty() => {
                Err(EngineError::Config("font path is empty".into()))
            }
            _ => Ok(()),
        }
    }

    /// The render-level subset of this configuration
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            alignment: self.alignment,
            persist: self.persist,
            workers: self.workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.point_size, 100);
        assert_eq!(config.text_color, TextColor::WHITE);
        assert_eq!(config.persist, PersistPolicy::Deferred);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = Config::from_json_str(r#"{"font": {"path": "fonts/caption.ttf"}, "point_size": 48}"#)
            .unwrap();
        assert_eq!(config.font, FontSource::Path(PathBuf::from("fonts/caption.ttf")));
        assert_eq!(config.point_size, 48);
        assert_eq!(config.alignment, Alignment::Center);
        assert_eq!(config.cache_path, Some(PathBuf::from("font_cache.bin")));
    }

    #[test]
    fn test_full_json() {
        let json = r#"{
            "font": {"family": "DejaVu Sans"},
            "point_size": 64,
            "text_color": {"r": 255, "g": 255, "b": 0},
            "alignment": "left",
            "cache_path": null,
            "persist": "every_render",
            "workers": 3,
            "missing_glyph": {"substitute": "?"}
        }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.font, FontSource::Family("DejaVu Sans".into()));
        assert_eq!(config.text_color, TextColor::YELLOW);
        assert_eq!(config.alignment, Alignment::Left);
        assert_eq!(config.cache_path, None);
        assert_eq!(config.missing_glyph, MissingGlyphPolicy::Substitute('?'));

        let options = config.scheduler_options();
        assert_eq!(options.workers, 3);
        assert_eq!(options.persist, PersistPolicy::EveryRender);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            Config::from_json_str(r#"{"point_size": 0}"#),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            Config::from_json_str(r#"{"font": {"family": "  "}}"#),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(Config::from_json_str("{"), Err(EngineError::Config(_))));
        assert!(matches!(
            Config::from_json_str(r#"{"point_size": -4}"#),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = Config::default();
        config.alignment = Alignment::Origin { x: 12, y: -3 };
        let json = config.to_json_string().unwrap();
        assert_eq!(Config::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("caption-engine-no-such-config.json");
        assert!(matches!(Config::load(&path), Err(EngineError::Io(_))));
    }
}
