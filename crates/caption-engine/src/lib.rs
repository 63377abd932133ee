//! Caption Engine
//!
//! Ties the text and render crates into a captioning run: configuration,
//! word timing to frame ranges, frame I/O, and the pipeline that draws each
//! word onto the frames it is spoken over.
//!
//! # Example
//! ```rust,ignore
//! use caption_engine::{CaptionPipeline, CaptionWord, Config, DirectoryFrameStore};
//!
//! let pipeline = CaptionPipeline::new(Config::load("captions.json")?)?;
//! let mut frames = DirectoryFrameStore::new("frames", "jpeg");
//! let words = vec![CaptionWord::new(0.0, 0.4, "hello")];
//! pipeline.render_captions(&words, 30.0, 900, &mut frames)?;
//! ```

mod config;
mod frames;
pub mod logging;
mod pipeline;
mod timing;

pub use config::{Config, FontSource};
pub use frames::{DirectoryFrameStore, FrameStore, MemoryFrameStore};
pub use pipeline::{CaptionPipeline, RunSummary};
pub use timing::{schedule, CaptionWord, ScheduledWord};

pub use caption_render::{Alignment, PersistPolicy, PixelFormat, TargetImage};
pub use caption_text::{CacheStats, MissingGlyphPolicy, TextColor};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine error types
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Render(#[from] caption_render::RenderError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Frame {index}: {reason}")]
    Frame { index: u32, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<caption_text::TextError> for EngineError {
    fn from(e: caption_text::TextError) -> Self {
        Self::Render(e.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
