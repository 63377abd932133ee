//! Caption Render - glyph compositing
//!
//! Blends cached glyph bitmaps onto caller-owned frame buffers. Layout is
//! computed sequentially; the per-glyph blends fan out over a worker pool
//! and are joined before `render` returns.

mod compositor;
mod image;
mod pool;
mod scheduler;

pub use compositor::{blend_channel, ClipRect, CompositeFault, Compositor, Patch};
pub use image::{PixelFormat, TargetImage};
pub use pool::ThreadPool;
pub use scheduler::{
    Alignment, GlyphPlacement, PersistPolicy, RenderPlan, RenderScheduler, SchedulerOptions,
};

/// Render error types
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Text(#[from] caption_text::TextError),

    #[error("Invalid target image: {0}")]
    InvalidImage(String),

    #[error("Compositing failed for {codepoints:?}: {reason}")]
    Composite { codepoints: Vec<char>, reason: String },

    #[error("Compositing workers dropped {codepoints:?} without reporting")]
    WorkerLost { codepoints: Vec<char> },
}

pub type Result<T> = std::result::Result<T, RenderError>;
