//! Captioning run over a sequence of frames

use std::sync::Arc;

use caption_render::{RenderScheduler, TargetImage};
use caption_text::{CacheStats, FontFace, FontLocator, GlyphCache, TtfFontFace};

use crate::config::{Config, FontSource};
use crate::frames::FrameStore;
use crate::timing::{schedule, CaptionWord};
use crate::Result;

/// What a [`CaptionPipeline::render_captions`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Words that fit inside the video
    pub words: usize,
    /// Frames read, drawn on and written back
    pub frames: usize,
    /// Glyph cache counters at the end of the run
    pub cache: CacheStats,
    /// Whether the glyph cache file was rewritten
    pub flushed: bool,
}

/// Draws timed caption words onto stored frames
#[derive(Debug)]
pub struct CaptionPipeline {
    config: Config,
    scheduler: RenderScheduler,
}

impl CaptionPipeline {
    /// Load the configured font and open the glyph cache
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let face = load_face(&config)?;
        Ok(Self::with_face(config, Arc::new(face)))
    }

    /// Build around an already loaded face.
    ///
    /// The face's own point size wins over `config.point_size`.
    pub fn with_face(config: Config, face: Arc<dyn FontFace>) -> Self {
        let cache = match &config.cache_path {
            Some(path) => GlyphCache::open(path, config.text_color),
            None => GlyphCache::new(config.text_color),
        };
        tracing::info!(
            "Caption pipeline ready: {}pt, {} cached glyphs",
            face.point_size(),
            cache.len()
        );
        let scheduler = RenderScheduler::new(face, Arc::new(cache), config.scheduler_options());
        Self { config, scheduler }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    /// Draw one word onto one frame
    pub fn render_word(&self, text: &str, frame: &mut TargetImage) -> Result<()> {
        self.scheduler.render(text, frame)?;
        Ok(())
    }

    /// Draw every word onto the frames it is spoken over.
    ///
    /// Words are scheduled with [`schedule`]; each covered frame is read,
    /// drawn on and written back in order. The glyph cache is flushed once
    /// at the end of the run.
    pub fn render_captions(
        &self,
        words: &[CaptionWord],
        framerate: f64,
        total_frames: u32,
        store: &mut dyn FrameStore,
    ) -> Result<RunSummary> {
        let scheduled = schedule(words, framerate, total_frames);
        tracing::info!(
            "Rendering {} of {} words over {} frames at {} fps",
            scheduled.len(),
            words.len(),
            total_frames,
            framerate
        );

        let mut frames = 0;
        for item in &scheduled {
            for index in item.frames.clone() {
                let mut frame = store.read_frame(index)?;
                self.render_word(&item.word.text, &mut frame)?;
                store.write_frame(index, &frame)?;
                frames += 1;
            }
            tracing::debug!("Drew {:?} on frames {:?}", item.word.text, item.frames);
        }

        let flushed = self.flush()?;
        let cache = self.scheduler.cache().stats();
        tracing::info!(
            "Captioned {} frames; glyph cache {} entries, {} hits, {} misses ({:.1}% hit rate)",
            frames,
            cache.entries,
            cache.hits,
            cache.misses,
            cache.hit_rate() * 100.0
        );

        Ok(RunSummary {
            words: scheduled.len(),
            frames,
            cache,
            flushed,
        })
    }

    /// Write the glyph cache if it changed
    pub fn flush(&self) -> Result<bool> {
        Ok(self.scheduler.flush()?)
    }
}

fn load_face(config: &Config) -> Result<TtfFontFace> {
    let face = match &config.font {
        FontSource::Path(path) => TtfFontFace::load(path, config.point_size)?,
        FontSource::Family(family) => {
            FontLocator::with_system_fonts().load(family, config.point_size)?
        }
    };
    Ok(face.with_missing_glyph_policy(config.missing_glyph))
}
