//! Parallel caption rendering
//!
//! A render call runs in two phases. Planning is sequential: every distinct
//! codepoint is resolved through the glyph cache, the line is measured, and
//! the pen walk fixes each glyph's destination rectangle. Compositing is
//! parallel: glyphs are grouped into waves whose rectangles are pairwise
//! disjoint, each glyph in a wave is blended on a worker against a private
//! copy of its rectangle, and the wave's patches are written back once it
//! has joined. Overlapping glyphs therefore land in string order, exactly as
//! a sequential left-to-right pass would draw them.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc;
use std::sync::Arc;

use caption_text::{
    CacheEntry, FontFace, GlyphCache, KerningResolver, TextLayout, TextLayoutEngine,
};
use serde::{Deserialize, Serialize};

use crate::compositor::{ClipRect, CompositeFault, Compositor, Patch};
use crate::image::TargetImage;
use crate::pool::{available_workers, ThreadPool};
use crate::{RenderError, Result};

/// Where the text block is placed on the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Centered horizontally and vertically
    #[default]
    Center,
    /// Flush with the left edge, centered vertically
    Left,
    /// Pen starts at `x`, baseline at `y`
    Origin { x: i32, y: i32 },
}

/// When the glyph cache is written to its backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// Flush at the end of every render call that added glyphs
    #[default]
    EveryRender,
    /// Only when the owner calls [`RenderScheduler::flush`]
    Deferred,
}

/// Scheduler tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerOptions {
    pub alignment: Alignment,
    pub persist: PersistPolicy,
    /// Compositing threads; 0 means one per CPU
    pub workers: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            alignment: Alignment::Center,
            persist: PersistPolicy::EveryRender,
            workers: 0,
        }
    }
}

/// One glyph's destination on the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphPlacement {
    pub codepoint: char,
    /// Bitmap top-left corner on the target (may be off-canvas)
    pub x: i32,
    pub y: i32,
    pub entry: CacheEntry,
    /// Visible part of the bitmap; `None` when nothing lands on the target
    pub clip: Option<ClipRect>,
    /// Compositing wave; glyphs sharing a wave never overlap
    pub wave: usize,
}

/// Everything decided before any pixel is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub layout: TextLayout,
    /// Pen start x and baseline y
    pub origin: (i32, i32),
    pub placements: Vec<GlyphPlacement>,
    pub waves: usize,
}

struct TaskOutcome {
    index: usize,
    result: std::result::Result<Patch, CompositeFault>,
}

/// Renders caption text onto frames with a shared glyph cache
pub struct RenderScheduler {
    face: Arc<dyn FontFace>,
    kerning: KerningResolver,
    cache: Arc<GlyphCache>,
    pool: ThreadPool,
    options: SchedulerOptions,
}

impl std::fmt::Debug for RenderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderScheduler")
            .field("point_size", &self.face.point_size())
            .field("cache", &self.cache)
            .field("pool", &self.pool)
            .field("options", &self.options)
            .finish()
    }
}

impl RenderScheduler {
    pub fn new(face: Arc<dyn FontFace>, cache: Arc<GlyphCache>, options: SchedulerOptions) -> Self {
        let workers = if options.workers == 0 {
            available_workers()
        } else {
            options.workers
        };
        Self {
            kerning: KerningResolver::new(Arc::clone(&face)),
            face,
            cache,
            pool: ThreadPool::new(workers),
            options,
        }
    }

    pub fn face(&self) -> &Arc<dyn FontFace> {
        &self.face
    }

    pub fn cache(&self) -> &Arc<GlyphCache> {
        &self.cache
    }

    pub fn kerning(&self) -> &KerningResolver {
        &self.kerning
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Ensure a cache entry exists for every distinct codepoint of `text`
    pub fn preload(&self, text: &str) -> Result<()> {
        self.resolve_entries(text).map(|_| ())
    }

    /// One cache lookup per distinct codepoint
    fn resolve_entries(&self, text: &str) -> Result<HashMap<char, CacheEntry>> {
        let mut entries = HashMap::new();
        for c in text.chars() {
            if !entries.contains_key(&c) {
                entries.insert(c, self.cache.get_or_rasterize(&*self.face, c)?);
            }
        }
        Ok(entries)
    }

    /// Measure `text` with this scheduler's face and kerning
    pub fn measure(&self, text: &str) -> Result<TextLayout> {
        Ok(TextLayoutEngine::new(&*self.face, &self.kerning).measure(text)?)
    }

    /// Decide every glyph's position and wave for a `width × height` target
    pub fn plan(&self, text: &str, width: u32, height: u32) -> Result<RenderPlan> {
        let entries = self.resolve_entries(text)?;

        let engine = TextLayoutEngine::new(&*self.face, &self.kerning);
        let (layout, glyphs) = engine.layout(text)?;
        let origin = self.origin(&layout, width, height);

        let mut placements: Vec<GlyphPlacement> = Vec::with_capacity(glyphs.len());
        let mut waves = 0;

        for glyph in glyphs {
            let entry = match entries.get(&glyph.codepoint) {
                Some(entry) => entry.clone(),
                None => self.cache.get_or_rasterize(&*self.face, glyph.codepoint)?,
            };
            let x = origin.0 + glyph.pen_x + entry.left;
            let y = origin.1 - entry.top;
            let clip = ClipRect::intersect(
                width,
                height,
                x,
                y,
                entry.bitmap.width(),
                entry.bitmap.height(),
            );

            // One wave after the latest earlier glyph this one touches
            let wave = clip.map_or(0, |rect| {
                placements
                    .iter()
                    .filter(|p| p.clip.is_some_and(|other| other.overlaps(&rect)))
                    .map(|p| p.wave + 1)
                    .max()
                    .unwrap_or(0)
            });
            if clip.is_some() {
                waves = waves.max(wave + 1);
            }

            placements.push(GlyphPlacement {
                codepoint: glyph.codepoint,
                x,
                y,
                entry,
                clip,
                wave,
            });
        }

        Ok(RenderPlan {
            layout,
            origin,
            placements,
            waves,
        })
    }

    fn origin(&self, layout: &TextLayout, width: u32, height: u32) -> (i32, i32) {
        let centered_y = (height as i32 - layout.height).div_euclid(2) + layout.baseline;
        match self.options.alignment {
            Alignment::Center => ((width as i32 - layout.width).div_euclid(2), centered_y),
            Alignment::Left => (0, centered_y),
            Alignment::Origin { x, y } => (x, y),
        }
    }

    /// Draw `text` onto `target` and hand the same buffer back.
    ///
    /// On a compositing failure, waves that already joined stay drawn and
    /// later waves are not started; the target is left partially updated.
    pub fn render<'i>(&self, text: &str, target: &'i mut TargetImage) -> Result<&'i mut TargetImage> {
        let plan = self.plan(text, target.width(), target.height())?;
        self.composite(&plan, target)?;

        if self.options.persist == PersistPolicy::EveryRender {
            self.cache.flush()?;
        }
        Ok(target)
    }

    /// Run a plan's compositing waves against `target`
    pub fn composite(&self, plan: &RenderPlan, target: &mut TargetImage) -> Result<()> {
        for wave in 0..plan.waves {
            let members: Vec<(usize, &GlyphPlacement, ClipRect)> = plan
                .placements
                .iter()
                .enumerate()
                .filter(|(_, p)| p.wave == wave)
                .filter_map(|(i, p)| p.clip.map(|rect| (i, p, rect)))
                .collect();

            if let [(_, placement, _)] = members.as_slice() {
                Compositor::blend(target, &placement.entry.bitmap, placement.x, placement.y);
                continue;
            }

            self.composite_wave(plan, &members, target)?;
        }
        Ok(())
    }

    fn composite_wave(
        &self,
        plan: &RenderPlan,
        members: &[(usize, &GlyphPlacement, ClipRect)],
        target: &mut TargetImage,
    ) -> Result<()> {
        let format = target.format();
        let (tx, rx) = mpsc::channel();

        for &(index, placement, rect) in members {
            let mut patch = Patch {
                rect,
                pixels: target.read_region(&rect),
            };
            let bitmap = Arc::clone(&placement.entry.bitmap);
            let (x, y) = (placement.x, placement.y);
            let tx = tx.clone();

            self.pool.submit(move || {
                let result = Compositor::blend_patch(&mut patch, format, &bitmap, x, y).map(|()| patch);
                // The receiver only goes away if the submitter already bailed
                let _ = tx.send(TaskOutcome { index, result });
            });
        }
        drop(tx);

        let patches = join_wave(plan, members, &rx)?;
        for patch in &patches {
            target.write_region(&patch.rect, &patch.pixels);
        }
        Ok(())
    }

    /// Persist the glyph cache now, regardless of policy
    pub fn flush(&self) -> Result<bool> {
        Ok(self.cache.flush()?)
    }
}

/// Collect one outcome per wave member.
///
/// Faults win over lost tasks; both name every affected codepoint.
fn join_wave(
    plan: &RenderPlan,
    members: &[(usize, &GlyphPlacement, ClipRect)],
    rx: &mpsc::Receiver<TaskOutcome>,
) -> Result<Vec<Patch>> {
    let mut patches = Vec::with_capacity(members.len());
    let mut reported = HashSet::with_capacity(members.len());
    let mut failed = Vec::new();
    let mut first_fault = None;

    for _ in 0..members.len() {
        let Ok(outcome) = rx.recv() else {
            break;
        };
        reported.insert(outcome.index);
        match outcome.result {
            Ok(patch) => patches.push(patch),
            Err(fault) => {
                failed.push(plan.placements[outcome.index].codepoint);
                first_fault.get_or_insert(fault);
            }
        }
    }

    if let Some(fault) = first_fault {
        return Err(RenderError::Composite {
            codepoints: failed,
            reason: fault.to_string(),
        });
    }
    if reported.len() < members.len() {
        let codepoints = members
            .iter()
            .filter(|(index, _, _)| !reported.contains(index))
            .map(|(_, placement, _)| placement.codepoint)
            .collect();
        return Err(RenderError::WorkerLost { codepoints });
    }
    Ok(patches)
}
