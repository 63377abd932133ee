//! Alpha compositing of glyph bitmaps
//!
//! `out = (1 - a) * bg + a * fg` per color channel with `a = alpha / 255`,
//! evaluated in integers and floored. The destination's fourth channel is
//! left as it was. Pixels outside the target are dropped without error.

use caption_text::GlyphBitmap;

use crate::image::{PixelFormat, TargetImage};

/// Intersection of a glyph's rectangle with the target, in target pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ClipRect {
    /// Clip a `width × height` box at `(x, y)` to a `bounds_w × bounds_h` image.
    ///
    /// `None` when nothing of the box is inside.
    pub fn intersect(bounds_w: u32, bounds_h: u32, x: i32, y: i32, width: u32, height: u32) -> Option<Self> {
        let x0 = i64::from(x).max(0);
        let y0 = i64::from(y).max(0);
        let x1 = (i64::from(x) + i64::from(width)).min(i64::from(bounds_w));
        let y1 = (i64::from(y) + i64::from(height)).min(i64::from(bounds_h));

        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        Some(Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// Check if two rectangles share a pixel
    pub fn overlaps(&self, other: &ClipRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Pixel count
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A detached copy of a target region, blended off-thread and written back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub rect: ClipRect,
    pub pixels: Vec<u8>,
}

/// Why a blend could not be carried out
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositeFault {
    #[error("patch holds {actual} bytes, expected {expected}")]
    PatchSize { expected: usize, actual: usize },

    #[error("glyph at ({x}, {y}) does not cover region {rect:?}")]
    OutsideGlyph { x: i32, y: i32, rect: ClipRect },
}

/// Blend one channel
#[inline]
pub fn blend_channel(bg: u8, fg: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    (((255 - a) * u32::from(bg) + a * u32::from(fg)) / 255) as u8
}

/// Glyph compositor
#[derive(Debug, Clone, Copy, Default)]
pub struct Compositor;

impl Compositor {
    /// Blend `glyph` onto `target` with its top-left corner at `(x, y)`.
    ///
    /// Returns the region written, `None` if the glyph is entirely
    /// off-canvas.
    pub fn blend(target: &mut TargetImage, glyph: &GlyphBitmap, x: i32, y: i32) -> Option<ClipRect> {
        let rect = ClipRect::intersect(
            target.width(),
            target.height(),
            x,
            y,
            glyph.width(),
            glyph.height(),
        )?;
        let format = target.format();

        for row in 0..rect.height {
            let range = target.row_range(&rect, row);
            let src = glyph_row(glyph, &rect, x, y, row);
            blend_row(&mut target.as_bytes_mut()[range], src, format);
        }

        Some(rect)
    }

    /// Blend `glyph` at `(x, y)` into a detached copy of `patch.rect`
    pub fn blend_patch(
        patch: &mut Patch,
        format: PixelFormat,
        glyph: &GlyphBitmap,
        x: i32,
        y: i32,
    ) -> Result<(), CompositeFault> {
        let rect = patch.rect;
        let expected = rect.area() * 4;
        if patch.pixels.len() != expected {
            return Err(CompositeFault::PatchSize {
                expected,
                actual: patch.pixels.len(),
            });
        }

        let glyph_rect = ClipRect::intersect(u32::MAX, u32::MAX, x, y, glyph.width(), glyph.height());
        let covered = glyph_rect.is_some_and(|g| {
            rect.x >= g.x
                && rect.y >= g.y
                && rect.x + rect.width <= g.x + g.width
                && rect.y + rect.height <= g.y + g.height
        });
        if !covered {
            return Err(CompositeFault::OutsideGlyph { x, y, rect });
        }

        let stride = rect.width as usize * 4;
        for (row, dst) in (0..rect.height).zip(patch.pixels.chunks_exact_mut(stride)) {
            blend_row(dst, glyph_row(glyph, &rect, x, y, row), format);
        }
        Ok(())
    }
}

/// The slice of `glyph` that lands on row `row` of `rect`
fn glyph_row<'g>(glyph: &'g GlyphBitmap, rect: &ClipRect, x: i32, y: i32, row: u32) -> &'g [u8] {
    let gx = (i64::from(rect.x) - i64::from(x)) as usize;
    let gy = (i64::from(rect.y + row) - i64::from(y)) as usize;
    let start = (gy * glyph.width() as usize + gx) * 4;
    &glyph.pixels()[start..start + rect.width as usize * 4]
}

/// Blend one row of RGBA glyph pixels over destination pixels
fn blend_row(dst: &mut [u8], src: &[u8], format: PixelFormat) {
    let [ro, go, bo] = format.color_offsets();
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let alpha = s[3];
        match alpha {
            0 => {}
            255 => {
                d[ro] = s[0];
                d[go] = s[1];
                d[bo] = s[2];
            }
            _ => {
                d[ro] = blend_channel(d[ro], s[0], alpha);
                d[go] = blend_channel(d[go], s[1], alpha);
                d[bo] = blend_channel(d[bo], s[2], alpha);
            }
        }
    }
}
