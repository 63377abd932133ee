//! Edge case tests for caption-text
//!
//! Layout arithmetic, kerning memoization and cache persistence through the
//! public API, plus a smoke test against a real system font when one exists.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use caption_text::*;

fn temp_path(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("caption-text-it-{}-{}-{}.bin", name, std::process::id(), n))
}

fn glyph(advance_x: i32, top: i32, rows: u32) -> SyntheticGlyph {
    SyntheticGlyph::solid(
        GlyphMetrics {
            advance_x,
            bitmap_left: 0,
            bitmap_top: top,
            width: 3,
            height: rows,
        },
        255,
    )
}

// ============================================================================
// LAYOUT
// ============================================================================

#[test]
fn test_ab_scenario_at_48pt() {
    let face = Arc::new(
        SyntheticFace::new(48)
            .with_glyph('A', glyph(30, 40, 40))
            .with_glyph('B', glyph(28, 35, 35))
            .with_kerning('A', 'B', KerningOffset::new(2, 0)),
    );
    let kerning = KerningResolver::new(face.clone());
    let engine = TextLayoutEngine::new(&*face, &kerning);

    let layout = engine.measure("AB").unwrap();
    assert_eq!(layout.width, 30 + 2 + 28);
    assert_eq!(layout.height, 0);
    assert_eq!(layout.baseline, 0);
    assert!(layout.height >= 0 && layout.baseline >= 0);
}

#[test]
fn test_negative_kerning_tightens() {
    let face = Arc::new(
        SyntheticFace::new(24)
            .with_glyph('A', glyph(15, 18, 18))
            .with_glyph('V', glyph(15, 18, 18))
            .with_kerning('A', 'V', KerningOffset::new(-3, 0)),
    );
    let kerning = KerningResolver::new(face.clone());
    let engine = TextLayoutEngine::new(&*face, &kerning);

    assert_eq!(engine.measure("AV").unwrap().width, 27);
    assert_eq!(engine.measure("VA").unwrap().width, 30);
}

#[test]
fn test_repeated_layout_reuses_kerning() {
    let face = Arc::new(
        SyntheticFace::new(24)
            .with_glyph('a', glyph(10, 8, 8))
            .with_glyph('b', glyph(11, 12, 12)),
    );
    let kerning = KerningResolver::new(face.clone());
    let engine = TextLayoutEngine::new(&*face, &kerning);

    engine.measure("abab").unwrap();
    // (None,a) (a,b) (b,a)
    assert_eq!(face.kerning_calls(), 3);
    engine.measure("abab").unwrap();
    assert_eq!(face.kerning_calls(), 3);
    assert_eq!(kerning.len(), 3);
}

// ============================================================================
// CACHE
// ============================================================================

#[test]
fn test_cache_survives_reopen() {
    let path = temp_path("reopen");
    let face = SyntheticFace::new(48).with_glyph('A', glyph(30, 40, 40));

    let cache = GlyphCache::open(&path, TextColor::WHITE);
    let created = cache.get_or_rasterize(&face, 'A').unwrap();
    assert!(cache.flush().unwrap());

    let reopened = GlyphCache::open(&path, TextColor::WHITE);
    let restored = reopened.get(&GlyphKey::new('A', 48)).unwrap();
    assert_eq!(restored, created);
    assert_eq!(restored.bitmap.pixels(), created.bitmap.pixels());

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_cache_color_change_starts_cold() {
    let path = temp_path("recolor");
    let face = SyntheticFace::new(48).with_glyph('A', glyph(30, 40, 40));

    let cache = GlyphCache::open(&path, TextColor::WHITE);
    cache.get_or_rasterize(&face, 'A').unwrap();
    cache.flush().unwrap();

    let yellow = GlyphCache::open(&path, TextColor::YELLOW);
    assert!(yellow.is_empty());

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_cache_keys_separate_point_sizes() {
    let small = SyntheticFace::new(12).with_glyph('A', glyph(6, 9, 9));
    let large = SyntheticFace::new(48).with_glyph('A', glyph(30, 40, 40));
    let cache = GlyphCache::new(TextColor::WHITE);

    cache.get_or_rasterize(&small, 'A').unwrap();
    cache.get_or_rasterize(&large, 'A').unwrap();

    assert_eq!(cache.len(), 2);
    assert!(cache.contains(&GlyphKey::new('A', 12)));
    assert!(cache.contains(&GlyphKey::new('A', 48)));
}

#[test]
fn test_cache_directory_path_is_not_fatal() {
    // A directory is unreadable as a store
    let cache = GlyphCache::open(std::env::temp_dir(), TextColor::WHITE);
    assert!(cache.is_empty());
}

// ============================================================================
// REAL FONTS
// ============================================================================

/// Load a system face, reporting on stderr when the family is unavailable
fn system_face(family: &str, point_size: u32) -> Option<TtfFontFace> {
    match FontLocator::with_system_fonts().load(family, point_size) {
        Ok(face) => Some(face),
        Err(e) => {
            eprintln!("skipping: no system font for {family:?} ({e})");
            None
        }
    }
}

#[test]
fn test_system_font_rasterizes() {
    let Some(face) = system_face("sans-serif", 32) else {
        return;
    };

    let metrics = face.glyph_metrics('H').unwrap();
    assert!(metrics.advance_x > 0);
    assert!(metrics.width > 0 && metrics.height > 0);

    let glyph = face.rasterize('H').unwrap();
    assert_eq!(glyph.metrics, metrics);
    assert_eq!(glyph.coverage.len(), (metrics.width * metrics.height) as usize);
    assert!(glyph.coverage.iter().any(|&a| a > 0));

    let space = face.rasterize(' ').unwrap();
    assert!(space.coverage.is_empty());
    assert!(space.metrics.advance_x > 0);

    assert_eq!(face.kerning(None, 'H'), KerningOffset::ZERO);
}

#[test]
fn test_system_font_missing_glyph_policy() {
    let Some(face) = system_face("sans-serif", 32) else {
        return;
    };
    // Private use area: no regular font maps it
    let pua = '\u{F8FF}';
    if face.glyph_metrics(pua).is_ok() {
        eprintln!("skipping: system sans-serif maps U+F8FF");
        return;
    }

    let face = face.with_missing_glyph_policy(MissingGlyphPolicy::Substitute('?'));
    assert_eq!(face.glyph_metrics(pua).unwrap(), face.glyph_metrics('?').unwrap());

    let face = face.with_missing_glyph_policy(MissingGlyphPolicy::NotDef);
    assert!(face.rasterize(pua).is_ok());

    let face = face.with_missing_glyph_policy(MissingGlyphPolicy::Fail);
    assert!(matches!(face.glyph_metrics(pua), Err(TextError::GlyphNotFound(_))));
}

#[test]
fn test_dejavu_kern_pairs() {
    let Some(face) = system_face("DejaVu Sans", 48) else {
        return;
    };

    // kern table values scaled to 48px, floored
    assert_eq!(face.kerning(Some('A'), 'V'), KerningOffset::new(-4, 0));
    assert_eq!(face.kerning(Some('T'), 'o'), KerningOffset::new(-9, 0));

    assert_eq!(face.kerning(Some('H'), 'H'), KerningOffset::ZERO);
    assert_eq!(face.kerning(None, 'V'), KerningOffset::ZERO);
}

#[test]
fn test_dejavu_kerning_reaches_layout() {
    let Some(face) = system_face("DejaVu Sans", 48) else {
        return;
    };
    let face: Arc<dyn FontFace> = Arc::new(face);
    let kerning = KerningResolver::new(Arc::clone(&face));
    let engine = TextLayoutEngine::new(&*face, &kerning);

    let a = face.glyph_metrics('A').unwrap().advance_x;
    let v = face.glyph_metrics('V').unwrap().advance_x;
    assert_eq!(engine.measure("AV").unwrap().width, a + v - 4);
    assert_eq!(kerning.resolve(Some('A'), 'V'), KerningOffset::new(-4, 0));
}
