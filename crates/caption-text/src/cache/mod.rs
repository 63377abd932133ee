//! Persistent glyph cache
//!
//! Maps `(codepoint, point size)` to a colorized glyph bitmap plus its
//! placement offsets. The mapping sits behind one mutex; a lookup that
//! misses, rasterizes and inserts is a single critical section, so the
//! map is never observed half-written. The whole map is written to a
//! versioned binary file and reloaded on the next run.

mod store;

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::font::FontFace;
use crate::glyph::{CacheEntry, GlyphKey, TextColor};
use crate::Result;

/// Cache lookup counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate in `[0, 1]`
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe glyph cache with file persistence
#[derive(Debug)]
pub struct GlyphCache {
    entries: Mutex<HashMap<GlyphKey, CacheEntry>>,
    color: TextColor,
    store_path: Option<PathBuf>,
    hits: AtomicU64,
    misses: AtomicU64,
    dirty: AtomicBool,
    /// Serializes writers of the backing file
    persist_lock: Mutex<()>,
}

impl GlyphCache {
    /// An empty, memory-only cache
    pub fn new(color: TextColor) -> Self {
        Self::from_entries(HashMap::new(), color, None)
    }

    /// A cache backed by `path`, restored eagerly.
    ///
    /// A missing or damaged file yields an empty cache.
    pub fn open(path: impl Into<PathBuf>, color: TextColor) -> Self {
        let path = path.into();
        let entries = Self::restore(&path, color);
        Self::from_entries(entries, color, Some(path))
    }

    fn from_entries(
        entries: HashMap<GlyphKey, CacheEntry>,
        color: TextColor,
        store_path: Option<PathBuf>,
    ) -> Self {
        Self {
            entries: Mutex::new(entries),
            color,
            store_path,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            dirty: AtomicBool::new(false),
            persist_lock: Mutex::new(()),
        }
    }

    /// Read a store file. Not-found and corrupt files both give an empty map.
    pub fn restore(path: &Path, color: TextColor) -> HashMap<GlyphKey, CacheEntry> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No glyph cache at {}, starting cold", path.display());
                return HashMap::new();
            }
            Err(e) => {
                tracing::warn!("Glyph cache {} unreadable ({}), starting cold", path.display(), e);
                return HashMap::new();
            }
        };

        match store::decode(&data, color) {
            Ok(entries) => {
                tracing::debug!("Restored {} glyphs from {}", entries.len(), path.display());
                entries.into_iter().collect()
            }
            Err(e) => {
                tracing::warn!("Discarding glyph cache {}: {}", path.display(), e);
                HashMap::new()
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<GlyphKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Color every bitmap in this cache is drawn with
    pub fn color(&self) -> TextColor {
        self.color
    }

    /// File the cache persists to on [`flush`](Self::flush)
    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    /// Look up an entry without creating it
    pub fn get(&self, key: &GlyphKey) -> Option<CacheEntry> {
        let entry = self.lock().get(key).cloned();
        let counter = if entry.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        entry
    }

    /// Check presence without touching the counters
    pub fn contains(&self, key: &GlyphKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Insert or replace an entry
    pub fn insert(&self, key: GlyphKey, entry: CacheEntry) {
        self.lock().insert(key, entry);
        self.dirty.store(true, Ordering::Release);
    }

    /// Return the cached entry, or build it with `factory` and store it.
    ///
    /// The lock is held across `factory`, so two callers missing on the
    /// same key rasterize it once. A failing factory inserts nothing.
    pub fn get_or_create<F>(&self, codepoint: char, point_size: u32, factory: F) -> Result<CacheEntry>
    where
        F: FnOnce() -> Result<CacheEntry>,
    {
        let key = GlyphKey::new(codepoint, point_size);
        let mut entries = self.lock();

        if let Some(entry) = entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Glyph cache miss for {:?} at {}pt", codepoint, point_size);

        let entry = factory()?;
        entries.insert(key, entry.clone());
        self.dirty.store(true, Ordering::Release);
        Ok(entry)
    }

    /// [`get_or_create`](Self::get_or_create) rasterizing through `face`
    pub fn get_or_rasterize(&self, face: &dyn FontFace, codepoint: char) -> Result<CacheEntry> {
        self.get_or_create(codepoint, face.point_size(), || {
            let glyph = face.rasterize(codepoint)?;
            Ok(CacheEntry::from_rasterized(&glyph, self.color))
        })
    }

    /// Write the whole mapping to `path`, replacing any existing file.
    ///
    /// Data goes to a sibling temporary file first and is renamed into
    /// place, so readers see either the old or the new store.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let _guard = self.persist_guard();
        self.write_store(path)
    }

    fn persist_guard(&self) -> MutexGuard<'_, ()> {
        self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self, path: &Path) -> Result<()> {
        let mut snapshot = self.snapshot();
        snapshot.sort_by_key(|(key, _)| *key);
        let bytes = store::encode(self.color, &snapshot);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;

        tracing::info!(
            "Persisted {} glyphs ({} bytes) to {}",
            snapshot.len(),
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    /// Persist to the backing file if anything changed since the last flush.
    ///
    /// Returns whether a write happened. Memory-only caches never write.
    /// Concurrent flushes are serialized; the snapshot is taken after the
    /// dirty flag is cleared, so a glyph inserted meanwhile marks the cache
    /// dirty again and reaches disk on the next flush.
    pub fn flush(&self) -> Result<bool> {
        let Some(path) = self.store_path.as_deref() else {
            return Ok(false);
        };
        let _guard = self.persist_guard();
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        if let Err(e) = self.write_store(path) {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        Ok(true)
    }

    /// Copy of every entry, in no particular order
    pub fn snapshot(&self) -> Vec<(GlyphKey, CacheEntry)> {
        self.lock()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    /// Number of cached glyphs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Lookup counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
