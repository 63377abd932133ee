//! Versioned binary glyph store
//!
//! Layout (big-endian):
//!
//! ```text
//! magic      8 bytes  "CAPGLYPH"
//! version    u16
//! color      3 bytes  r g b
//! count      u32
//! entries    count × { codepoint u32, point_size u32, left i32, top i32,
//!                      width u32, height u32, rgba [u8; width*height*4] }
//! checksum   u64      FNV-1a over every preceding byte
//! ```

use crate::glyph::{CacheEntry, GlyphBitmap, GlyphKey, TextColor};

pub(crate) const MAGIC: &[u8; 8] = b"CAPGLYPH";
pub(crate) const VERSION: u16 = 1;

/// Reasons a store file is rejected. Never surfaces past the cache.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum StoreError {
    #[error("not a glyph store")]
    BadMagic,
    #[error("unsupported store version {0}")]
    UnsupportedVersion(u16),
    #[error("store was written for color {0:?}")]
    ColorMismatch(TextColor),
    #[error("store truncated")]
    Truncated,
    #[error("invalid codepoint {0:#x}")]
    InvalidCodepoint(u32),
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("{0} trailing bytes after entries")]
    TrailingBytes(usize),
}

/// Encode entries, in the order given
pub(crate) fn encode(color: TextColor, entries: &[(GlyphKey, CacheEntry)]) -> Vec<u8> {
    let payload: usize = entries
        .iter()
        .map(|(_, e)| 24 + e.bitmap.pixels().len())
        .sum();
    let mut w = StoreWriter::with_capacity(8 + 2 + 3 + 4 + payload + 8);

    w.write_bytes(MAGIC);
    w.write_u16(VERSION);
    w.write_bytes(&[color.r, color.g, color.b]);
    w.write_u32(entries.len() as u32);

    for (key, entry) in entries {
        w.write_u32(key.codepoint as u32);
        w.write_u32(key.point_size);
        w.write_i32(entry.left);
        w.write_i32(entry.top);
        w.write_u32(entry.bitmap.width());
        w.write_u32(entry.bitmap.height());
        w.write_bytes(entry.bitmap.pixels());
    }

    w.finish()
}

/// Decode a store, rejecting anything not written for `color`
pub(crate) fn decode(
    data: &[u8],
    color: TextColor,
) -> Result<Vec<(GlyphKey, CacheEntry)>, StoreError> {
    if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
        return Err(StoreError::BadMagic);
    }
    if data.len() < MAGIC.len() + 8 {
        return Err(StoreError::Truncated);
    }

    let (body, tail) = data.split_at(data.len() - 8);
    let mut sum = [0u8; 8];
    sum.copy_from_slice(tail);
    if fnv1a(body) != u64::from_be_bytes(sum) {
        // A truncated file almost always lands here too
        return Err(StoreError::ChecksumMismatch);
    }

    let mut r = StoreReader::new(body);
    r.skip(MAGIC.len())?;

    let version = r.read_u16()?;
    if version != VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }

    let rgb = r.read_bytes(3)?;
    let stored = TextColor::rgb(rgb[0], rgb[1], rgb[2]);
    if stored != color {
        return Err(StoreError::ColorMismatch(stored));
    }

    let count = r.read_u32()? as usize;
    // Each entry is at least 24 bytes; don't trust count for allocation
    let mut entries = Vec::with_capacity(count.min(r.remaining() / 24));

    for _ in 0..count {
        let raw = r.read_u32()?;
        let codepoint = char::from_u32(raw).ok_or(StoreError::InvalidCodepoint(raw))?;
        let point_size = r.read_u32()?;
        let left = r.read_i32()?;
        let top = r.read_i32()?;
        let width = r.read_u32()?;
        let height = r.read_u32()?;

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(StoreError::Truncated)?;
        let pixels = r.read_bytes(len)?.to_vec();
        let bitmap = GlyphBitmap::from_rgba(width, height, pixels).ok_or(StoreError::Truncated)?;

        entries.push((
            GlyphKey::new(codepoint, point_size),
            CacheEntry::new(bitmap, left, top),
        ));
    }

    if r.remaining() != 0 {
        return Err(StoreError::TrailingBytes(r.remaining()));
    }

    Ok(entries)
}

/// 64-bit FNV-1a
pub(crate) fn fnv1a(data: &[u8]) -> u64 {
    let mut state: u64 = 0xcbf29ce484222325; // FNV offset basis
    for &byte in data {
        state ^= u64::from(byte);
        state = state.wrapping_mul(0x100000001b3); // FNV prime
    }
    state
}

struct StoreWriter {
    buf: Vec<u8>,
}

impl StoreWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Append the checksum and return the buffer
    fn finish(mut self) -> Vec<u8> {
        let sum = fnv1a(&self.buf);
        self.buf.extend_from_slice(&sum.to_be_bytes());
        self.buf
    }
}

/// Bounds-checked big-endian reader
struct StoreReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StoreReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn skip(&mut self, n: usize) -> Result<(), StoreError> {
        self.read_bytes(n).map(|_| ())
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], StoreError> {
        if n > self.remaining() {
            return Err(StoreError::Truncated);
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_u16(&mut self) -> Result<u16, StoreError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, StoreError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i32(&mut self) -> Result<i32, StoreError> {
        Ok(self.read_u32()? as i32)
    }
}
