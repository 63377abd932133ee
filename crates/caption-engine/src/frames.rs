//! Frame source and sink
//!
//! Frames are addressed by their 1-based index. The pipeline reads a frame,
//! draws on it and writes it back under the same index.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use caption_render::{PixelFormat, TargetImage};
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::{EngineError, Result};

/// Indexed frame storage
pub trait FrameStore {
    fn read_frame(&mut self, index: u32) -> Result<TargetImage>;
    fn write_frame(&mut self, index: u32, frame: &TargetImage) -> Result<()>;
}

fn frame_error(index: u32, reason: impl ToString) -> EngineError {
    EngineError::Frame {
        index,
        reason: reason.to_string(),
    }
}

/// Swap red and blue in place; converts between RGBA and BGRA
fn swap_red_blue(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

/// A directory of `<index>.<ext>` image files (PNG or JPEG)
#[derive(Debug, Clone)]
pub struct DirectoryFrameStore {
    dir: PathBuf,
    extension: String,
    pixel_format: PixelFormat,
}

impl DirectoryFrameStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            pixel_format: PixelFormat::Rgba,
        }
    }

    /// Byte order of the images handed to callers
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of frame `index`
    pub fn frame_path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("{}.{}", index, self.extension))
    }

    fn image_format(&self, index: u32) -> Result<ImageFormat> {
        match ImageFormat::from_extension(&self.extension) {
            Some(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => Ok(format),
            _ => Err(frame_error(
                index,
                format!("unsupported frame extension {:?}", self.extension),
            )),
        }
    }
}

impl FrameStore for DirectoryFrameStore {
    fn read_frame(&mut self, index: u32) -> Result<TargetImage> {
        let format = self.image_format(index)?;
        let path = self.frame_path(index);
        let data = std::fs::read(&path).map_err(|e| frame_error(index, format!("{}: {e}", path.display())))?;

        let decoded = image::load_from_memory_with_format(&data, format)
            .map_err(|e| frame_error(index, e))?
            .into_rgba8();
        let (width, height) = decoded.dimensions();
        let mut pixels = decoded.into_raw();
        if self.pixel_format == PixelFormat::Bgra {
            swap_red_blue(&mut pixels);
        }

        Ok(TargetImage::from_raw(width, height, self.pixel_format, pixels)?)
    }

    fn write_frame(&mut self, index: u32, frame: &TargetImage) -> Result<()> {
        let format = self.image_format(index)?;
        let mut pixels = frame.as_bytes().to_vec();
        if frame.format() == PixelFormat::Bgra {
            swap_red_blue(&mut pixels);
        }

        let rgba = RgbaImage::from_raw(frame.width(), frame.height(), pixels)
            .ok_or_else(|| frame_error(index, "buffer does not match dimensions"))?;
        // JPEG has no alpha channel
        let encodable = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).into_rgb8()),
            _ => DynamicImage::ImageRgba8(rgba),
        };

        let mut encoded = Cursor::new(Vec::new());
        encodable
            .write_to(&mut encoded, format)
            .map_err(|e| frame_error(index, e))?;
        std::fs::write(self.frame_path(index), encoded.into_inner())?;
        Ok(())
    }
}

/// Frames held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameStore {
    frames: HashMap<u32, TargetImage>,
    writes: usize,
}

impl MemoryFrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` identical frames numbered `1..=count`
    pub fn filled(count: u32, frame: &TargetImage) -> Self {
        Self {
            frames: (1..=count).map(|i| (i, frame.clone())).collect(),
            writes: 0,
        }
    }

    pub fn insert(&mut self, index: u32, frame: TargetImage) {
        self.frames.insert(index, frame);
    }

    pub fn get(&self, index: u32) -> Option<&TargetImage> {
        self.frames.get(&index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of `write_frame` calls served
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl FrameStore for MemoryFrameStore {
    fn read_frame(&mut self, index: u32) -> Result<TargetImage> {
        self.frames
            .get(&index)
            .cloned()
            .ok_or_else(|| frame_error(index, "no such frame"))
    }

    fn write_frame(&mut self, index: u32, frame: &TargetImage) -> Result<()> {
        self.frames.insert(index, frame.clone());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("caption-frames-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_frame_path() {
        let store = DirectoryFrameStore::new("/tmp/frames", "jpeg");
        assert_eq!(store.frame_path(17), PathBuf::from("/tmp/frames/17.jpeg"));
    }

    #[test]
    fn test_png_roundtrip_bgra() {
        let dir = temp_dir("png");
        let mut store = DirectoryFrameStore::new(&dir, "png").with_pixel_format(PixelFormat::Bgra);

        let mut frame = TargetImage::filled(4, 3, PixelFormat::Bgra, [10, 20, 30, 255]);
        frame.set_pixel(1, 1, [200, 100, 50, 255]);
        store.write_frame(1, &frame).unwrap();

        let back = store.read_frame(1).unwrap();
        assert_eq!(back, frame);

        let rgba = DirectoryFrameStore::new(&dir, "png").read_frame(1).unwrap();
        assert_eq!(rgba.format(), PixelFormat::Rgba);
        assert_eq!(rgba.pixel(1, 1), Some([50, 100, 200, 255]));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_jpeg_write_and_read() {
        let dir = temp_dir("jpeg");
        let mut store = DirectoryFrameStore::new(&dir, "jpeg");
        let frame = TargetImage::filled(16, 16, PixelFormat::Rgba, [128, 128, 128, 255]);
        store.write_frame(3, &frame).unwrap();

        let back = store.read_frame(3).unwrap();
        assert_eq!((back.width(), back.height()), (16, 16));
        let [r, g, b, a] = back.pixel(8, 8).unwrap();
        assert!(r.abs_diff(128) <= 3 && g.abs_diff(128) <= 3 && b.abs_diff(128) <= 3);
        assert_eq!(a, 255);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_frame() {
        let dir = temp_dir("missing");
        let mut store = DirectoryFrameStore::new(&dir, "png");
        assert!(matches!(store.read_frame(99), Err(EngineError::Frame { index: 99, .. })));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unsupported_extension() {
        let mut store = DirectoryFrameStore::new(std::env::temp_dir(), "tga");
        let frame = TargetImage::filled(1, 1, PixelFormat::Rgba, [0, 0, 0, 255]);
        assert!(matches!(store.write_frame(1, &frame), Err(EngineError::Frame { index: 1, .. })));
    }

    #[test]
    fn test_memory_store() {
        let frame = TargetImage::filled(2, 2, PixelFormat::Rgba, [1, 2, 3, 4]);
        let mut store = MemoryFrameStore::filled(3, &frame);
        assert_eq!(store.len(), 3);
        assert!(store.read_frame(0).is_err());
        assert!(store.read_frame(4).is_err());

        let mut changed = store.read_frame(2).unwrap();
        changed.set_pixel(0, 0, [9, 9, 9, 9]);
        store.write_frame(2, &changed).unwrap();
        assert_eq!(store.get(2), Some(&changed));
        assert_eq!(store.writes(), 1);
    }
}
