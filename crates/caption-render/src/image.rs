//! Target frame buffers

use crate::compositor::ClipRect;
use crate::{RenderError, Result};

/// Byte order of a 4-channel pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    #[default]
    Rgba,
    /// OpenCV-style frames
    Bgra,
}

impl PixelFormat {
    /// Byte offsets of red, green and blue within a pixel
    pub const fn color_offsets(self) -> [usize; 3] {
        match self {
            PixelFormat::Rgba => [0, 1, 2],
            PixelFormat::Bgra => [2, 1, 0],
        }
    }
}

/// A `height × width × 4` pixel buffer that captions are drawn onto.
///
/// Rendering mutates the buffer in place; the fourth channel is never
/// written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetImage {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl TargetImage {
    /// A buffer filled with one pixel value (in `format` byte order)
    pub fn filled(width: u32, height: u32, format: PixelFormat, pixel: [u8; 4]) -> Self {
        let len = width as usize * height as usize;
        let mut data = Vec::with_capacity(len * 4);
        for _ in 0..len {
            data.extend_from_slice(&pixel);
        }
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Wrap an existing buffer; its length must be `width * height * 4`
    pub fn from_raw(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| RenderError::InvalidImage(format!("{width}x{height} overflows")))?;
        if data.len() != expected {
            return Err(RenderError::InvalidImage(format!(
                "{}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Give the buffer back to the caller
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// One pixel in the buffer's own byte order
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let idx = self.index(x, y)?;
        let px = &self.data[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Set a pixel; out-of-bounds writes are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        if let Some(idx) = self.index(x, y) {
            self.data[idx..idx + 4].copy_from_slice(&pixel);
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize * self.width as usize + x as usize) * 4)
    }

    /// Byte range of one row of `rect`
    pub(crate) fn row_range(&self, rect: &ClipRect, row: u32) -> std::ops::Range<usize> {
        let start = ((rect.y + row) as usize * self.width as usize + rect.x as usize) * 4;
        start..start + rect.width as usize * 4
    }

    /// Copy `rect` out into a tightly packed buffer
    pub(crate) fn read_region(&self, rect: &ClipRect) -> Vec<u8> {
        let mut out = Vec::with_capacity(rect.area() * 4);
        for row in 0..rect.height {
            out.extend_from_slice(&self.data[self.row_range(rect, row)]);
        }
        out
    }

    /// Copy a tightly packed buffer back into `rect`
    pub(crate) fn write_region(&mut self, rect: &ClipRect, pixels: &[u8]) {
        let stride = rect.width as usize * 4;
        for (row, src) in (0..rect.height).zip(pixels.chunks_exact(stride)) {
            let range = self.row_range(rect, row);
            self.data[range].copy_from_slice(src);
        }
    }
}
