//! RGBA8 frame raster
//!
//! Every buffer that flows through the keyer (camera frames, fitted
//! backgrounds, detection and masked outputs) is a `Frame`: tightly packed,
//! row-major RGBA with 4 bytes per pixel.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::error::{KeyError, Result};

/// Bytes per RGBA pixel
pub const CHANNELS: usize = 4;

/// RGBA frame data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// RGBA pixel data
    pub data: Vec<u8>,
}

impl Frame {
    /// Wrap an existing RGBA buffer, checking its length
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != byte_len(width, height) {
            return Err(KeyError::InvalidFrame {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// A frame with every pixel set to `rgba`
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self { width, height, data }
    }

    /// Fully transparent black frame
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; byte_len(width, height)],
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGBA of the pixel at (x, y), `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let px = &self.data[idx..idx + CHANNELS];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Overwrite the pixel at (x, y); out-of-range writes are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[idx..idx + CHANNELS].copy_from_slice(&rgba);
    }

    /// Resize in place to `width` x `height`, keeping the allocation when possible.
    /// Contents are unspecified afterwards; callers overwrite every pixel.
    pub fn reshape(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.resize(byte_len(width, height), 0);
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn into_image(self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data)
    }

    /// Stretch to exactly `width` x `height` with a triangle filter
    pub fn resample(self, width: u32, height: u32) -> Result<Self> {
        if self.dimensions() == (width, height) {
            return Ok(self);
        }
        if self.is_empty() || width == 0 || height == 0 {
            return Err(KeyError::EmptyImage);
        }
        let (src_w, src_h, len) = (self.width, self.height, self.data.len());
        let image = self.into_image().ok_or(KeyError::InvalidFrame {
            width: src_w,
            height: src_h,
            len,
        })?;
        Ok(Self::from(imageops::resize(&image, width, height, FilterType::Triangle)))
    }
}

impl From<RgbaImage> for Frame {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

pub(crate) fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}
