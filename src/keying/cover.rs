//! Cover fitting of background images
//!
//! Fills the target box while preserving aspect ratio: the centered source
//! region with the target's aspect is cropped first and then resampled to
//! exactly the target size, so work and memory scale with the source and
//! target, never with the aspect mismatch between them.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::error::{KeyError, Result};
use crate::frame::Frame;

/// Source-space region `(x, y, width, height)` of a `src_w` x `src_h` image
/// that covers a `dst_w` x `dst_h` box once scaled.
///
/// The axis along which the source is relatively longer is trimmed to the
/// target aspect (rounded to nearest, at least 1 pixel) and centered; the
/// other axis is kept whole. Sizes must be non-zero.
pub fn cover_crop(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> (u32, u32, u32, u32) {
    let (sw, sh, dw, dh) = (src_w as u64, src_h as u64, dst_w as u64, dst_h as u64);

    // src_w / src_h > dst_w / dst_h, cross-multiplied
    if sw * dh > dw * sh {
        let w = ((sh * dw + dh / 2) / dh).clamp(1, sw) as u32;
        ((src_w - w) / 2, 0, w, src_h)
    } else {
        let h = ((sw * dh + dw / 2) / dw).clamp(1, sh) as u32;
        (0, (src_h - h) / 2, src_w, h)
    }
}

/// Fit `image` to exactly `width` x `height` using cover scaling
pub fn cover_fit(image: &RgbaImage, width: u32, height: u32) -> Result<Frame> {
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 || width == 0 || height == 0 {
        return Err(KeyError::EmptyImage);
    }

    let (crop_x, crop_y, crop_w, crop_h) = cover_crop(src_w, src_h, width, height);

    tracing::debug!(
        src_w,
        src_h,
        crop_x,
        crop_y,
        crop_w,
        crop_h,
        "cover fit to {}x{}",
        width,
        height
    );

    let region = imageops::crop_imm(image, crop_x, crop_y, crop_w, crop_h);
    let fitted = if (crop_w, crop_h) == (width, height) {
        region.to_image()
    } else {
        imageops::resize(&*region, width, height, FilterType::Triangle)
    };

    Ok(Frame::from(fitted))
}
