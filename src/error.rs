//! Error types shared across the crate

use thiserror::Error;

use crate::settings::SettingsError;

/// Errors produced by the keying pipeline and its collaborators
#[derive(Debug, Error)]
pub enum KeyError {
    /// A processing cycle was requested with no frame source attached
    #[error("no active frame source")]
    NoFrameSource,

    /// Two rasters taking part in the same pass disagree on size
    #[error("frame size mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    /// Pixel buffer length does not match `width * height * 4`
    #[error("invalid RGBA buffer for {width}x{height}: got {len} bytes")]
    InvalidFrame { width: u32, height: u32, len: usize },

    /// An image or target box with a zero dimension
    #[error("image has zero width or height")]
    EmptyImage,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("camera error: {0}")]
    Camera(String),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
}

pub type Result<T> = std::result::Result<T, KeyError>;
