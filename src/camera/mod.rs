//! Camera capture
//!
//! Resolution presets are always available (settings refer to them); the
//! capture itself needs the `camera` feature.

#[cfg(feature = "camera")]
mod capture;

#[cfg(feature = "camera")]
pub use capture::{list_cameras, CameraCapture, CameraInfo};

/// Requested capture size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureResolution {
    /// 1080x1440, portrait orientation
    #[default]
    PortraitHd,
    /// 640x480
    Standard,
    Custom { width: u32, height: u32 },
}

impl CaptureResolution {
    /// Requested width and height in pixels
    pub fn size(&self) -> (u32, u32) {
        match *self {
            CaptureResolution::PortraitHd => (1080, 1440),
            CaptureResolution::Standard => (640, 480),
            CaptureResolution::Custom { width, height } => (width.max(1), height.max(1)),
        }
    }

    pub fn display_name(&self) -> String {
        let (w, h) = self.size();
        match self {
            CaptureResolution::PortraitHd => format!("Portrait HD ({}x{})", w, h),
            CaptureResolution::Standard => format!("Standard ({}x{})", w, h),
            CaptureResolution::Custom { .. } => format!("Custom ({}x{})", w, h),
        }
    }
}
