//! hue-key
//!
//! Real-time color keying for camera feeds: pixels are classified as blue,
//! red or yellow, and each class can have its own replacement background.
//! Produces per-class detection and masked views plus one combined composite.

pub mod camera;
pub mod error;
pub mod frame;
pub mod gallery;
pub mod keying;
pub mod output;
pub mod session;
pub mod settings;
pub mod source;
pub mod telemetry;

pub use camera::CaptureResolution;
pub use error::{KeyError, Result};
pub use frame::Frame;
pub use gallery::BackgroundGallery;
pub use keying::{
    composite, BackgroundImage, Compositor, EmptyMaskMode, HueClass, KeyConfig, KeyOutputs,
    Sensitivity, SharedKeyConfig,
};
pub use output::{FrameSink, OutputLayout, PngSequenceSink};
pub use session::{CycleOutcome, KeySession, SessionStats};
pub use settings::{KeySettings, SettingsError};
pub use source::{FrameSource, ImageSequence};
