//! Hue keying
//!
//! Classifies camera pixels into blue, red and yellow classes and composites
//! per-class background images over the matching regions.

mod class;
mod compositor;
mod config;
mod cover;
mod shared;

pub use class::{HueClass, Sensitivity};
pub use compositor::{composite, Compositor, KeyOutputs};
pub use config::{BackgroundImage, ClassConfig, EmptyMaskMode, KeyConfig};
pub use cover::{cover_crop, cover_fit};
pub use shared::SharedKeyConfig;
