//! Per-frame keying configuration

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::class::{HueClass, Sensitivity};
use crate::error::{KeyError, Result};

/// What a class's masked output shows when it has no background image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EmptyMaskMode {
    /// Uniform opaque black
    #[default]
    Black,
    /// The unmodified camera frame
    Video,
}

impl EmptyMaskMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            EmptyMaskMode::Black => "Black screen",
            EmptyMaskMode::Video => "Pass-through video",
        }
    }
}

/// A decoded background image. Immutable once loaded; share it with `Arc`.
#[derive(Debug)]
pub struct BackgroundImage {
    image: RgbaImage,
    label: String,
}

impl BackgroundImage {
    /// Decode an image file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(KeyError::EmptyImage);
        }
        tracing::info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "Loaded background image"
        );
        Ok(Self {
            image,
            label: path.display().to_string(),
        })
    }

    /// Wrap an already decoded image
    pub fn from_rgba(image: RgbaImage, label: impl Into<String>) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(KeyError::EmptyImage);
        }
        Ok(Self {
            image,
            label: label.into(),
        })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Settings of a single hue class
#[derive(Debug, Clone, Default)]
pub struct ClassConfig {
    pub sensitivity: Sensitivity,
    pub background: Option<Arc<BackgroundImage>>,
}

/// Complete configuration for one compositing pass
#[derive(Debug, Clone, Default)]
pub struct KeyConfig {
    classes: [ClassConfig; 3],
    pub empty_mask: EmptyMaskMode,
}

impl KeyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(&self, class: HueClass) -> &ClassConfig {
        &self.classes[class.index()]
    }

    pub fn class_mut(&mut self, class: HueClass) -> &mut ClassConfig {
        &mut self.classes[class.index()]
    }

    pub fn sensitivity(&self, class: HueClass) -> Sensitivity {
        self.class(class).sensitivity
    }

    pub fn background(&self, class: HueClass) -> Option<&Arc<BackgroundImage>> {
        self.class(class).background.as_ref()
    }

    pub fn set_sensitivity(&mut self, class: HueClass, sensitivity: Sensitivity) {
        self.class_mut(class).sensitivity = sensitivity;
    }

    pub fn set_background(&mut self, class: HueClass, background: Option<Arc<BackgroundImage>>) {
        self.class_mut(class).background = background;
    }

    /// Builder-style sensitivity setter
    pub fn with_sensitivity(
        mut self,
        class: HueClass,
        sensitivity: impl Into<Sensitivity>,
    ) -> Self {
        self.set_sensitivity(class, sensitivity.into());
        self
    }

    /// Builder-style background setter
    pub fn with_background(mut self, class: HueClass, background: Arc<BackgroundImage>) -> Self {
        self.set_background(class, Some(background));
        self
    }

    pub fn with_empty_mask(mut self, mode: EmptyMaskMode) -> Self {
        self.empty_mask = mode;
        self
    }
}
