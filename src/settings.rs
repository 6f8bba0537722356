//! Settings for hue-key
//!
//! Loads `.huekey` XML files describing the capture setup and per-class keying
//! parameters. Settings are read-only: the tool never writes them back.

use quick_xml::de::from_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::camera::CaptureResolution;
use crate::keying::{BackgroundImage, EmptyMaskMode, HueClass, KeyConfig, Sensitivity};
use crate::output::OutputLayout;

/// Capture size preset as written in settings files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum CapturePreset {
    /// 1080x1440 portrait
    #[default]
    PortraitHd,
    /// 640x480
    Standard,
    /// Use `captureWidth` / `captureHeight`
    Custom,
}

/// Keying parameters of one hue class
#[derive(Debug, Clone, Deserialize)]
pub struct ClassSettings {
    /// Sensitivity (0-100, default 50)
    #[serde(rename = "sensitivity", default = "default_sensitivity")]
    pub sensitivity: u32,

    /// Background image composited over the class
    #[serde(rename = "background", default)]
    pub background: Option<PathBuf>,
}

fn default_sensitivity() -> u32 {
    Sensitivity::default().value() as u32
}

impl Default for ClassSettings {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            background: None,
        }
    }
}

/// Session settings stored in `.huekey` files
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "HueKeySettings")]
pub struct KeySettings {
    /// Target frame rate (1-240)
    #[serde(rename = "targetFps", default = "default_target_fps")]
    pub target_fps: u32,

    /// Index of the capture device
    #[serde(rename = "cameraIndex", default)]
    pub camera_index: u32,

    #[serde(rename = "capturePreset", default)]
    pub capture_preset: CapturePreset,

    /// Only used with the `Custom` preset
    #[serde(rename = "captureWidth", default = "default_capture_width")]
    pub capture_width: u32,

    #[serde(rename = "captureHeight", default = "default_capture_height")]
    pub capture_height: u32,

    /// What masked views show for classes without a background
    #[serde(rename = "emptyMask", default)]
    pub empty_mask: EmptyMaskMode,

    /// Which rasters are written per frame
    #[serde(rename = "outputLayout", default)]
    pub output_layout: OutputLayout,

    #[serde(rename = "blue", default)]
    pub blue: ClassSettings,

    #[serde(rename = "red", default)]
    pub red: ClassSettings,

    #[serde(rename = "yellow", default)]
    pub yellow: ClassSettings,
}

fn default_target_fps() -> u32 {
    30
}

fn default_capture_width() -> u32 {
    1080
}

fn default_capture_height() -> u32 {
    1440
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            camera_index: 0,
            capture_preset: CapturePreset::default(),
            capture_width: default_capture_width(),
            capture_height: default_capture_height(),
            empty_mask: EmptyMaskMode::default(),
            output_layout: OutputLayout::default(),
            blue: ClassSettings::default(),
            red: ClassSettings::default(),
            yellow: ClassSettings::default(),
        }
    }
}

impl KeySettings {
    /// Parse settings from an XML document
    pub fn from_xml(contents: &str) -> Result<Self, SettingsError> {
        let mut settings: Self = from_str(contents).map_err(SettingsError::XmlParse)?;
        settings.clamp();
        Ok(settings)
    }

    /// Load settings from a `.huekey` XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let settings = Self::from_xml(&contents)?;
        tracing::info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Bring every value into its valid range
    pub fn clamp(&mut self) {
        self.target_fps = self.target_fps.clamp(1, 240);
        self.capture_width = self.capture_width.max(1);
        self.capture_height = self.capture_height.max(1);
        for class in HueClass::ALL {
            let settings = self.class_mut(class);
            settings.sensitivity = settings.sensitivity.min(Sensitivity::MAX as u32);
        }
    }

    pub fn class(&self, class: HueClass) -> &ClassSettings {
        match class {
            HueClass::Blue => &self.blue,
            HueClass::Red => &self.red,
            HueClass::Yellow => &self.yellow,
        }
    }

    pub fn class_mut(&mut self, class: HueClass) -> &mut ClassSettings {
        match class {
            HueClass::Blue => &mut self.blue,
            HueClass::Red => &mut self.red,
            HueClass::Yellow => &mut self.yellow,
        }
    }

    pub fn capture_resolution(&self) -> CaptureResolution {
        match self.capture_preset {
            CapturePreset::PortraitHd => CaptureResolution::PortraitHd,
            CapturePreset::Standard => CaptureResolution::Standard,
            CapturePreset::Custom => CaptureResolution::Custom {
                width: self.capture_width,
                height: self.capture_height,
            },
        }
    }

    /// Build a keying configuration, decoding every configured background
    pub fn key_config(&self) -> crate::Result<KeyConfig> {
        let mut config = KeyConfig::new().with_empty_mask(self.empty_mask);
        for class in HueClass::ALL {
            let settings = self.class(class);
            config.set_sensitivity(class, Sensitivity::saturating(settings.sensitivity as i64));
            if let Some(path) = &settings.background {
                config.set_background(class, Some(Arc::new(BackgroundImage::open(path)?)));
            }
        }
        Ok(config)
    }
}

/// Settings-related errors
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    XmlParse(quick_xml::DeError),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::XmlParse(e) => write!(f, "XML parse error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}
