//! Configuration shared between the control side and the frame loop

use std::sync::Arc;

use parking_lot::Mutex;

use super::class::{HueClass, Sensitivity};
use super::config::{BackgroundImage, EmptyMaskMode, KeyConfig};

/// Thread-safe handle to the live keying configuration
///
/// Writers replace the whole configuration copy-on-write; the frame loop takes
/// one snapshot per frame so a change lands between frames, never mid-frame.
#[derive(Clone, Default)]
pub struct SharedKeyConfig {
    inner: Arc<Mutex<Arc<KeyConfig>>>,
}

impl SharedKeyConfig {
    pub fn new(config: KeyConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Arc::new(config))),
        }
    }

    /// Configuration as of now
    pub fn snapshot(&self) -> Arc<KeyConfig> {
        self.inner.lock().clone()
    }

    /// Apply an arbitrary edit
    pub fn update(&self, edit: impl FnOnce(&mut KeyConfig)) {
        let mut guard = self.inner.lock();
        edit(Arc::make_mut(&mut guard));
    }

    pub fn set_sensitivity(&self, class: HueClass, sensitivity: Sensitivity) {
        tracing::debug!(
            class = %class,
            sensitivity = sensitivity.value(),
            threshold = sensitivity.threshold(),
            "Sensitivity changed"
        );
        self.update(|config| config.set_sensitivity(class, sensitivity));
    }

    pub fn set_background(&self, class: HueClass, background: Option<Arc<BackgroundImage>>) {
        tracing::debug!(
            class = %class,
            background = background.as_ref().map(|b| b.label()).unwrap_or("none"),
            "Background changed"
        );
        self.update(|config| config.set_background(class, background));
    }

    pub fn set_empty_mask(&self, mode: EmptyMaskMode) {
        self.update(|config| config.empty_mask = mode);
    }
}

impl std::fmt::Debug for SharedKeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedKeyConfig").field(&self.snapshot()).finish()
    }
}
