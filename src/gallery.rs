//! Per-class background galleries
//!
//! Each hue class keeps an ordered list of candidate backgrounds and at most
//! one selected entry, which is what gets composited.

use std::sync::Arc;

use crate::keying::BackgroundImage;

/// Ordered background candidates with an optional selection
#[derive(Debug, Default, Clone)]
pub struct BackgroundGallery {
    images: Vec<Arc<BackgroundImage>>,
    selected: Option<usize>,
}

impl BackgroundGallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image and select it; returns its index
    pub fn add(&mut self, image: Arc<BackgroundImage>) -> usize {
        self.images.push(image);
        let index = self.images.len() - 1;
        self.selected = Some(index);
        index
    }

    /// Remove the entry at `index`
    ///
    /// Removing the selected entry clears the selection; removing an earlier
    /// entry keeps the same image selected.
    pub fn remove(&mut self, index: usize) -> Option<Arc<BackgroundImage>> {
        if index >= self.images.len() {
            return None;
        }
        let removed = self.images.remove(index);
        self.selected = match self.selected {
            Some(sel) if sel == index => None,
            Some(sel) if sel > index => Some(sel - 1),
            other => other,
        };
        Some(removed)
    }

    /// Select the entry at `index`; returns false if out of range
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.images.len() {
            self.selected = Some(index);
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Currently selected image
    pub fn selected(&self) -> Option<&Arc<BackgroundImage>> {
        self.selected.and_then(|idx| self.images.get(idx))
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
