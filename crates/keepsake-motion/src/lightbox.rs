#![forbid(unsafe_code)]

//! Gallery lightbox with wraparound navigation.
//!
//! The navigator owns only the open index. Opening, navigating and closing
//! queue [`LightboxEvent`]s that the caller drains after each input; the page
//! turns `Opened`/`Closed` into scroll-lock acquire/release.

use keepsake_core::event::{KeyCode, KeyEvent};
use serde::{Deserialize, Serialize};

/// One gallery entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    /// Caption shown under the enlarged visual.
    pub caption: String,
    /// Opaque visual reference (emoji, URL, asset id).
    pub visual: String,
}

impl GalleryItem {
    pub fn new(caption: impl Into<String>, visual: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            visual: visual.into(),
        }
    }
}

/// Output of the navigator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LightboxEvent {
    /// The modal now shows `item` at `index`. Also emitted on navigation.
    Opened { index: usize, item: GalleryItem },
    /// The modal was dismissed.
    Closed,
}

/// Open/close and prev/next over an immutable gallery.
#[derive(Debug, Clone, Default)]
pub struct LightboxNavigator {
    items: Vec<GalleryItem>,
    open_index: Option<usize>,
    events: Vec<LightboxEvent>,
}

impl LightboxNavigator {
    #[must_use]
    pub fn new(items: Vec<GalleryItem>) -> Self {
        Self {
            items,
            open_index: None,
            events: Vec::new(),
        }
    }

    /// Gallery contents.
    #[must_use]
    pub fn items(&self) -> &[GalleryItem] {
        &self.items
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open_index.is_some()
    }

    #[must_use]
    pub fn open_index(&self) -> Option<usize> {
        self.open_index
    }

    /// Open at `index`, wrapped modulo the gallery length in both directions.
    ///
    /// No-op on an empty gallery.
    pub fn open(&mut self, index: isize) {
        let len = self.items.len();
        if len == 0 {
            keepsake_core::debug!("lightbox open ignored: empty gallery");
            return;
        }
        // len fits isize: a Vec never holds more than isize::MAX elements.
        let wrapped = index.rem_euclid(len as isize) as usize;
        self.open_index = Some(wrapped);
        keepsake_core::debug!(requested = index, index = wrapped, "lightbox opened");
        self.events.push(LightboxEvent::Opened {
            index: wrapped,
            item: self.items[wrapped].clone(),
        });
    }

    /// Close the modal. No-op when already closed.
    pub fn close(&mut self) {
        if self.open_index.take().is_some() {
            keepsake_core::debug!("lightbox closed");
            self.events.push(LightboxEvent::Closed);
        }
    }

    /// Show the previous item. No-op when closed.
    pub fn prev(&mut self) {
        if let Some(i) = self.open_index {
            self.open(i as isize - 1);
        }
    }

    /// Show the next item. No-op when closed.
    pub fn next(&mut self) {
        if let Some(i) = self.open_index {
            self.open(i as isize + 1);
        }
    }

    /// Route a key press. Returns `true` if the key was consumed.
    ///
    /// Escape, Left and Right only act while the modal is open.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if !self.is_open() || !key.is_press() {
            return false;
        }
        match key.code {
            KeyCode::Escape => self.close(),
            KeyCode::Left => self.prev(),
            KeyCode::Right => self.next(),
            _ => return false,
        }
        true
    }

    /// Keyboard activation on a focused gallery item. Enter or Space opens it.
    pub fn activate_item(&mut self, index: usize, key: &KeyEvent) -> bool {
        if !key.is_press() || !key.is_activation() || index >= self.items.len() {
            return false;
        }
        self.open(index as isize);
        true
    }

    /// Take queued events in emission order.
    pub fn drain_events(&mut self) -> Vec<LightboxEvent> {
        std::mem::take(&mut self.events)
    }
}
