//! Media element attribute access
//!
//! The normalizer pulls the engine's instantaneous attributes at the moment a
//! handler runs. Nothing is cached between events.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Live attributes of the observed media engine
pub trait MediaElement {
    /// Current playback rate, never negative
    fn playback_rate(&self) -> f64;

    fn paused(&self) -> bool;

    fn seeking(&self) -> bool;
}

/// Plain attribute values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSnapshot {
    pub playback_rate: f64,
    pub paused: bool,
    pub seeking: bool,
}

impl Default for ElementSnapshot {
    fn default() -> Self {
        Self {
            playback_rate: 1.0,
            paused: true,
            seeking: false,
        }
    }
}

impl MediaElement for ElementSnapshot {
    fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn seeking(&self) -> bool {
        self.seeking
    }
}

/// Partial update applied to an element's attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    pub playback_rate: Option<f64>,
    pub paused: Option<bool>,
    pub seeking: Option<bool>,
}

impl ElementSnapshot {
    /// Apply a patch, clamping the rate to zero or above
    pub fn apply(&mut self, patch: ElementPatch) {
        if let Some(rate) = patch.playback_rate {
            self.playback_rate = rate.max(0.0);
        }
        if let Some(paused) = patch.paused {
            self.paused = paused;
        }
        if let Some(seeking) = patch.seeking {
            self.seeking = seeking;
        }
    }
}

/// Thread-safe element handle.
///
/// The host keeps one clone to update attributes as the engine changes while
/// the normalizer reads through another.
#[derive(Debug, Clone, Default)]
pub struct SharedElement {
    inner: Arc<RwLock<ElementSnapshot>>,
}

impl SharedElement {
    pub fn new(snapshot: ElementSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> ElementSnapshot {
        *self.inner.read()
    }

    pub fn set_playback_rate(&self, rate: f64) {
        self.inner.write().playback_rate = rate.max(0.0);
    }

    pub fn set_paused(&self, paused: bool) {
        self.inner.write().paused = paused;
    }

    pub fn set_seeking(&self, seeking: bool) {
        self.inner.write().seeking = seeking;
    }

    pub fn apply(&self, patch: ElementPatch) {
        self.inner.write().apply(patch);
    }
}

impl MediaElement for SharedElement {
    fn playback_rate(&self) -> f64 {
        self.inner.read().playback_rate
    }

    fn paused(&self) -> bool {
        self.inner.read().paused
    }

    fn seeking(&self) -> bool {
        self.inner.read().seeking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_element_updates_are_visible() {
        let host = SharedElement::default();
        let reader = host.clone();

        host.set_playback_rate(0.0);
        host.set_seeking(true);

        assert_eq!(reader.playback_rate(), 0.0);
        assert!(reader.seeking());
        assert!(reader.paused());
    }

    #[test]
    fn test_patch_clamps_negative_rate() {
        let mut snapshot = ElementSnapshot::default();
        snapshot.apply(ElementPatch {
            playback_rate: Some(-2.0),
            paused: Some(false),
            ..Default::default()
        });
        assert_eq!(snapshot.playback_rate, 0.0);
        assert!(!snapshot.paused);
        assert!(!snapshot.seeking);
    }

    #[test]
    fn test_snapshot_deserializes_with_defaults() {
        let snapshot: ElementSnapshot = serde_json::from_str(r#"{"playback_rate": 0.0}"#).unwrap();
        assert_eq!(snapshot.playback_rate, 0.0);
        assert!(snapshot.paused);
    }
}
