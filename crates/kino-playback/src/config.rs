//! Normalizer configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default debounce window before a zero-rate stall is reported as buffering
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

/// Normalizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Debounce window in milliseconds
    pub debounce_ms: u64,
}

impl NormalizerConfig {
    pub fn with_debounce_ms(debounce_ms: u64) -> Self {
        Self { debounce_ms }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Check the configuration before wiring a normalizer to an engine
    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(Error::InvalidConfig(
                "debounce window must be at least 1ms".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}
