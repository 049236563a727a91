//! Runtime Configuration
//!
//! Configuration is per thread, matching the single-threaded execution model
//! of the proxy layer. A config is installed once (typically at startup) and
//! read by the diagnostics paths.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

thread_local! {
    static DEV_WARNINGS: Cell<bool> = Cell::new(ReactiveConfig::default().dev_warnings);
}

/// Settings for the reactive layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactiveConfig {
    /// Emit `tracing` warnings for readonly writes and unwrappable targets.
    pub dev_warnings: bool,
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            dev_warnings: cfg!(debug_assertions),
        }
    }
}

impl ReactiveConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Make this config active for the current thread.
    pub fn install(self) {
        DEV_WARNINGS.with(|flag| flag.set(self.dev_warnings));
    }

    /// The config active on the current thread.
    pub fn current() -> Self {
        Self {
            dev_warnings: dev_warnings(),
        }
    }
}

/// Whether diagnostics should be emitted.
pub(crate) fn dev_warnings() -> bool {
    DEV_WARNINGS.with(Cell::get)
}
