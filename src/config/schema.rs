//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::{ClosePolicy, SignalKind};

/// Root configuration for a graceful shutdown setup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Cross-signal close policy (`async`, `sync`, `force-sync`).
    pub policy: ClosePolicy,

    /// OS signals that trigger shutdown.
    pub signals: Vec<SignalKind>,

    /// Stop-context deadline for each terminate signal in milliseconds (0 = none).
    pub timeout_ms: u64,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl ShutdownConfig {
    /// The per-signal timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            policy: ClosePolicy::Async,
            signals: SignalKind::DEFAULT.to_vec(),
            timeout_ms: 0,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (e.g. "info" or "graceful_shutdown=debug").
    /// `RUST_LOG` takes precedence when set.
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
