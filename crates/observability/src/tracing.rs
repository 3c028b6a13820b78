//! Tracing/logging initialization.
//!
//! Filtering follows `RUST_LOG` when set, otherwise the configured default
//! directive. Output is JSON unless `ROWGATE_LOG_FORMAT=plain`.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// JSON lines when true, human-readable text otherwise.
    pub json: bool,
    /// Filter used when `RUST_LOG` is absent or invalid.
    pub default_directive: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json: true,
            default_directive: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(format) = lookup("ROWGATE_LOG_FORMAT") {
            config.json = !format.trim().eq_ignore_ascii_case("plain");
        }
        if let Some(directive) = lookup("ROWGATE_LOG").filter(|v| !v.trim().is_empty()) {
            config.default_directive = directive.trim().to_string();
        }
        config
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.default_directive))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_with(config: &ObservabilityConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
