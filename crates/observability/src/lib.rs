//! Tracing/logging setup shared by the guard binaries.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::ObservabilityConfig;

/// Initialize process-wide tracing with defaults read from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with(&ObservabilityConfig::from_env());
}

/// Initialize process-wide tracing with an explicit configuration.
pub fn init_with(config: &ObservabilityConfig) {
    tracing::init_with(config);
}
