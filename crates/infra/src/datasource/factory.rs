use std::time::Duration;

use core::str::FromStr;
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};

use rowgate_core::{GuardError, GuardResult};

use super::TenantDataSourceDescriptor;

/// Builds a physical pool from a descriptor. Pooling internals stay behind
/// this seam.
pub trait DataSourceFactory: Send + Sync {
    type Pool: Clone + Send + Sync + 'static;

    fn create(&self, descriptor: &TenantDataSourceDescriptor) -> GuardResult<Self::Pool>;
}

/// `sqlx` MySQL pools that connect on first use.
///
/// Must be called from within a Tokio runtime.
#[derive(Debug, Clone)]
pub struct SqlxPoolFactory {
    max_connections: u32,
    acquire_timeout: Duration,
}

impl Default for SqlxPoolFactory {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl SqlxPoolFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    fn connect_options(descriptor: &TenantDataSourceDescriptor) -> GuardResult<MySqlConnectOptions> {
        if !descriptor.driver.to_ascii_lowercase().contains("mysql") {
            return Err(GuardError::invalid_config(format!(
                "pool '{}': unsupported driver '{}'",
                descriptor.pool_name, descriptor.driver
            )));
        }
        let url = descriptor
            .url
            .strip_prefix("jdbc:")
            .unwrap_or(&descriptor.url);
        let options = MySqlConnectOptions::from_str(url)
            .map_err(|e| GuardError::datasource_creation(&descriptor.pool_name, e.to_string()))?;
        Ok(options
            .username(&descriptor.username)
            .password(&descriptor.password))
    }
}

impl DataSourceFactory for SqlxPoolFactory {
    type Pool = MySqlPool;

    fn create(&self, descriptor: &TenantDataSourceDescriptor) -> GuardResult<Self::Pool> {
        let options = Self::connect_options(descriptor)?;
        let pool = MySqlPoolOptions::new()
            .max_connections(descriptor.max_connections.unwrap_or(self.max_connections))
            .acquire_timeout(self.acquire_timeout)
            .connect_lazy_with(options);
        tracing::info!(pool_name = %descriptor.pool_name, "tenant pool created");
        Ok(pool)
    }
}
