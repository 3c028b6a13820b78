use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use rowgate_core::{GuardError, GuardResult};

/// Connection settings for one tenant's physical datasource.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantDataSourceDescriptor {
    pub pool_name: String,
    #[serde(alias = "driver_class_name")]
    pub driver: String,
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

impl core::fmt::Debug for TenantDataSourceDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TenantDataSourceDescriptor")
            .field("pool_name", &self.pool_name)
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Supplies datasource descriptors by tenant key. Implemented by the
/// embedding application (often backed by a tenant table).
#[async_trait]
pub trait TenantDataSourceProvider: Send + Sync {
    async fn get_by_tenant_id(&self, tenant_key: &str) -> Option<TenantDataSourceDescriptor>;
}

#[async_trait]
impl<P> TenantDataSourceProvider for Arc<P>
where
    P: TenantDataSourceProvider + ?Sized,
{
    async fn get_by_tenant_id(&self, tenant_key: &str) -> Option<TenantDataSourceDescriptor> {
        (**self).get_by_tenant_id(tenant_key).await
    }
}

/// In-memory descriptor table for tests/dev and env-driven deployments.
#[derive(Debug, Default)]
pub struct StaticDataSourceProvider {
    inner: RwLock<HashMap<String, TenantDataSourceDescriptor>>,
}

impl StaticDataSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object mapping tenant key → descriptor.
    pub fn from_json(raw: &str) -> GuardResult<Self> {
        let map: HashMap<String, TenantDataSourceDescriptor> = serde_json::from_str(raw)
            .map_err(|e| GuardError::invalid_config(format!("tenant datasources: {e}")))?;
        Ok(Self {
            inner: RwLock::new(map),
        })
    }

    pub fn insert(&self, tenant_key: impl Into<String>, descriptor: TenantDataSourceDescriptor) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant_key.into(), descriptor);
    }

    pub fn remove(&self, tenant_key: &str) -> Option<TenantDataSourceDescriptor> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tenant_key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TenantDataSourceProvider for StaticDataSourceProvider {
    async fn get_by_tenant_id(&self, tenant_key: &str) -> Option<TenantDataSourceDescriptor> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant_key)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "5": {
            "pool_name": "tenant-5",
            "driver_class_name": "com.mysql.cj.jdbc.Driver",
            "url": "mysql://db5:3306/app",
            "username": "app",
            "password": "s3cret"
        }
    }"#;

    #[tokio::test]
    async fn static_provider_serves_parsed_descriptors() {
        let provider = StaticDataSourceProvider::from_json(JSON).unwrap();
        let d = provider.get_by_tenant_id("5").await.unwrap();
        assert_eq!(d.pool_name, "tenant-5");
        assert_eq!(d.driver, "com.mysql.cj.jdbc.Driver");
        assert!(provider.get_by_tenant_id("6").await.is_none());
    }

    #[test]
    fn debug_output_redacts_password() {
        let provider = StaticDataSourceProvider::from_json(JSON).unwrap();
        let rendered = format!("{provider:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let err = StaticDataSourceProvider::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, GuardError::InvalidConfig(_)));
    }
}
