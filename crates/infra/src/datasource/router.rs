//! Per-tenant datasource selection.
//!
//! ## Lifecycle
//!
//! Each tenant key moves through `UNREGISTERED → REGISTERED → (REMOVED)`:
//!
//! ```text
//! change_data_source(key)
//!   ↓
//! 1. Registered already?  → reuse the cached pool
//!   ↓ no
//! 2. Ask the provider for a descriptor (none → configuration error)
//!   ↓
//! 3. Build the pool via the factory, insert-if-absent into the registry
//!   ↓
//! 4. Push `(key, pool)` onto the running task's datasource stack
//!   ↓
//! DataSourceGuard (removes that one entry when dropped)
//! ```
//!
//! ## Balance
//!
//! The push in step 4 is undone by the returned guard's `Drop`, which runs
//! whether the guarded work returns, fails, panics or is cancelled. The guard
//! removes the entry it pushed, not whatever is on top, and always from the
//! context it was pushed on, so guards dropped out of order or inside a
//! spawned task leave every other selection in place.
//!
//! ## Removal
//!
//! `remove_data_source` only evicts the registry entry. A selection carries
//! its pool, so calls already routed keep using it until they finish.

use std::future::Future;
use std::sync::Arc;

use rowgate_context::{ContextCarrier, SelectionTicket};
use rowgate_core::{GuardError, GuardResult};

use super::{DataSourceFactory, DataSourceRegistry, TenantDataSourceProvider};

/// Unselects one tenant datasource when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard immediately unselects the datasource"]
pub struct DataSourceGuard {
    ticket: SelectionTicket,
}

impl DataSourceGuard {
    pub fn tenant_key(&self) -> &str {
        self.ticket.key()
    }
}

impl Drop for DataSourceGuard {
    fn drop(&mut self) {
        if self.ticket.release() {
            tracing::trace!(tenant_key = %self.ticket.key(), "datasource unselected");
        } else {
            tracing::warn!(
                tenant_key = %self.ticket.key(),
                "datasource selection already gone when its guard was dropped"
            );
        }
    }
}

/// Routes calls to tenant-specific pools, creating them on first use.
pub struct TenantDataSourceRouter<F: DataSourceFactory> {
    provider: Arc<dyn TenantDataSourceProvider>,
    factory: F,
    registry: DataSourceRegistry<F::Pool>,
    default_pool: Option<F::Pool>,
}

impl<F: DataSourceFactory> core::fmt::Debug for TenantDataSourceRouter<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TenantDataSourceRouter")
            .field("registered", &self.registry.keys())
            .field("has_default_pool", &self.default_pool.is_some())
            .finish()
    }
}

impl<F: DataSourceFactory> TenantDataSourceRouter<F> {
    pub fn new(provider: Arc<dyn TenantDataSourceProvider>, factory: F) -> Self {
        Self {
            provider,
            factory,
            registry: DataSourceRegistry::new(),
            default_pool: None,
        }
    }

    /// Pool used when no tenant datasource is selected.
    pub fn with_default_pool(mut self, pool: F::Pool) -> Self {
        self.default_pool = Some(pool);
        self
    }

    /// Ensure `tenant_key` is registered and select it for the running task
    /// until the returned guard is dropped.
    pub async fn change_data_source(&self, tenant_key: &str) -> GuardResult<DataSourceGuard> {
        if tenant_key.trim().is_empty() {
            return Err(GuardError::invalid_config("blank tenant datasource key"));
        }
        if !ContextCarrier::is_active() {
            return Err(GuardError::NoActiveContext);
        }

        let pool = match self.registry.get(tenant_key) {
            Some(pool) => {
                tracing::debug!(tenant_key, "reusing tenant datasource");
                pool
            }
            None => {
                let descriptor = self
                    .provider
                    .get_by_tenant_id(tenant_key)
                    .await
                    .ok_or_else(|| GuardError::datasource_not_found(tenant_key))?;
                let (pool, created) = self
                    .registry
                    .get_or_try_insert_with(tenant_key, || self.factory.create(&descriptor))?;
                if created {
                    tracing::info!(tenant_key, pool_name = %descriptor.pool_name, "tenant datasource registered");
                }
                pool
            }
        };

        let ticket = ContextCarrier::select_datasource(tenant_key, Arc::new(pool))?;
        Ok(DataSourceGuard { ticket })
    }

    /// Run `fut` against `tenant_key`'s datasource. The selection is undone
    /// before the output (including an error output) reaches the caller.
    pub async fn route<Fut>(&self, tenant_key: &str, fut: Fut) -> GuardResult<Fut::Output>
    where
        Fut: Future,
    {
        let guard = self.change_data_source(tenant_key).await?;
        let output = fut.await;
        drop(guard);
        Ok(output)
    }

    pub fn remove_data_source(&self, tenant_key: &str) -> bool {
        let removed = self.registry.remove(tenant_key).is_some();
        if removed {
            tracing::info!(tenant_key, "tenant datasource removed");
        }
        removed
    }

    pub fn contains_data_source(&self, tenant_key: &str) -> bool {
        self.registry.contains(tenant_key)
    }

    pub fn pool(&self, tenant_key: &str) -> Option<F::Pool> {
        self.registry.get(tenant_key)
    }

    /// Pool for the datasource selected in the running task, falling back to
    /// the default pool when nothing is selected.
    ///
    /// The pool captured at selection time wins over the registry, so removal
    /// does not strand a call that is already routed.
    pub fn current_pool(&self) -> Option<F::Pool> {
        match ContextCarrier::current_selection() {
            Some(selection) => selection
                .pool::<F::Pool>()
                .or_else(|| self.registry.get(selection.key())),
            None => self.default_pool.clone(),
        }
    }

    pub fn registered_keys(&self) -> Vec<String> {
        self.registry.keys()
    }
}
