use std::sync::Arc;

use rowgate_core::{TenantContext, TenantId, UserContext};

use crate::selection::{DataSourceSelection, PoolHandle, SelectionStack, SelectionTicket};

/// Identity of one logical request plus its datasource-selection stack.
///
/// Tenant and user are immutable once built. The datasource stack belongs to
/// this context instance; cloning a context (which is what propagation into
/// spawned work does) copies the stack, so the copy can push and pop without
/// affecting the original. A [`SelectionTicket`] always releases on the
/// instance that issued it.
#[derive(Debug)]
pub struct RequestContext {
    tenant: TenantContext,
    user: Option<Arc<UserContext>>,
    data_scope_enabled: bool,
    datasources: SelectionStack,
}

impl RequestContext {
    pub fn new(tenant: TenantContext) -> Self {
        Self {
            tenant,
            user: None,
            data_scope_enabled: true,
            datasources: SelectionStack::default(),
        }
    }

    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self::new(TenantContext::from(tenant_id))
    }

    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = Some(Arc::new(user));
        self
    }

    pub fn with_shared_user(mut self, user: Option<Arc<UserContext>>) -> Self {
        self.user = user;
        self
    }

    /// Whether the user provider asked for data-scope filtering on this request.
    pub fn with_data_scope(mut self, enabled: bool) -> Self {
        self.data_scope_enabled = enabled;
        self
    }

    pub fn tenant(&self) -> TenantContext {
        self.tenant
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant.tenant_id()
    }

    pub fn user(&self) -> Option<&UserContext> {
        self.user.as_deref()
    }

    pub fn shared_user(&self) -> Option<Arc<UserContext>> {
        self.user.clone()
    }

    pub fn data_scope_enabled(&self) -> bool {
        self.data_scope_enabled
    }

    pub fn push_datasource(&self, key: impl Into<String>) -> SelectionTicket {
        self.datasources.push(key.into(), None)
    }

    /// Push `key` together with the pool it resolved to, so later statements
    /// keep that pool even if the key is deregistered meanwhile.
    pub fn select_datasource(&self, key: impl Into<String>, pool: PoolHandle) -> SelectionTicket {
        self.datasources.push(key.into(), Some(pool))
    }

    pub fn pop_datasource(&self) -> Option<String> {
        self.datasources.pop().map(|s| s.key().to_string())
    }

    /// Key on top of the selection stack, i.e. the datasource statements
    /// issued right now should run against.
    pub fn current_datasource(&self) -> Option<String> {
        self.current_selection().map(|s| s.key().to_string())
    }

    pub fn current_selection(&self) -> Option<DataSourceSelection> {
        self.datasources.top()
    }

    pub fn datasource_depth(&self) -> usize {
        self.datasources.len()
    }

    /// Snapshot of the stack, bottom first.
    pub fn datasource_stack(&self) -> Vec<String> {
        self.datasources.keys()
    }
}

impl Clone for RequestContext {
    fn clone(&self) -> Self {
        Self {
            tenant: self.tenant,
            user: self.user.clone(),
            data_scope_enabled: self.data_scope_enabled,
            datasources: self.datasources.snapshot(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(TenantContext::none())
    }
}
