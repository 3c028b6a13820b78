use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use rowgate_core::TenantContext;
use rowgate_sql::{Column, Expr, and};

use crate::config::TenantIsolationConfig;

/// Appends `tenant_column = <active tenant>` to statements on tenant-guarded
/// tables.
///
/// Nothing is added when the request carries no tenant, when the table is in
/// the ignore list, or when the active tenant is the super tenant. The
/// predicate is always ANDed: it narrows whatever other filter is in place,
/// including a data-scope predicate.
#[derive(Debug, Clone)]
pub struct TenantLineFilter {
    config: Arc<TenantIsolationConfig>,
}

impl TenantLineFilter {
    pub fn new(config: Arc<TenantIsolationConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TenantIsolationConfig {
        &self.config
    }

    /// Active tenant id as a literal, or `None` when no tenant is active.
    pub fn tenant_predicate_value(&self, tenant: &TenantContext) -> Option<Expr> {
        tenant.tenant_id().map(|id| Expr::int(id.get()))
    }

    pub fn should_ignore(&self, table: &str, tenant: &TenantContext) -> bool {
        if self.config.is_ignored_table(table) {
            return true;
        }
        tenant
            .tenant_id()
            .is_some_and(|id| self.config.is_super_tenant(id))
    }

    pub fn tenant_column_name(&self) -> &str {
        &self.config.tenant_id_column
    }

    /// The predicate for `table` (referenced as `alias` when given), if one applies.
    pub fn predicate(&self, table: &str, alias: Option<&str>, tenant: &TenantContext) -> Option<Expr> {
        if self.should_ignore(table, tenant) {
            tracing::trace!(table, tenant_id = ?tenant.tenant_id(), "tenant line skipped");
            return None;
        }
        let value = self.tenant_predicate_value(tenant)?;
        let column = Column::qualified(alias.unwrap_or_default(), self.tenant_column_name().to_string());
        Some(Expr::equals(Expr::column(column), value))
    }

    /// AND the tenant predicate into `existing`.
    pub fn apply(
        &self,
        existing: Option<Expr>,
        table: &str,
        alias: Option<&str>,
        tenant: &TenantContext,
    ) -> Option<Expr> {
        match (existing, self.predicate(table, alias, tenant)) {
            (Some(existing), Some(predicate)) => Some(and(existing, predicate)),
            (existing, predicate) => existing.or(predicate),
        }
    }

    /// Fill the tenant column of an insert's parameter map when the caller did
    /// not set it. Returns whether the map was changed.
    pub fn inject_insert(
        &self,
        params: &mut Map<String, JsonValue>,
        table: &str,
        tenant: &TenantContext,
    ) -> bool {
        let Some(tenant_id) = tenant.tenant_id() else {
            return false;
        };
        if self.should_ignore(table, tenant) {
            return false;
        }
        let column = self.tenant_column_name();
        match params.get(column) {
            Some(v) if !v.is_null() => false,
            _ => {
                params.insert(column.to_string(), JsonValue::from(tenant_id.get()));
                tracing::trace!(table, %tenant_id, "tenant id injected into insert");
                true
            }
        }
    }
}
