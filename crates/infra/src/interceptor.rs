//! The hook the persistence layer calls before executing a statement.
//!
//! The caller describes the statement (kind, table, alias, current filter,
//! parameters); the interceptor rewrites the filter and, for inserts, the
//! parameter map in place. Data scope runs first, tenant line second, so the
//! tenant predicate always narrows whatever the data scope allowed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use rowgate_auth::{GuardedEntityDescriptor, apply_data_scope};
use rowgate_context::{ContextCarrier, RequestContext};
use rowgate_core::{GuardError, GuardResult};
use rowgate_sql::Expr;

use crate::config::{GuardConfig, IsolationLevel};
use crate::tenant::TenantLineFilter;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// A statement as seen at interception time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptedStatement {
    pub kind: StatementKind,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Expr>,
    /// Present when the statement targets a data-scoped entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_scope: Option<GuardedEntityDescriptor>,
    #[serde(default)]
    pub params: Map<String, JsonValue>,
    #[serde(default)]
    pub ignore_tenant_line: bool,
}

impl InterceptedStatement {
    pub fn new(kind: StatementKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            alias: None,
            filter: None,
            data_scope: None,
            params: Map::new(),
            ignore_tenant_line: false,
        }
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Select, table)
    }

    pub fn insert(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Insert, table)
    }

    pub fn update(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Update, table)
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Delete, table)
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_data_scope(mut self, descriptor: GuardedEntityDescriptor) -> Self {
        self.data_scope = Some(descriptor);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Exempt this statement from the tenant line filter. Data scope still applies.
    pub fn ignore_tenant_line(mut self) -> Self {
        self.ignore_tenant_line = true;
        self
    }

    /// Rendered filter, without the `WHERE` keyword.
    pub fn where_clause(&self) -> Option<String> {
        self.filter.as_ref().map(Expr::to_string)
    }
}

#[derive(Debug, Clone)]
pub struct StatementInterceptor {
    config: Arc<GuardConfig>,
    tenant_line: TenantLineFilter,
}

impl StatementInterceptor {
    pub fn new(config: Arc<GuardConfig>) -> Self {
        let tenant_line = TenantLineFilter::new(Arc::new(config.tenant.clone()));
        Self {
            config,
            tenant_line,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn tenant_line(&self) -> &TenantLineFilter {
        &self.tenant_line
    }

    /// Rewrite `stmt` for the caller described by `ctx`.
    pub fn intercept(&self, ctx: &RequestContext, stmt: &mut InterceptedStatement) {
        if let Some(descriptor) = &stmt.data_scope {
            if stmt.kind != StatementKind::Insert
                && self.config.data_permission.enabled
                && ctx.data_scope_enabled()
            {
                stmt.filter = apply_data_scope(stmt.filter.take(), ctx.user(), descriptor);
            }
        }

        if self.config.tenant.isolation_level != IsolationLevel::Line {
            return;
        }
        if stmt.ignore_tenant_line || ContextCarrier::tenant_line_suspended() {
            tracing::trace!(table = %stmt.table, "tenant line bypassed");
            return;
        }

        let tenant = ctx.tenant();
        match stmt.kind {
            StatementKind::Insert => {
                self.tenant_line.inject_insert(&mut stmt.params, &stmt.table, &tenant);
            }
            _ => {
                stmt.filter = self.tenant_line.apply(
                    stmt.filter.take(),
                    &stmt.table,
                    stmt.alias.as_deref(),
                    &tenant,
                );
            }
        }
        tracing::debug!(
            table = %stmt.table,
            kind = ?stmt.kind,
            filter = stmt.where_clause().as_deref().unwrap_or(""),
            "statement intercepted"
        );
    }

    /// [`StatementInterceptor::intercept`] against the running task's context.
    pub fn intercept_current(&self, stmt: &mut InterceptedStatement) -> GuardResult<()> {
        ContextCarrier::with(|ctx| self.intercept(ctx, stmt)).ok_or(GuardError::NoActiveContext)
    }
}
