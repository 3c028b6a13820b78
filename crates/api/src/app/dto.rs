use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use rowgate_core::{RoleContext, TenantId, UserContext};
use rowgate_infra::{InterceptedStatement, IsolationLevel, StatementKind};

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserView {
    pub user_id: i64,
    pub dept_id: i64,
    pub roles: Vec<RoleContext>,
}

impl From<&UserContext> for UserView {
    fn from(user: &UserContext) -> Self {
        Self {
            user_id: user.user_id.get(),
            dept_id: user.dept_id.get(),
            roles: user.roles.iter().copied().collect(),
        }
    }
}

/// What a task spawned from the handler observed.
#[derive(Debug, Serialize)]
pub struct PropagatedView {
    pub tenant_id: Option<TenantId>,
    pub user_id: Option<i64>,
    pub datasource: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContextView {
    pub tenant_id: Option<TenantId>,
    pub user: Option<UserView>,
    pub data_scope_enabled: bool,
    pub isolation_level: IsolationLevel,
    pub datasource_stack: Vec<String>,
    pub propagated: PropagatedView,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub kind: StatementKind,
    pub table: String,
    pub where_clause: Option<String>,
    pub params: Map<String, JsonValue>,
}

impl From<InterceptedStatement> for PreviewResponse {
    fn from(stmt: InterceptedStatement) -> Self {
        Self {
            where_clause: stmt.where_clause(),
            kind: stmt.kind,
            table: stmt.table,
            params: stmt.params,
        }
    }
}
