//! Per-request identity: who is calling, in which tenant, with which roles.

use std::collections::BTreeSet;

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::GuardError;
use crate::id::{DeptId, RoleId, TenantId, UserId};

/// Row-visibility policy attached to a role.
///
/// The set is closed: resolution matches it exhaustively, so a new kind is a
/// compile-time change. Codes coming from a role store go through
/// [`DataScope::from_code`], which rejects anything unknown.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum DataScope {
    /// Every row.
    All,
    /// Rows of an explicit department list bound to the role.
    Custom,
    /// Rows of the user's own department.
    Dept,
    /// Rows of the user's department and every department below it.
    DeptAndChild,
    /// Rows created by the user.
    #[serde(rename = "SELF")]
    OwnRows,
}

impl DataScope {
    /// Parse a stored scope code (`"1"`..`"5"`) or scope name.
    pub fn from_code(code: &str) -> Result<Self, GuardError> {
        match code.trim() {
            "1" | "ALL" => Ok(Self::All),
            "2" | "CUSTOM" => Ok(Self::Custom),
            "3" | "DEPT" => Ok(Self::Dept),
            "4" | "DEPT_AND_CHILD" => Ok(Self::DeptAndChild),
            "5" | "SELF" => Ok(Self::OwnRows),
            other => Err(GuardError::unsupported_scope(other)),
        }
    }

    /// Numeric code as persisted by role stores.
    pub fn code(&self) -> &'static str {
        match self {
            Self::All => "1",
            Self::Custom => "2",
            Self::Dept => "3",
            Self::DeptAndChild => "4",
            Self::OwnRows => "5",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Custom => "CUSTOM",
            Self::Dept => "DEPT",
            Self::DeptAndChild => "DEPT_AND_CHILD",
            Self::OwnRows => "SELF",
        }
    }
}

impl core::fmt::Display for DataScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataScope {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl TryFrom<String> for DataScope {
    type Error = GuardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_code(&value)
    }
}

/// One role held by the calling user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleContext {
    pub role_id: RoleId,
    pub data_scope: DataScope,
}

impl RoleContext {
    pub fn new(role_id: impl Into<RoleId>, data_scope: DataScope) -> Self {
        Self {
            role_id: role_id.into(),
            data_scope,
        }
    }

    /// Build a role from a raw scope code, failing on unknown codes.
    pub fn from_raw(role_id: impl Into<RoleId>, scope_code: &str) -> Result<Self, GuardError> {
        Ok(Self::new(role_id, DataScope::from_code(scope_code)?))
    }
}

/// Authenticated caller as supplied by the user store.
///
/// Immutable for the lifetime of a request. Roles are kept ordered by role id
/// so resolution output is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: UserId,
    pub dept_id: DeptId,
    #[serde(default)]
    pub roles: BTreeSet<RoleContext>,
}

impl UserContext {
    pub fn new(user_id: impl Into<UserId>, dept_id: impl Into<DeptId>) -> Self {
        Self {
            user_id: user_id.into(),
            dept_id: dept_id.into(),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: RoleContext) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleContext>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn has_full_access(&self) -> bool {
        self.roles.iter().any(|r| r.data_scope == DataScope::All)
    }
}

/// Tenant selected by the inbound request.
///
/// `tenant_id == None` means the request asked for no tenant scoping.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    tenant_id: Option<TenantId>,
}

impl TenantContext {
    pub fn new(tenant_id: Option<TenantId>) -> Self {
        Self { tenant_id }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Interpret a raw header value. Absent or unparseable values yield an
    /// unscoped context rather than an error.
    pub fn from_header_value(raw: Option<&str>) -> Self {
        let tenant_id = raw.and_then(|v| match v.parse::<TenantId>() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::debug!(value = v, error = %e, "ignoring unparseable tenant header");
                None
            }
        });
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }
}

impl From<TenantId> for TenantContext {
    fn from(value: TenantId) -> Self {
        Self::new(Some(value))
    }
}
