//! Configuration loading and representation.
//!
//! Every option has a default, so an empty environment (or an empty JSON
//! object) yields a working line-level setup.

use std::collections::BTreeSet;

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use rowgate_core::{GuardError, TenantId};

/// How tenants are kept apart.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationLevel {
    /// Shared schema; every statement gets a tenant-column predicate.
    #[default]
    Line,
    /// One physical datasource per tenant; statements are routed, not filtered.
    Datasource,
}

impl FromStr for IsolationLevel {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LINE" => Ok(Self::Line),
            "DATASOURCE" => Ok(Self::Datasource),
            other => Err(GuardError::invalid_config(format!(
                "isolation level must be LINE or DATASOURCE, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantIsolationConfig {
    pub isolation_level: IsolationLevel,
    pub tenant_id_column: String,
    pub tenant_id_header: String,
    pub super_tenant_id: TenantId,
    pub ignore_tables: BTreeSet<String>,
}

impl Default for TenantIsolationConfig {
    fn default() -> Self {
        Self {
            isolation_level: IsolationLevel::Line,
            tenant_id_column: "tenant_id".to_string(),
            tenant_id_header: "X-Tenant-Id".to_string(),
            super_tenant_id: TenantId::new(-1),
            ignore_tables: BTreeSet::new(),
        }
    }
}

/// Strip quoting and any schema prefix, and lower-case: `` `app`.`Orders` `` → `orders`.
pub(crate) fn normalize_table(table: &str) -> String {
    let unquoted: String = table
        .chars()
        .filter(|c| !matches!(c, '`' | '"' | '[' | ']'))
        .collect();
    unquoted
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

impl TenantIsolationConfig {
    pub fn with_ignore_table(mut self, table: impl Into<String>) -> Self {
        self.ignore_tables.insert(table.into());
        self
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    /// Table names compare case-insensitively and without schema/quoting.
    pub fn is_ignored_table(&self, table: &str) -> bool {
        let table = normalize_table(table);
        self.ignore_tables.iter().any(|t| normalize_table(t) == table)
    }

    pub fn is_super_tenant(&self, tenant_id: TenantId) -> bool {
        tenant_id == self.super_tenant_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPermissionConfig {
    pub enabled: bool,
}

impl Default for DataPermissionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub tenant: TenantIsolationConfig,
    pub data_permission: DataPermissionConfig,
}

impl GuardConfig {
    /// Load from `ROWGATE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unparseable values are logged and
    /// replaced by their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("ROWGATE_ISOLATION_LEVEL") {
            match raw.parse() {
                Ok(level) => config.tenant.isolation_level = level,
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring ROWGATE_ISOLATION_LEVEL"),
            }
        }
        if let Some(column) = lookup("ROWGATE_TENANT_ID_COLUMN").filter(|v| !v.trim().is_empty()) {
            config.tenant.tenant_id_column = column.trim().to_string();
        }
        if let Some(header) = lookup("ROWGATE_TENANT_ID_HEADER").filter(|v| !v.trim().is_empty()) {
            config.tenant.tenant_id_header = header.trim().to_string();
        }
        if let Some(raw) = lookup("ROWGATE_SUPER_TENANT_ID") {
            match raw.parse::<TenantId>() {
                Ok(id) => config.tenant.super_tenant_id = id,
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring ROWGATE_SUPER_TENANT_ID"),
            }
        }
        if let Some(raw) = lookup("ROWGATE_IGNORE_TABLES") {
            config.tenant.ignore_tables = raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = lookup("ROWGATE_DATA_PERMISSION_ENABLED") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => config.data_permission.enabled = true,
                "false" | "0" | "no" | "off" => config.data_permission.enabled = false,
                _ => tracing::warn!(value = %raw, "ignoring ROWGATE_DATA_PERMISSION_ENABLED"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_documented_surface() {
        let c = GuardConfig::from_lookup(|_| None);
        assert_eq!(c.tenant.isolation_level, IsolationLevel::Line);
        assert_eq!(c.tenant.tenant_id_column, "tenant_id");
        assert_eq!(c.tenant.tenant_id_header, "X-Tenant-Id");
        assert_eq!(c.tenant.super_tenant_id, TenantId::new(-1));
        assert!(c.tenant.ignore_tables.is_empty());
        assert!(c.data_permission.enabled);
    }

    #[test]
    fn reads_environment_overrides() {
        let c = GuardConfig::from_lookup(lookup(&[
            ("ROWGATE_ISOLATION_LEVEL", "datasource"),
            ("ROWGATE_TENANT_ID_COLUMN", "org_id"),
            ("ROWGATE_SUPER_TENANT_ID", "0"),
            ("ROWGATE_IGNORE_TABLES", "sys_dict, sys_config,,"),
            ("ROWGATE_DATA_PERMISSION_ENABLED", "off"),
        ]));
        assert_eq!(c.tenant.isolation_level, IsolationLevel::Datasource);
        assert_eq!(c.tenant.tenant_id_column, "org_id");
        assert_eq!(c.tenant.super_tenant_id, TenantId::new(0));
        assert_eq!(c.tenant.ignore_tables.len(), 2);
        assert!(!c.data_permission.enabled);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let c = GuardConfig::from_lookup(lookup(&[
            ("ROWGATE_ISOLATION_LEVEL", "schema"),
            ("ROWGATE_SUPER_TENANT_ID", "root"),
        ]));
        assert_eq!(c, GuardConfig::default());
    }

    #[test]
    fn ignored_tables_match_loosely() {
        let c = TenantIsolationConfig::default().with_ignore_table("sys_dict");
        assert!(c.is_ignored_table("SYS_DICT"));
        assert!(c.is_ignored_table("`app`.`sys_dict`"));
        assert!(!c.is_ignored_table("orders"));
    }

    #[test]
    fn deserializes_partial_json() {
        let c: GuardConfig = serde_json::from_str(
            r#"{"tenant": {"isolation_level": "DATASOURCE", "ignore_tables": ["sys_dict"]}}"#,
        )
        .unwrap();
        assert_eq!(c.tenant.isolation_level, IsolationLevel::Datasource);
        assert_eq!(c.tenant.tenant_id_column, "tenant_id");
        assert!(c.data_permission.enabled);
    }
}
