use serde::{Deserialize, Serialize};

use rowgate_sql::Column;

/// Names the columns and tables a data-scope predicate must reference for one
/// guarded query.
///
/// This is static configuration chosen at the call site (one per protected
/// table or query), not runtime state. A blank alias means the column is
/// referenced bare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardedEntityDescriptor {
    /// Primary key of the department table.
    pub id_column: String,
    /// Department column on the guarded table (and on the role/dept link table).
    pub dept_id_column: String,
    /// Owner column on the guarded table.
    pub user_id_column: String,
    /// Alias of the guarded table in the statement.
    pub table_alias: String,
    /// Department table used by the department-tree lookup.
    pub dept_table: String,
    /// Role/department link table used by custom scopes.
    pub role_dept_table: String,
    /// Role column on the role/department link table.
    pub role_id_column: String,
    /// Comma-separated ancestor-id column on the department table.
    pub ancestors_column: String,
}

impl Default for GuardedEntityDescriptor {
    fn default() -> Self {
        Self {
            id_column: "dept_id".to_string(),
            dept_id_column: "dept_id".to_string(),
            user_id_column: "user_id".to_string(),
            table_alias: String::new(),
            dept_table: "sys_dept".to_string(),
            role_dept_table: "sys_role_dept".to_string(),
            role_id_column: "role_id".to_string(),
            ancestors_column: "ancestors".to_string(),
        }
    }
}

impl GuardedEntityDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_alias(mut self, alias: impl Into<String>) -> Self {
        self.table_alias = alias.into();
        self
    }

    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    pub fn with_dept_id_column(mut self, column: impl Into<String>) -> Self {
        self.dept_id_column = column.into();
        self
    }

    pub fn with_user_id_column(mut self, column: impl Into<String>) -> Self {
        self.user_id_column = column.into();
        self
    }

    pub fn with_dept_table(mut self, table: impl Into<String>) -> Self {
        self.dept_table = table.into();
        self
    }

    pub fn with_role_dept_table(mut self, table: impl Into<String>) -> Self {
        self.role_dept_table = table.into();
        self
    }

    pub fn with_role_id_column(mut self, column: impl Into<String>) -> Self {
        self.role_id_column = column.into();
        self
    }

    pub fn with_ancestors_column(mut self, column: impl Into<String>) -> Self {
        self.ancestors_column = column.into();
        self
    }

    /// `{table_alias}.{dept_id_column}`.
    pub fn dept_column(&self) -> Column {
        Column::qualified(&self.table_alias, self.dept_id_column.clone())
    }

    /// `{table_alias}.{user_id_column}`.
    pub fn owner_column(&self) -> Column {
        Column::qualified(&self.table_alias, self.user_id_column.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let d: GuardedEntityDescriptor =
            serde_json::from_str(r#"{"table_alias": "o", "user_id_column": "create_user"}"#).unwrap();
        assert_eq!(d.owner_column().to_string(), "o.create_user");
        assert_eq!(d.dept_column().to_string(), "o.dept_id");
        assert_eq!(d.role_dept_table, "sys_role_dept");
    }
}
