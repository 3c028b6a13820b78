//! Data-scope resolution: roles → row-visibility predicate.
//!
//! - No IO
//! - No panics
//! - Roles are unioned: a row is visible if any one role grants it
//! - A role with `ALL` wins outright and stops resolution

use std::collections::HashSet;

use rowgate_core::{DataScope, RoleContext, UserContext};
use rowgate_sql::{Column, Expr, Subquery, or_all, rewrite};

use crate::GuardedEntityDescriptor;

/// Outcome of resolving a user's data scope against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// At least one role grants every row; no predicate is added.
    Unrestricted,
    /// Rows are limited to those matching the predicate.
    Restricted(Expr),
    /// No role grants anything; the statement must match no rows.
    DenyAll,
}

impl Resolution {
    /// Predicate to AND into the statement, if any.
    pub fn into_predicate(self) -> Option<Expr> {
        match self {
            Self::Unrestricted => None,
            Self::Restricted(expr) => Some(expr),
            Self::DenyAll => Some(Expr::never()),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }
}

fn role_condition(
    role: &RoleContext,
    user: &UserContext,
    d: &GuardedEntityDescriptor,
) -> Option<Expr> {
    let dept = user.dept_id.get();
    match role.data_scope {
        DataScope::All => None,
        DataScope::Dept => Some(Expr::column_eq(d.dept_column(), dept)),
        DataScope::DeptAndChild => {
            let tree = rowgate_sql::or(
                Expr::column_eq(Column::new(d.id_column.clone()), dept),
                Expr::function(
                    "FIND_IN_SET",
                    vec![Expr::int(dept), Expr::column(Column::new(d.ancestors_column.clone()))],
                ),
            );
            Some(Expr::in_subquery(
                Expr::column(d.dept_column()),
                Subquery::new(Column::new(d.id_column.clone()), d.dept_table.clone())
                    .filter(tree),
            ))
        }
        DataScope::OwnRows => Some(Expr::column_eq(d.owner_column(), user.user_id.get())),
        DataScope::Custom => Some(Expr::in_subquery(
            Expr::column(d.dept_column()),
            Subquery::new(
                Column::new(d.dept_id_column.clone()),
                d.role_dept_table.clone(),
            )
            .filter(Expr::column_eq(
                Column::new(d.role_id_column.clone()),
                role.role_id.get(),
            )),
        )),
    }
}

/// Resolve the predicate `user` must be constrained by on the table `descriptor` names.
///
/// `DEPT`, `DEPT_AND_CHILD` and `SELF` contribute at most once each since
/// their condition does not depend on the role; every `CUSTOM` role
/// contributes its own link-table lookup. A user with no roles resolves to
/// [`Resolution::DenyAll`].
pub fn resolve(user: &UserContext, descriptor: &GuardedEntityDescriptor) -> Resolution {
    if user.has_full_access() {
        tracing::debug!(user_id = %user.user_id, "data scope unrestricted");
        return Resolution::Unrestricted;
    }

    let mut seen: HashSet<DataScope> = HashSet::new();
    let mut conditions = Vec::with_capacity(user.roles.len());

    for role in &user.roles {
        if role.data_scope != DataScope::Custom && !seen.insert(role.data_scope) {
            continue;
        }
        if let Some(condition) = role_condition(role, user, descriptor) {
            conditions.push(condition);
        }
    }

    match or_all(conditions) {
        Some(expr) => Resolution::Restricted(expr),
        None => {
            tracing::warn!(user_id = %user.user_id, "user holds no data scope; denying all rows");
            Resolution::DenyAll
        }
    }
}

/// Merge the caller's data scope into a statement filter.
///
/// A missing user resolves like a user without roles: nothing is visible.
pub fn apply_data_scope(
    existing: Option<Expr>,
    user: Option<&UserContext>,
    descriptor: &GuardedEntityDescriptor,
) -> Option<Expr> {
    let resolution = match user {
        Some(user) => resolve(user, descriptor),
        None => {
            tracing::warn!("no user context for data-scoped statement; denying all rows");
            Resolution::DenyAll
        }
    };

    match resolution.into_predicate() {
        Some(predicate) => Some(rewrite(existing, predicate)),
        None => existing,
    }
}
