//! Pure combinators over [`Expr`].
//!
//! Each combinator groups an operand with explicit parentheses whenever the
//! operand's own top-level operator differs from the one being applied, so
//! the resulting tree means the same thing however it is later rendered or
//! extended.

use crate::expr::Expr;

/// Wrap `expr` in parentheses (idempotent).
pub fn nested(expr: Expr) -> Expr {
    match expr {
        Expr::Nested(_) => expr,
        other => Expr::Nested(Box::new(other)),
    }
}

fn group_for_and(expr: Expr) -> Expr {
    if expr.is_or() { nested(expr) } else { expr }
}

fn group_for_or(expr: Expr) -> Expr {
    if expr.is_and() { nested(expr) } else { expr }
}

/// `a AND b`.
pub fn and(a: Expr, b: Expr) -> Expr {
    Expr::And {
        left: Box::new(group_for_and(a)),
        right: Box::new(group_for_and(b)),
    }
}

/// `a OR b`.
pub fn or(a: Expr, b: Expr) -> Expr {
    Expr::Or {
        left: Box::new(group_for_or(a)),
        right: Box::new(group_for_or(b)),
    }
}

/// Left-fold with [`and`]. `None` for an empty input.
pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    exprs.into_iter().reduce(and)
}

/// Left-fold with [`or`]. `None` for an empty input.
pub fn or_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    exprs.into_iter().reduce(or)
}

/// Merge a resolved predicate into a statement's existing filter.
///
/// Without an existing filter the predicate becomes the filter as-is.
/// Otherwise the result is `existing AND (predicate)`: the injected side is
/// always parenthesized, and the existing side is grouped when it is an `OR`.
pub fn rewrite(existing: Option<Expr>, resolved: Expr) -> Expr {
    match existing {
        None => resolved,
        Some(existing) => and(existing, nested(resolved)),
    }
}
