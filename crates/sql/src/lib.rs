//! `rowgate-sql` — the filter-expression tree the guard rewrites.
//!
//! Statements are never manipulated as strings. Predicates are built as an
//! [`Expr`] tree, combined with the pure functions in [`combinator`], and only
//! rendered to SQL text at the very end via `Display`.

pub mod combinator;
pub mod eval;
pub mod expr;

pub use combinator::{and, and_all, nested, or, or_all, rewrite};
pub use eval::{EvalError, Row};
pub use expr::{Column, Expr, InList, Subquery, Value};
