//! Line-level (shared schema) tenant isolation.

pub mod line;

pub use line::TenantLineFilter;
