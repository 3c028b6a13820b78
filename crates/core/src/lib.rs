//! `rowgate-core` — identity and request-context building blocks.
//!
//! This crate contains **pure data** primitives (no SQL, no IO, no runtime).

pub mod context;
pub mod error;
pub mod id;

pub use context::{DataScope, RoleContext, TenantContext, UserContext};
pub use error::{GuardError, GuardResult};
pub use id::{DeptId, RoleId, TenantId, UserId};
