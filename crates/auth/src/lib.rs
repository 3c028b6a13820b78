//! `rowgate-auth` — role-derived row visibility (data scope).
//!
//! This crate is intentionally decoupled from HTTP, storage and the request
//! context carrier: it turns a `UserContext` plus a table descriptor into a
//! filter predicate, and decodes the identity claims a caller presents.

pub mod claims;
pub mod descriptor;
pub mod scope;

pub use claims::{RoleClaim, TokenValidationError, UserClaims, validate_claims};
pub use descriptor::GuardedEntityDescriptor;
pub use scope::{Resolution, apply_data_scope, resolve};
