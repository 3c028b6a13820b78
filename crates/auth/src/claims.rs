use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rowgate_core::{DeptId, GuardResult, RoleContext, RoleId, UserContext, UserId};

/// Identity claims carried by a bearer token once it has been decoded and
/// its signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    pub dept_id: DeptId,

    /// Roles with their data-scope codes. An empty list is valid and means
    /// the user sees no data-scoped rows.
    #[serde(default)]
    pub roles: Vec<RoleClaim>,

    /// When `false` the data-scope filter is switched off for the request.
    #[serde(default = "default_true")]
    pub data_scope: bool,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// A role as carried in a token. The scope code stays raw until
/// [`UserClaims::user_context`] so an unknown code surfaces as a
/// configuration error instead of a token decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaim {
    pub role_id: RoleId,
    pub data_scope: String,
}

impl From<RoleContext> for RoleClaim {
    fn from(role: RoleContext) -> Self {
        Self {
            role_id: role.role_id,
            data_scope: role.data_scope.as_str().to_string(),
        }
    }
}

impl UserClaims {
    /// Fails with `UnsupportedDataScope` naming the first unknown code.
    pub fn user_context(&self) -> GuardResult<UserContext> {
        let roles = self
            .roles
            .iter()
            .map(|r| RoleContext::from_raw(r.role_id, &r.data_scope))
            .collect::<GuardResult<Vec<_>>>()?;
        Ok(UserContext::new(self.sub, self.dept_id).with_roles(roles))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Check the claim time window against `now`. Signature verification happens
/// before this, at the transport layer.
pub fn validate_claims(claims: &UserClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
