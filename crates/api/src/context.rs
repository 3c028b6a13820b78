//! Where the request's user comes from.
//!
//! The role/user store lives outside this crate; the HTTP layer only needs a
//! [`UserContextProvider`] that turns request parts into a `UserContext`.

use axum::http::{HeaderMap, header, request::Parts};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use rowgate_auth::{TokenValidationError, UserClaims, validate_claims};
use rowgate_core::{GuardResult, UserContext};

/// The caller as seen by the request-context middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user: Option<UserContext>,
    pub filter_enabled: bool,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        Self {
            user: None,
            filter_enabled: true,
        }
    }
}

/// Supplies the authenticated user for a request.
///
/// An `Err` aborts the request: it means the caller's roles cannot be
/// filtered correctly, not that the caller is unknown.
pub trait UserContextProvider: Send + Sync + 'static {
    fn user_context(&self, parts: &Parts) -> GuardResult<Option<UserContext>>;

    /// Whether data-scope filtering applies to this request.
    fn is_filter_enabled(&self, _parts: &Parts) -> bool {
        true
    }

    fn identify(&self, parts: &Parts) -> GuardResult<CallerIdentity> {
        Ok(CallerIdentity {
            user: self.user_context(parts)?,
            filter_enabled: self.is_filter_enabled(parts),
        })
    }

    /// Whether `identity` may act as the super tenant, which skips the tenant
    /// line. Only callers holding an `ALL` role may by default.
    fn allows_super_tenant(&self, identity: &CallerIdentity) -> bool {
        identity.user.as_ref().is_some_and(UserContext::has_full_access)
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no bearer token")]
    Missing,

    #[error("malformed authorization header")]
    Malformed,

    #[error("token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// HS256 bearer tokens carrying [`UserClaims`].
///
/// A missing or invalid token yields no user, which the data scope treats as
/// "no rows visible". A verified token whose roles carry an unknown scope
/// code is an error.
pub struct JwtUserContextProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtUserContextProvider {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Claim timestamps are RFC 3339 and checked by `validate_claims`.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn claims(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Result<UserClaims, IdentityError> {
        let token = extract_bearer(headers)?;
        let claims = jsonwebtoken::decode::<UserClaims>(token, &self.key, &self.validation)?.claims;
        validate_claims(&claims, now)?;
        Ok(claims)
    }

    fn claims_or_log(&self, parts: &Parts) -> Option<UserClaims> {
        match self.claims(&parts.headers, Utc::now()) {
            Ok(claims) => Some(claims),
            Err(IdentityError::Missing) => None,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring bearer token");
                None
            }
        }
    }
}

impl core::fmt::Debug for JwtUserContextProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JwtUserContextProvider").finish_non_exhaustive()
    }
}

impl UserContextProvider for JwtUserContextProvider {
    fn user_context(&self, parts: &Parts) -> GuardResult<Option<UserContext>> {
        self.claims_or_log(parts).map(|c| c.user_context()).transpose()
    }

    fn is_filter_enabled(&self, parts: &Parts) -> bool {
        self.claims_or_log(parts).is_none_or(|c| c.data_scope)
    }

    fn identify(&self, parts: &Parts) -> GuardResult<CallerIdentity> {
        let Some(claims) = self.claims_or_log(parts) else {
            return Ok(CallerIdentity::anonymous());
        };
        Ok(CallerIdentity {
            user: Some(claims.user_context()?),
            filter_enabled: claims.data_scope,
        })
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, IdentityError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or(IdentityError::Missing)?;

    let header = header.to_str().map_err(|_| IdentityError::Malformed)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(IdentityError::Malformed)?
        .trim();
    if token.is_empty() {
        return Err(IdentityError::Malformed);
    }

    Ok(token)
}
