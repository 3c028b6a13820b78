//! Guard error model.

use thiserror::Error;

/// Result type used across the guard crates.
pub type GuardResult<T> = Result<T, GuardError>;

/// Error raised while resolving, rewriting or routing a guarded statement.
///
/// Every variant except `NoActiveContext` is a configuration mistake: it is
/// surfaced to the caller immediately and never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// A role carries a data-scope code this engine does not know.
    #[error("unsupported data scope: {0}")]
    UnsupportedDataScope(String),

    /// The datasource provider returned nothing for a tenant key.
    #[error("datasource configuration not found for tenant {0}")]
    DataSourceNotFound(String),

    /// A required collaborator (provider, factory, ...) was not wired.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(String),

    /// A guarded call ran outside of an established request context.
    #[error("no active request context")]
    NoActiveContext,

    /// The pool factory failed to build a datasource.
    #[error("datasource creation failed for '{pool}': {reason}")]
    DataSourceCreation { pool: String, reason: String },

    /// A configuration value is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl GuardError {
    pub fn unsupported_scope(value: impl Into<String>) -> Self {
        Self::UnsupportedDataScope(value.into())
    }

    pub fn datasource_not_found(tenant_key: impl Into<String>) -> Self {
        Self::DataSourceNotFound(tenant_key.into())
    }

    pub fn missing_collaborator(name: impl Into<String>) -> Self {
        Self::MissingCollaborator(name.into())
    }

    pub fn datasource_creation(pool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataSourceCreation {
            pool: pool.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Whether this error stems from wiring or configuration rather than
    /// from the shape of the current request.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::NoActiveContext | Self::InvalidId(_))
    }

    /// Stable machine-readable code for error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedDataScope(_) => "unsupported_data_scope",
            Self::DataSourceNotFound(_) => "datasource_not_found",
            Self::MissingCollaborator(_) => "missing_collaborator",
            Self::NoActiveContext => "no_active_context",
            Self::DataSourceCreation { .. } => "datasource_creation",
            Self::InvalidConfig(_) => "invalid_config",
            Self::InvalidId(_) => "invalid_id",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasource_not_found_names_tenant() {
        let err = GuardError::datasource_not_found("42");
        assert_eq!(
            err.to_string(),
            "datasource configuration not found for tenant 42"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn missing_context_is_not_configuration() {
        assert!(!GuardError::NoActiveContext.is_configuration());
        assert_eq!(GuardError::NoActiveContext.code(), "no_active_context");
    }
}
