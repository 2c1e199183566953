//! Error types for access operations
//!
//! Permission denial is never an error: [`crate::service::AccessDecision`]
//! carries it as a normal return value. Errors here cover infrastructure
//! failures (store unreachable) and write-boundary rejections (unknown
//! resource, unsupported action, protected role). The guard converts
//! infrastructure failures into fail-closed denials with a generic message.

use thiserror::Error;

/// Access error types.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Resource catalog could not be loaded; callers must deny all.
    #[error("Resource catalog unavailable")]
    CatalogUnavailable,

    /// A backing store failed mid-request.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Write referenced a resource code the catalog does not know.
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// Write referenced a deactivated resource.
    #[error("Resource is inactive: {0}")]
    ResourceInactive(String),

    /// Grant includes an action the resource does not declare.
    #[error("Resource {resource} does not support action {action}")]
    ActionNotSupported {
        /// Resource code.
        resource: String,
        /// Offending action.
        action: String,
    },

    /// Role string could not be parsed at the write boundary.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Grant writes against the super-admin role are rejected.
    #[error("Super admin role cannot hold grants")]
    ProtectedRole,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for access operations.
pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Check if this error should be logged at error level.
    ///
    /// Write-boundary rejections are expected caller mistakes; only
    /// infrastructure failures are server errors.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AccessError::CatalogUnavailable
                | AccessError::StoreUnavailable(_)
                | AccessError::Internal(_)
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::UnknownResource(_)
            | AccessError::ResourceInactive(_)
            | AccessError::ActionNotSupported { .. }
            | AccessError::UnknownRole(_) => 400,

            AccessError::ProtectedRole => 403,

            AccessError::CatalogUnavailable
            | AccessError::StoreUnavailable(_)
            | AccessError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::CatalogUnavailable => "CATALOG_UNAVAILABLE",
            AccessError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AccessError::UnknownResource(_) => "UNKNOWN_RESOURCE",
            AccessError::ResourceInactive(_) => "RESOURCE_INACTIVE",
            AccessError::ActionNotSupported { .. } => "ACTION_NOT_SUPPORTED",
            AccessError::UnknownRole(_) => "UNKNOWN_ROLE",
            AccessError::ProtectedRole => "PROTECTED_ROLE",
            AccessError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
