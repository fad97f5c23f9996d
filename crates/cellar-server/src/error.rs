//! Service-level error taxonomy.
//!
//! Every domain operation returns [`ServiceError`]. gRPC handlers convert it
//! into a `tonic::Status` carrying the stable machine-readable kind in the
//! `x-error-kind` metadata entry.

use tonic::Status;
use tonic::metadata::{MetadataMap, MetadataValue};
use tracing::error;

use cellar_core::db::DatabaseError;

/// Metadata key holding [`ServiceError::kind`] on error responses.
pub const ERROR_KIND_METADATA: &str = "x-error-kind";

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or missing input; safe to retry after fixing it.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// Valid token scoped to a different resource, or a closed invite.
    #[error("{0}")]
    Forbidden(String),

    /// Absent or owned by someone else.
    #[error("{0} not found")]
    NotFound(String),

    /// Join code past its invite window.
    #[error("{0}")]
    Expired(String),

    /// Duplicate unique value.
    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Stable machine-readable kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Expired(_) => "expired",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }

    /// Map a storage error, naming the resource for `NotFound`.
    pub fn from_db(e: DatabaseError, resource: &str) -> Self {
        match e {
            DatabaseError::NotFound(_) => Self::NotFound(resource.to_string()),
            DatabaseError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(e: DatabaseError) -> Self {
        Self::from_db(e, "Resource")
    }
}

impl From<ServiceError> for Status {
    fn from(e: ServiceError) -> Self {
        let code = match &e {
            ServiceError::Validation(_) => tonic::Code::InvalidArgument,
            ServiceError::Unauthorized(_) => tonic::Code::Unauthenticated,
            ServiceError::Forbidden(_) => tonic::Code::PermissionDenied,
            ServiceError::NotFound(_) => tonic::Code::NotFound,
            ServiceError::Expired(_) => tonic::Code::FailedPrecondition,
            ServiceError::Conflict(_) => tonic::Code::AlreadyExists,
            ServiceError::Internal(_) => tonic::Code::Internal,
        };

        let message = if let ServiceError::Internal(detail) = &e {
            error!(error = %detail, "Internal error");
            "Internal error".to_string()
        } else {
            e.to_string()
        };

        let mut metadata = MetadataMap::new();
        metadata.insert(ERROR_KIND_METADATA, MetadataValue::from_static(e.kind()));
        Self::with_metadata(code, message, metadata)
    }
}
