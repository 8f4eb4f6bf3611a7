use std::time::Duration;

use crate::types::{ProviderKind, ResourceStatus};

/// Unified error for every provider operation.
///
/// Contract methods either resolve with a typed value or reject with one of
/// these variants; nothing is silently discarded. `code()` exposes the
/// stable machine-readable taxonomy for callers that log or branch on it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameter {parameter} for {provider}: {message}")]
    InvalidParameter {
        provider: ProviderKind,
        parameter: String,
        message: String,
    },

    #[error("resource {resource_id} not found on {provider}")]
    ResourceNotFound {
        provider: ProviderKind,
        resource_id: String,
    },

    #[error("insufficient quota on {provider}: {message}")]
    InsufficientQuota {
        provider: ProviderKind,
        message: String,
    },

    #[error("operation {operation} on {provider} timed out after {timeout:?}")]
    OperationTimeout {
        provider: ProviderKind,
        operation: String,
        timeout: Duration,
    },

    #[error("resource {resource_id} entered ERROR state while waiting for {target}")]
    ResourceInError {
        provider: ProviderKind,
        resource_id: String,
        target: ResourceStatus,
    },

    #[error("operation {operation} on {provider} was cancelled")]
    Cancelled {
        provider: ProviderKind,
        operation: String,
    },

    #[error("provider type '{requested}' is not registered (registered: {registered})")]
    ProviderNotFound {
        requested: String,
        registered: String,
    },

    #[error("failed to create provider '{kind}': {source}")]
    CreationFailed {
        kind: ProviderKind,
        #[source]
        source: Box<Error>,
    },

    #[error("provider {0} is not initialized, call initialize() first")]
    NotInitialized(ProviderKind),

    #[error("unknown provider kind: {0}")]
    UnknownKind(String),

    #[error("missing env var: {0}")]
    MissingEnv(String),

    #[error("password encryption failed: {0}")]
    Encryption(String),

    #[error("unexpected vendor response: {0}")]
    UnexpectedResponse(String),

    #[error("ecloud api error: {0}")]
    Ecloud(#[from] ecloud_api::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable error code for logging and caller-side branching.
    pub fn code(&self) -> &str {
        match self {
            Error::InvalidParameter { .. } => "INVALID_PARAMETER",
            Error::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            Error::InsufficientQuota { .. } => "INSUFFICIENT_QUOTA",
            Error::OperationTimeout { .. } => "OPERATION_TIMEOUT",
            Error::ResourceInError { .. } => "RESOURCE_IN_ERROR",
            Error::Cancelled { .. } => "OPERATION_CANCELLED",
            Error::ProviderNotFound { .. } => "PROVIDER_NOT_FOUND",
            Error::CreationFailed { .. } => "PROVIDER_CREATION_FAILED",
            Error::NotInitialized(_) => "NOT_INITIALIZED",
            Error::UnknownKind(_) => "UNKNOWN_PROVIDER_KIND",
            Error::MissingEnv(_) => "MISSING_ENV",
            Error::Encryption(_) => "ENCRYPTION_FAILED",
            Error::UnexpectedResponse(_) => "UNEXPECTED_RESPONSE",
            Error::Ecloud(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_taxonomy() {
        let err = Error::OperationTimeout {
            provider: ProviderKind::Ecloud,
            operation: "wait_for_status(RUNNING)".into(),
            timeout: Duration::from_secs(60),
        };
        assert_eq!(err.code(), "OPERATION_TIMEOUT");
        assert!(err.to_string().contains("wait_for_status(RUNNING)"));

        let err = Error::ProviderNotFound {
            requested: "aws".into(),
            registered: "ecloud".into(),
        };
        assert_eq!(err.code(), "PROVIDER_NOT_FOUND");
        assert!(err.to_string().contains("ecloud"));
    }

    #[test]
    fn creation_failed_preserves_cause() {
        let cause = Error::InvalidParameter {
            provider: ProviderKind::Ecloud,
            parameter: "credentials.access_key_id".into(),
            message: "access key id is required".into(),
        };
        let err = Error::CreationFailed {
            kind: ProviderKind::Ecloud,
            source: Box::new(cause),
        };
        assert_eq!(err.code(), "PROVIDER_CREATION_FAILED");
        assert!(err.to_string().contains("access key id is required"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn vendor_errors_surface_vendor_codes() {
        let err = Error::Ecloud(ecloud_api::Error::Api {
            endpoint: "describe instance",
            code: "INSTANCE_NOT_FOUND".into(),
            message: "no such instance".into(),
            request_id: None,
        });
        assert_eq!(err.code(), "INSTANCE_NOT_FOUND");
    }
}
