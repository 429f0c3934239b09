use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unique error codes for client identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Storage errors (1xxx)
    StoreError = 1001,

    // Validation errors (2xxx)
    ValidationFailed = 2001,
    InvalidFormat = 2003,
    MissingField = 2004,

    // Upstream service errors (5xxx)
    UpstreamUnavailable = 5001,
    MalformedRecord = 5002,
    CacheError = 5003,

    // Resource errors (6xxx)
    DoiNotFound = 6001,
    PaperNotFound = 6002,

    // Internal errors (9xxx)
    InternalError = 9001,
    ConfigurationError = 9002,
    SerializationError = 9003,
}

impl ErrorCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

/// Application error taxonomy.
///
/// The resolver distinguishes "the DOI matched nothing" (`DoiNotFound`) from
/// "the lookup itself failed" (`Upstream`); the traversal engine swallows
/// per-node `Upstream`/`ParseFailure` and only surfaces root-level failures.
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // Resource errors
    #[error("No PubMed record matches DOI {doi}")]
    DoiNotFound { doi: String },

    #[error("Paper not found: {pmid}")]
    PaperNotFound { pmid: String },

    // Upstream service errors
    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Malformed upstream record: {0}")]
    ParseFailure(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    // Storage errors
    #[error("Store error: {0}")]
    StoreError(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ValidationError(_) => ErrorCode::ValidationFailed,
            Self::InvalidFormat(_) => ErrorCode::InvalidFormat,
            Self::MissingField(_) => ErrorCode::MissingField,
            Self::DoiNotFound { .. } => ErrorCode::DoiNotFound,
            Self::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            Self::Upstream(_) => ErrorCode::UpstreamUnavailable,
            Self::ParseFailure(_) => ErrorCode::MalformedRecord,
            Self::CacheError(_) => ErrorCode::CacheError,
            Self::StoreError(_) => ErrorCode::StoreError,
            Self::InternalError(_) => ErrorCode::InternalError,
            Self::ConfigError(_) => ErrorCode::ConfigurationError,
            Self::SerializationError(_) => ErrorCode::SerializationError,
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            Self::MissingField(_) => StatusCode::BAD_REQUEST,
            Self::DoiNotFound { .. } => StatusCode::NOT_FOUND,
            Self::PaperNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::ParseFailure(_) => StatusCode::BAD_GATEWAY,
            Self::CacheError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        // Log based on severity
        match &self {
            AppError::ValidationError(_)
            | AppError::InvalidFormat(_)
            | AppError::MissingField(_)
            | AppError::DoiNotFound { .. }
            | AppError::PaperNotFound { .. } => {
                tracing::debug!(error_code = error_code.as_u16(), %message, "Client error");
            }
            AppError::Upstream(_) | AppError::ParseFailure(_) => {
                tracing::warn!(error_code = error_code.as_u16(), %message, "Upstream error");
            }
            _ => {
                tracing::error!(error_code = error_code.as_u16(), %message, error = ?self, "Server error");
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code.as_u16(),
                "status": status.as_u16(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mapping() {
        let err = AppError::DoiNotFound { doi: "10.1000/xyz".into() };
        assert_eq!(err.error_code(), ErrorCode::DoiNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_is_bad_request() {
        let err = AppError::MissingField("doi".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code().as_u16(), 2004);
    }

    #[test]
    fn test_upstream_is_bad_gateway() {
        let err = AppError::Upstream("esearch timed out".into());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = AppError::ParseFailure("missing result envelope".into());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
