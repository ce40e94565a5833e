use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or out-of-range input; never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transient search-backend failure (timeout, connection reset, 5xx)
    #[error("Search backend error: {0}")]
    Backend(String),

    /// Backend responds but is unusable for routing (red cluster, slow health)
    #[error("Search backend degraded: {0}")]
    Degraded(String),

    /// Relational store errors
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Index schema missing or malformed
    #[error("Schema error: {0}")]
    Schema(String),

    /// Fatal indexer-pipeline failure
    #[error("Indexer error in {step}: {message}")]
    Indexer { step: &'static str, message: String },

    /// Operation exceeded its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Backend(_) | AppError::Degraded(_) | AppError::Timeout(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Database(_)
            | AppError::Configuration(_)
            | AppError::Schema(_)
            | AppError::Indexer { .. }
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Backend(_) | AppError::Degraded(_) | AppError::Timeout(_) => {
                "SERVICE_UNAVAILABLE"
            }
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Schema(_) => "SCHEMA_ERROR",
            AppError::Indexer { .. } => "INDEXER_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures that should count against the HealthGate
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            AppError::Backend(_) | AppError::Degraded(_) | AppError::Timeout(_)
        )
    }
}

/// Convert AppError to an HTTP response carrying the uniform envelope
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        tracing::error!(
            error_code = error_code,
            status_code = status.as_u16(),
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "success": false,
            "error": message,
            "errorCode": error_code,
        }));

        (status, body).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Schema(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::Backend(err.to_string())
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
