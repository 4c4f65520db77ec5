// ABOUTME: Centralized error handling and error types for the Stride engine
// ABOUTME: Defines error codes, HTTP mapping, and conversions used across all modules

//! # Unified Error Handling System
//!
//! This module provides a centralized error handling system for the Stride
//! training engine. It defines standard error types, error codes, and HTTP
//! response formatting to ensure consistent error handling across ingestion,
//! aggregation, and recommendation pipelines.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    // Provider authentication
    /// Provider credentials are missing or cannot be refreshed
    AuthFailed,
    /// Provider refresh token was rejected; re-authorization required
    ReauthorizationRequired,

    // External services
    /// Provider or LLM returned a transient failure (5xx / network)
    ExternalServiceUnavailable,
    /// External service rejected the request
    ExternalServiceError,

    // Validation
    /// Input validation failed
    InvalidInput,
    /// Value is outside acceptable range
    ValueOutOfRange,

    // Parsing
    /// LLM response could not be parsed into the expected structure
    ParseFailed,

    // Resource management
    /// Requested resource was not found
    ResourceNotFound,
    /// Unique-constraint violation on an idempotent insert
    DuplicateRecord,

    // Configuration
    /// Configuration error occurred
    ConfigError,

    // Internal errors
    /// Database operation failed
    DatabaseError,
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::ValueOutOfRange => StatusCode::BAD_REQUEST,
            Self::AuthFailed | Self::ReauthorizationRequired => StatusCode::UNAUTHORIZED,
            Self::ResourceNotFound => StatusCode::NOT_FOUND,
            Self::DuplicateRecord => StatusCode::CONFLICT,
            Self::ExternalServiceError => StatusCode::BAD_GATEWAY,
            Self::ExternalServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ParseFailed
            | Self::ConfigError
            | Self::DatabaseError
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthFailed => "Provider authentication failed",
            Self::ReauthorizationRequired => {
                "Provider connection expired and requires re-authorization"
            }
            Self::ExternalServiceUnavailable => "An external service is currently unavailable",
            Self::ExternalServiceError => "An external service encountered an error",
            Self::InvalidInput => "The provided input is invalid",
            Self::ValueOutOfRange => "The provided value is outside the acceptable range",
            Self::ParseFailed => "An external response could not be parsed",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::DuplicateRecord => "A record with this identifier already exists",
            Self::ConfigError => "Configuration error encountered",
            Self::DatabaseError => "Database operation failed",
            Self::InternalError => "An internal server error occurred",
        }
    }
}

/// Application error type carrying a code and context message
#[derive(Debug, Clone, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get sanitized message safe for client exposure.
    /// Internal error details are replaced with generic descriptions.
    #[must_use]
    pub fn sanitized_message(&self) -> String {
        match self.code {
            ErrorCode::InvalidInput
            | ErrorCode::ValueOutOfRange
            | ErrorCode::ResourceNotFound
            | ErrorCode::ReauthorizationRequired => self.message.clone(),
            _ => self.code.description().to_owned(),
        }
    }

    /// Full error details for internal logging. Never sent to clients.
    #[must_use]
    pub fn internal_details(&self) -> String {
        format!("{:?}: {}", self.code, self.message)
    }

    /// Provider credentials missing or unrefreshable
    #[must_use]
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthFailed, message)
    }

    /// Refresh token rejected by the provider; manual re-authorization needed
    #[must_use]
    pub fn reauthorization_required(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ReauthorizationRequired, message)
    }

    /// Transient external failure (retryable)
    #[must_use]
    pub fn external_unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        let service_str = service.into();
        let message_str = message.into();
        Self::new(
            ErrorCode::ExternalServiceUnavailable,
            format!("{service_str}: {message_str}"),
        )
    }

    /// Non-retryable external service error
    #[must_use]
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        let service_str = service.into();
        let message_str = message.into();
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{service_str}: {message_str}"),
        )
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Out-of-range observation or parameter
    #[must_use]
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValueOutOfRange, message)
    }

    /// Malformed LLM response
    #[must_use]
    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseFailed, message)
    }

    /// Resource not found
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        let resource_str = resource.into();
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{resource_str} not found"),
        )
    }

    /// Unique-constraint violation on idempotent insert
    #[must_use]
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DuplicateRecord, message)
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Database error
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Internal server error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Whether this error represents a transient condition worth retrying
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.code, ErrorCode::ExternalServiceUnavailable)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message (sanitized for client)
    pub message: String,
    /// RFC3339 timestamp when the error occurred
    pub timestamp: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        // Log full details internally before sanitizing
        tracing::warn!("API error: {}", error.internal_details());

        Self {
            code: error.code,
            message: error.sanitized_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.code.http_status();
        let body = ErrorResponse::from(self);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::duplicate(error.to_string())
            }
            sqlx::Error::RowNotFound => Self::not_found("database row"),
            _ => Self::database(error.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::new(
                ErrorCode::ExternalServiceUnavailable,
                format!("HTTP error: {error}"),
            )
        } else {
            Self::new(
                ErrorCode::ExternalServiceError,
                format!("HTTP error: {error}"),
            )
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::InvalidInput, format!("JSON error: {error}"))
    }
}

impl From<chrono::ParseError> for AppError {
    fn from(error: chrono::ParseError) -> Self {
        Self::new(
            ErrorCode::InvalidInput,
            format!("Date parse error: {error}"),
        )
    }
}

impl From<uuid::Error> for AppError {
    fn from(error: uuid::Error) -> Self {
        Self::new(ErrorCode::InvalidInput, format!("UUID error: {error}"))
    }
}
