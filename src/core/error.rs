//! # Error Handling Module
//!
//! This module provides the error taxonomy for the identity gateway using the
//! `thiserror` crate. Every failure that can cross a component boundary is a
//! variant of [`IdentityError`], so callers can distinguish routine
//! authentication rejections from real directory or configuration problems.
//!
//! Two variants deserve special attention:
//! - `UserNotFound` and `InvalidCredentials` are *expected* outcomes of an
//!   authentication attempt. They must never be logged at error level and
//!   both map to `401 Unauthorized` so the boundary does not leak which of
//!   the two occurred.
//! - `DirectoryConfiguration` is fatal: retrying cannot fix a missing LDAP
//!   host or domain name.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::convert::Infallible;
use thiserror::Error;

/// Main result type used throughout the gateway.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Error types for the identity gateway.
///
/// The `#[error("...")]` attribute from `thiserror` implements the `Display`
/// trait with the given message. The enum is `Clone` because a single-flight
/// failure is broadcast to every waiter of the shared computation.
#[derive(Debug, Error, Clone)]
pub enum IdentityError {
    /// Username or password missing/blank; rejected before any cache or
    /// directory access.
    #[error("Username or password is blank")]
    BlankCredentials,

    /// The directory has no principal with this name.
    #[error("User not found: {username}")]
    UserNotFound { username: String },

    /// The principal exists but the directory rejected the credential bind.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// LDAP connection parameters missing or invalid; fatal, not retried.
    #[error("Directory configuration error: {message}")]
    DirectoryConfiguration { message: String },

    /// Any other directory lookup/bind failure (network, protocol).
    #[error("Directory connection error: {message}")]
    DirectoryConnection { message: String },

    /// Access-token verification failed.
    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String },

    /// Cache subsystem failures (in-flight channel closed, etc.).
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Configuration loading/validation errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Internal errors for unexpected failures.
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// I/O errors (file operations, network errors, etc.)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {message}")]
    Json { message: String },

    /// YAML parsing errors for configuration files.
    #[error("YAML error: {message}")]
    Yaml { message: String },
}

impl IdentityError {
    /// Create a user-not-found error for the given login name.
    pub fn user_not_found<S: Into<String>>(username: S) -> Self {
        Self::UserNotFound {
            username: username.into(),
        }
    }

    /// Create a directory configuration error with a custom message.
    pub fn directory_config<S: Into<String>>(message: S) -> Self {
        Self::DirectoryConfiguration {
            message: message.into(),
        }
    }

    /// Create a directory connection error with a custom message.
    pub fn directory_connection<S: Into<String>>(message: S) -> Self {
        Self::DirectoryConnection {
            message: message.into(),
        }
    }

    /// Create an invalid-token error with a custom reason.
    pub fn invalid_token<S: Into<String>>(reason: S) -> Self {
        Self::InvalidToken {
            reason: reason.into(),
        }
    }

    /// Create a cache error with a custom message.
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a configuration error with a custom message.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error with a custom message.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the appropriate HTTP status code for this error.
    ///
    /// `UserNotFound` and `InvalidCredentials` intentionally share a status
    /// code so callers cannot probe which accounts exist.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BlankCredentials => StatusCode::BAD_REQUEST,
            Self::UserNotFound { .. } => StatusCode::UNAUTHORIZED,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
            Self::DirectoryConfiguration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DirectoryConnection { .. } => StatusCode::BAD_GATEWAY,
            Self::Cache { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Json { .. } => StatusCode::BAD_REQUEST,
            Self::Yaml { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error is a routine authentication rejection.
    ///
    /// Expected rejections are logged at warn level at most; anything else
    /// that reaches the boundary is logged at error level.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::BlankCredentials
                | Self::UserNotFound { .. }
                | Self::InvalidCredentials
                | Self::InvalidToken { .. }
        )
    }

    /// Get a string representation of the error type for API responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::BlankCredentials => "blank_credentials",
            Self::UserNotFound { .. } => "user_not_found",
            Self::InvalidCredentials => "invalid_credentials",
            Self::DirectoryConfiguration { .. } => "directory_configuration_error",
            Self::DirectoryConnection { .. } => "directory_connection_error",
            Self::InvalidToken { .. } => "invalid_token",
            Self::Cache { .. } => "cache_error",
            Self::Configuration { .. } => "configuration_error",
            Self::Internal { .. } => "internal_error",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::Yaml { .. } => "yaml_error",
        }
    }
}

/// Implement conversion from Infallible for middleware compatibility.
impl From<Infallible> for IdentityError {
    fn from(infallible: Infallible) -> Self {
        match infallible {}
    }
}

impl From<std::io::Error> for IdentityError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for IdentityError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

/// Convert errors into HTTP responses with appropriate status codes.
///
/// The response body never echoes which of `UserNotFound` or
/// `InvalidCredentials` occurred; both render the generic authentication
/// failure message while the `type` field stays generic as well.
impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, error_type) = match &self {
            Self::UserNotFound { .. } | Self::InvalidCredentials => (
                "Authentication failed".to_string(),
                "authentication_failed",
            ),
            other => (other.to_string(), other.error_type()),
        };

        let error_response = json!({
            "error": {
                "code": status.as_u16(),
                "message": message,
                "type": error_type,
            }
        });

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            IdentityError::BlankCredentials.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IdentityError::user_not_found("alice").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            IdentityError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            IdentityError::invalid_token("expired").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            IdentityError::directory_config("missing host").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            IdentityError::directory_connection("refused").status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_expected_rejections() {
        assert!(IdentityError::InvalidCredentials.is_expected());
        assert!(IdentityError::user_not_found("bob").is_expected());
        assert!(IdentityError::invalid_token("bad signature").is_expected());
        assert!(!IdentityError::directory_connection("timeout").is_expected());
        assert!(!IdentityError::directory_config("no domain").is_expected());
    }

    #[test]
    fn test_not_found_and_invalid_credentials_share_presentation() {
        // Both must surface identically so login responses cannot be used to
        // enumerate accounts.
        let not_found = IdentityError::user_not_found("alice");
        let invalid = IdentityError::InvalidCredentials;
        assert_eq!(not_found.status_code(), invalid.status_code());
        assert_ne!(not_found.error_type(), invalid.error_type());
    }
}
