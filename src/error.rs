//! Errors returned by the presign server.

#![allow(missing_docs)]

use std::fmt::Display;

use axum::{http::header, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::{config::ConfigError, key::KeyError, signer::SignerError};

/// Result type used throughout the presign server.
pub type Result<T> = core::result::Result<T, ServerError>;

/// Category of a [`ServerError`], which determines the HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServerErrorKind {
    /// A required request field was absent or empty.
    MissingField,
    /// A request field has a value that cannot be used.
    InvalidField,
    /// The request body could not be parsed.
    MalformedRequest,
    /// The HTTP method is not supported on this route.
    MethodNotAllowed,
    /// The server is not configured correctly.
    Configuration,
    /// The storage provider failed to sign the upload.
    Signing,
}

impl Display for ServerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField => write!(f, "MISSING_FIELD"),
            Self::InvalidField => write!(f, "INVALID_FIELD"),
            Self::MalformedRequest => write!(f, "MALFORMED_REQUEST"),
            Self::MethodNotAllowed => write!(f, "METHOD_NOT_ALLOWED"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Signing => write!(f, "SIGNING_FAILURE"),
        }
    }
}

/// Error returned from a presign server operation.
///
/// The `message` is what the caller gets to see. Internal failures carry a
/// generic message, the underlying cause is only written to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerError {
    kind: ServerErrorKind,
    message: String,
}

impl ServerError {
    /// Create a new error of the given kind.
    pub fn new(kind: ServerErrorKind, message: String) -> Self {
        Self { kind, message }
    }

    /// The kind of error.
    pub fn kind(&self) -> ServerErrorKind {
        self.kind
    }

    /// The caller facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn missing_field(message: impl Into<String>) -> Self {
        Self::new(ServerErrorKind::MissingField, message.into())
    }

    pub fn invalid_field(message: impl Into<String>) -> Self {
        Self::new(ServerErrorKind::InvalidField, message.into())
    }

    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::new(ServerErrorKind::MalformedRequest, message.into())
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            ServerErrorKind::MethodNotAllowed,
            "Method not allowed".to_owned(),
        )
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ServerErrorKind::Configuration, message.into())
    }

    pub fn signing(message: impl Into<String>) -> Self {
        Self::new(ServerErrorKind::Signing, message.into())
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            ServerErrorKind::MissingField
            | ServerErrorKind::InvalidField
            | ServerErrorKind::MalformedRequest => StatusCode::BAD_REQUEST,
            ServerErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServerErrorKind::Configuration | ServerErrorKind::Signing => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn into_error_response(self) -> ErrorResponse {
        ErrorResponse {
            error: self.message,
        }
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ServerError {}

impl From<SignerError> for ServerError {
    fn from(err: SignerError) -> Self {
        tracing::error!(error = %err, details = ?err, "failed to sign upload url");
        ServerError::signing("Failed to generate URL")
    }
}

impl From<KeyError> for ServerError {
    fn from(err: KeyError) -> Self {
        ServerError::invalid_field(err.to_string())
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        tracing::error!(error = %err, "presign server is misconfigured");
        ServerError::configuration("Server is not configured")
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(error = %self, "returning error response");
        } else {
            tracing::info!(error = %self, "rejecting request");
        }

        (
            status_code,
            [(
                header::CONTENT_TYPE.as_str(),
                "application/json; charset=utf-8",
            )],
            Json(self.into_error_response()),
        )
            .into_response()
    }
}
