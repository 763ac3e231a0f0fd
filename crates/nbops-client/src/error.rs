//! Typed failures returned by the NocoBase API.
//!
//! # Design
//! - Callers branch on variants, never on message text.
//! - [`classify_response`] is the only place that inspects server messages
//!   for uniqueness markers.

use serde_json::Value;
use thiserror::Error;

/// Server error codes that signal a uniqueness violation.
const UNIQUE_CODES: &[&str] = &["SequelizeUniqueConstraintError", "UNIQUE_VIOLATION", "DUPLICATE"];
/// Lower-case message fragments that signal a uniqueness violation.
const UNIQUE_MARKERS: &[&str] = &["already exists", "duplicate", "unique"];

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// No response was received (DNS failure, refused connection, timeout).
    #[error("connection failed: {message}")]
    Connectivity {
        /// Transport error description.
        message: String,
    },
    /// The server answered with a 5xx status.
    #[error("server error (status {status}): {message}")]
    Transient {
        /// HTTP status code.
        status: u16,
        /// Server message.
        message: String,
    },
    /// The object already exists.
    #[error("already exists (status {status}): {message}")]
    AlreadyExists {
        /// HTTP status code.
        status: u16,
        /// Server message.
        message: String,
    },
    /// The addressed resource does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Server message.
        message: String,
    },
    /// Missing or insufficient credentials.
    #[error("unauthorized (status {status}): {message}")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
        /// Server message.
        message: String,
    },
    /// The server rejected the payload.
    #[error("validation failed (status {status}): {message}")]
    Validation {
        /// HTTP status code.
        status: u16,
        /// Server message.
        message: String,
    },
    /// Any other non-success status.
    #[error("request failed (status {status}): {message}")]
    Unknown {
        /// HTTP status code.
        status: u16,
        /// Server message.
        message: String,
    },
    /// A success response carried a body that is not JSON.
    #[error("invalid response body: {message}")]
    Decode {
        /// Parser error description.
        message: String,
    },
    /// The request could not be built locally (bad path or query).
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },
}

/// Convenience alias for remote call results.
pub type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    /// Whether the retry policy may try the call again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity { .. } | Self::Transient { .. })
    }

    /// Whether the failure means the object is already present.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Whether the addressed resource is missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether no response was received at all.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    /// HTTP status when the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. }
            | Self::AlreadyExists { status, .. }
            | Self::Unauthorized { status, .. }
            | Self::Validation { status, .. }
            | Self::Unknown { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Connectivity { .. } | Self::Decode { .. } | Self::InvalidRequest { .. } => None,
        }
    }
}

/// Failure while constructing the HTTP transport.
#[derive(Debug, Error)]
pub enum TransportBuildError {
    /// A header value contained characters HTTP does not allow.
    #[error("header {name} contains invalid characters")]
    InvalidHeader {
        /// Header name.
        name: &'static str,
    },
    /// reqwest refused the client configuration.
    #[error("failed to build HTTP client")]
    Client {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
}

/// Map a non-success status and its body onto a [`RemoteError`].
#[must_use]
pub fn classify_response(status: u16, body: &str) -> RemoteError {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(server_message)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("status {status}")
            } else {
                trimmed.to_string()
            }
        });

    match status {
        409 => RemoteError::AlreadyExists { status, message },
        400 | 422 if signals_uniqueness(parsed.as_ref(), &message) => {
            RemoteError::AlreadyExists { status, message }
        }
        400 | 422 => RemoteError::Validation { status, message },
        401 | 403 => RemoteError::Unauthorized { status, message },
        404 => RemoteError::NotFound { message },
        500..=u16::MAX => RemoteError::Transient { status, message },
        _ => RemoteError::Unknown { status, message },
    }
}

fn server_message(body: &Value) -> Option<String> {
    body.pointer("/errors/0/message")
        .and_then(Value::as_str)
        .or_else(|| body.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

fn signals_uniqueness(body: Option<&Value>, message: &str) -> bool {
    let code_matches = body.is_some_and(|body| {
        ["/errors/0/code", "/errors/0/name", "/code", "/name"]
            .iter()
            .filter_map(|pointer| body.pointer(pointer).and_then(Value::as_str))
            .any(|code| UNIQUE_CODES.contains(&code))
    });
    let lowered = message.to_lowercase();
    code_matches || UNIQUE_MARKERS.iter().any(|marker| lowered.contains(marker))
}
