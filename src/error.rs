//! Error types for registry and dashboard operations.
//!
//! Every failure is reported once, to the caller of the operation that
//! failed. Nothing in this crate retries on its own.

use thiserror::Error;

/// A required field of a proxy record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    /// Display label.
    Name,
    /// Address of the internal service.
    TargetUrl,
}

impl RequiredField {
    /// Wire name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            RequiredField::Name => "name",
            RequiredField::TargetUrl => "target_url",
        }
    }
}

impl std::fmt::Display for RequiredField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A required field was empty; raised before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} is required")]
pub struct ValidationError {
    /// The offending field.
    pub field: RequiredField,
}

impl ValidationError {
    /// Check that `value` has visible content.
    pub fn require(field: RequiredField, value: &str) -> std::result::Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError { field })
        } else {
            Ok(())
        }
    }
}

/// Non-success response or transport failure from the registry API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    /// Human-readable description, suitable for a banner.
    pub message: String,
    /// HTTP status, or `None` when the request never got a response.
    pub status: Option<u16>,
}

impl RemoteError {
    /// A failure that produced an HTTP response.
    pub fn status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    /// A failure below HTTP (connect, timeout, undecodable body).
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }
}

/// Errors surfaced by registry and dashboard operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Input rejected locally; no request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The registry API call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The session was torn down before the operation could finish.
    #[error("dashboard session has been disposed")]
    Disposed,
}

/// Result type alias for registry and dashboard operations.
pub type Result<T> = std::result::Result<T, Error>;
