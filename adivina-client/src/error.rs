//! Error types for adivina-client
//!
//! Only transport-level failures are errors here. Stale hint responses,
//! missing previews and blocked playback are ordinary states the controller
//! handles without an error value.

use thiserror::Error;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Request never produced a response (connection refused, timeout, ...)
    #[error("Network error: {0}")]
    Transport(String),

    /// Server answered with a non-2xx status
    #[error("HTTP {status}{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status { status: u16, message: Option<String> },

    /// Response body was not the expected JSON
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration and other shared errors
    #[error(transparent)]
    Common(#[from] adivina_common::Error),
}

/// Convenience Result type using ClientError
pub type Result<T> = std::result::Result<T, ClientError>;
