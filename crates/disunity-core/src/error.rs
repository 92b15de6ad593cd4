//! Error types shared by every Disunity layer.
//!
//! Framework-level errors (dispatch, registration, extraction) live in
//! `disunity-framework`.

use thiserror::Error;

// =============================================================================
// Authentication Errors
// =============================================================================

/// Errors raised by the signature gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The request is not signed by the platform.
    ///
    /// Covers missing headers, malformed hex and signature mismatch alike so
    /// that a forged request learns nothing about why it was rejected.
    #[error("invalid request signature")]
    InvalidSignature,

    /// The configured application public key cannot be decoded.
    #[error("invalid application public key: {reason}")]
    InvalidPublicKey {
        /// Reason for failure.
        reason: String,
    },
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised by outbound REST calls.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read.
    #[error("I/O error: {0}")]
    Io(String),

    /// The platform answered with a non-success status code.
    #[error("request returned with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The response body is not valid JSON.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Client credentials could not be obtained.
    #[error("failed to obtain client credentials: {0}")]
    Credentials(String),

    /// Invalid configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Returns the platform error code carried in a JSON error body, such as
    /// `{"code": 10015, "message": "Unknown Webhook"}`.
    pub fn platform_code(&self) -> Option<u64> {
        match self {
            Self::Status { body, .. } => serde_json::from_str::<serde_json::Value>(body)
                .ok()?
                .get("code")?
                .as_u64(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_code_from_json_body() {
        let err = TransportError::Status {
            status: 404,
            body: r#"{"message": "Unknown Webhook", "code": 10015}"#.into(),
        };
        assert_eq!(err.platform_code(), Some(10015));

        let plain = TransportError::Status {
            status: 502,
            body: "Bad Gateway".into(),
        };
        assert_eq!(plain.platform_code(), None);
        assert_eq!(TransportError::Io("reset".into()).platform_code(), None);
    }
}
