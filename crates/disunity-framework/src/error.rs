//! Error types for the Disunity framework.

use thiserror::Error;

use disunity_core::{AuthError, TransportError};

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors that end the processing of one inbound request.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The request failed signature verification.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The body is not a valid interaction payload.
    #[error("malformed interaction payload: {0}")]
    MalformedPayload(String),

    /// The interaction kind code is not one this framework handles.
    #[error("unknown interaction kind {0}")]
    UnknownInteraction(u8),

    /// No command is registered under the resolved path.
    #[error("command '{0}' is not registered")]
    CommandNotFound(String),

    /// No component is registered under the custom identifier prefix.
    #[error("component '{0}' is not registered")]
    ComponentNotFound(String),

    /// No autocomplete is registered for the command.
    #[error("autocomplete for '{0}' is not registered")]
    AutocompleteNotFound(String),

    /// The payload shape does not match the registered handler shape.
    #[error("invalid method use: {0}")]
    InvalidMethodUse(String),
}

impl DispatchError {
    /// Returns the HTTP status code this error is answered with.
    ///
    /// Not-found errors are answered with `200` and an ephemeral message, so
    /// the platform shows something to the user instead of a failure.
    pub fn status(&self) -> u16 {
        match self {
            Self::Auth(_) => 401,
            Self::MalformedPayload(_) | Self::UnknownInteraction(_) => 400,
            Self::CommandNotFound(_)
            | Self::ComponentNotFound(_)
            | Self::AutocompleteNotFound(_) => 200,
            Self::InvalidMethodUse(_) => 500,
        }
    }
}

// =============================================================================
// Registration Errors
// =============================================================================

/// Errors raised while loading handlers into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A plain command and a sub-command tree were registered under one name.
    #[error("invalid method use for '{name}': {reason}")]
    InvalidMethodUse {
        /// Top-level command name.
        name: String,
        /// What conflicted.
        reason: String,
    },
}

// =============================================================================
// Callback Errors
// =============================================================================

/// Errors raised while extracting handler parameters.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The interaction does not carry the requested field.
    #[error("interaction has no {0}")]
    Missing(&'static str),

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Errors raised by a handler invocation.
///
/// These never escape the dispatcher; they end up in the error hook or in a
/// generic error response.
#[derive(Debug, Clone, Error)]
pub enum CallbackError {
    /// A handler parameter could not be extracted.
    #[error("failed to extract handler parameter: {0}")]
    Extract(#[from] ExtractError),

    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

// =============================================================================
// Follow-up Errors
// =============================================================================

/// Errors raised by context operations that talk to the platform.
#[derive(Debug, Clone, Error)]
pub enum FollowupError {
    /// The operation is not valid for this interaction in its current state.
    #[error("invalid method use: {0}")]
    InvalidMethodUse(String),

    /// No REST client is configured.
    #[error("no REST client configured")]
    NoRestClient,

    /// A `channels/...` route was used without a configured bot token.
    #[error("{0} requires a bot token")]
    MissingBotToken(&'static str),

    /// The interaction token is no longer valid for webhook routes.
    #[error("the interaction has expired")]
    Expired,

    /// The REST call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The platform returned a body that is not a message.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for follow-up operations.
pub type FollowupResult<T> = Result<T, FollowupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(DispatchError::Auth(AuthError::InvalidSignature).status(), 401);
        assert_eq!(DispatchError::UnknownInteraction(9).status(), 400);
        assert_eq!(DispatchError::CommandNotFound("x".into()).status(), 200);
        assert_eq!(DispatchError::InvalidMethodUse("x".into()).status(), 500);
    }
}
