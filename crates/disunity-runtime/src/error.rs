//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use disunity_core::{AuthError, TransportError};
use disunity_framework::RegistrationError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The application public key is unusable.
    #[error("Authentication setup failed: {0}")]
    Auth(#[from] AuthError),

    /// The server or REST client could not be set up.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A handler could not be registered.
    #[error("Registration failed: {0}")]
    Registration(#[from] RegistrationError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
