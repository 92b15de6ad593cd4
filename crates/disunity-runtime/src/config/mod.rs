//! Configuration module for the Disunity runtime.
//!
//! Layered loading of application credentials, endpoint, REST, canned
//! message and logging settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{
    ApplicationConfig, DisunityConfig, HttpConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    MessagesConfig, ServerConfig, SpanEventConfig,
};
pub use validation::validate_config;
