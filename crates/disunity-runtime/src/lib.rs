//! Disunity Runtime - configuration, logging and orchestration.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `DisunityConfig`)
//! - Logging setup from the `[logging]` section (`init_from_config`)
//! - The [`DisunityRuntime`], which builds the signature gate, REST client,
//!   registry and dispatcher from configuration and serves the endpoint
//!
//! # Features
//!
//! - `toml-config` (default) / `yaml-config`: configuration file formats
//! - `json-log`: JSON log lines
//! - `http-server` (default): [`DisunityRuntime::run`]
//! - `http-client` (default): follow-up calls through the REST API
//!
//! ```ignore
//! use disunity_runtime::DisunityRuntime;
//! use disunity_framework::command;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = DisunityRuntime::new()?;
//!     runtime.register(command("ping").handler(|| async { "pong" }))?;
//!
//!     // Serve until Ctrl+C, then drain deferred handlers
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, DisunityConfig, validate_config};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::init_from_config;
pub use runtime::{DisunityRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
