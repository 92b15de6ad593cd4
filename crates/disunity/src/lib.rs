//! # Disunity
//!
//! A typed framework for answering signed interaction webhooks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌───────────────┐     ┌──────────────────┐     ┌──────────────────────────┐
//! │ HTTP server │────▶│ SignatureGate │────▶│  PayloadMatcher  │────▶│ handler (immediate)      │──▶ response
//! │   (axum)    │     │   (Ed25519)   │     │  over Registry   │     │ handler (deferred, task) │──▶ follow-up
//! └─────────────┘     └───────────────┘     └──────────────────┘     └──────────────────────────┘
//! ```
//!
//! - **Runtime**: loads configuration, initializes logging, serves the endpoint
//! - **Dispatcher**: authenticates, resolves and acknowledges each interaction
//! - **Registry**: commands, sub-command trees, components and autocompletes
//! - **Handlers**: user-defined async functions (Axum-style)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use disunity::prelude::*;
//!
//! async fn ping() -> &'static str {
//!     "pong"
//! }
//!
//! async fn slow(ctx: Ctx) -> anyhow::Result<()> {
//!     ctx.followup(MessageBody::text("done"), Vec::new()).await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = DisunityRuntime::new()?;
//!
//!     runtime.register_package(
//!         Package::new("basic")
//!             .add_command(command("ping"), ping)
//!             .add_command(command("slow").defer_ephemeral(), slow),
//!     )?;
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default) / `yaml-config`: configuration file formats
//! - `http-server` (default): serve the interaction endpoint
//! - `http-client` (default): follow-up calls through the REST API
//! - `json-log`: JSON log lines

pub use disunity_core as core;
pub use disunity_framework as framework;
pub use disunity_runtime as runtime;
pub use disunity_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use disunity::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use disunity_runtime::{DisunityConfig, DisunityRuntime};

    // Registration
    pub use disunity_framework::{
        Ack, Package, Registry, autocomplete, command, component, new_custom_id, subcommand,
    };

    // Handlers and extractors
    pub use disunity_framework::{
        Ctx, CustomId, Focused, FromContext, InteractionContext, Invoker, ModalValues, Options,
        Values,
    };

    // Wire model
    pub use disunity_core::{
        Attachment, Interaction, InteractionKind, InteractionResponse, MessageBody, ResponseKind,
    };

    // Errors
    pub use disunity_framework::{CallbackError, FollowupError};
}
