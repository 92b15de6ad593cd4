//! # Disunity Framework
//!
//! Handler registration and dispatch for signed interaction webhooks.
//!
//! This layer provides:
//! - Axum-style handlers: async functions whose parameters are extracted
//!   from the interaction context
//! - Descriptor builders and [`Package`]s for bulk registration
//! - The [`Registry`] indexing commands, sub-command trees, components and
//!   autocompletes
//! - The [`PayloadMatcher`] resolving a payload to a handler
//! - The [`Dispatcher`], which runs the two-phase acknowledgement protocol
//!   and implements `tower::Service`
//!
//! ```rust,ignore
//! use disunity_framework::{Dispatcher, Package, Registry, command};
//!
//! async fn ping() -> &'static str {
//!     "pong"
//! }
//!
//! let registry = Registry::new();
//! registry.register_package(Package::new("basic").add_command(command("ping"), ping))?;
//! let dispatcher = Dispatcher::builder(registry, gate).build();
//! ```

pub mod builder;
pub mod context;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod handler;
pub mod matcher;
pub mod registry;

pub use builder::{
    AutocompleteBuilder, CommandBuilder, ComponentBuilder, Package, SubcommandBuilder,
    autocomplete, command, component, subcommand,
};
pub use context::InteractionContext;
pub use descriptor::{Ack, DescriptorKind, HandlerDescriptor, component_key, new_custom_id};
pub use dispatcher::{
    CannedMessages, DispatchResponse, Dispatcher, DispatcherBuilder, ErrorHook, IncomingRequest,
};
pub use error::{
    CallbackError, DispatchError, DispatchResult, ExtractError, ExtractResult, FollowupError,
    FollowupResult, RegistrationError, RegistrationResult,
};
pub use extractor::{CustomId, Focused, FromContext, Invoker, ModalValues, Options, Values};
pub use handler::{BoxedCallback, CallbackResult, Handler, IntoCallbackResult, into_callback};
pub use matcher::{InvocationRecord, InvocationTarget, PayloadMatcher, Resolution};
pub use registry::{CommandEntry, CommandGroupNode, ComponentClaim, Registry, RegistryStats};

/// Shorthand for the context parameter of handlers.
pub type Ctx = std::sync::Arc<InteractionContext>;
