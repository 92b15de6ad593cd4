//! # Disunity Core
//!
//! The core building blocks of the Disunity interactions framework.
//!
//! This crate has no opinion about how requests reach the process or how
//! handlers are organised. It provides:
//!
//! - **Wire model**: the inbound interaction payload ([`Interaction`]) and the
//!   outbound response body ([`InteractionResponse`]), together with the
//!   numeric kind codes used by the platform.
//! - **Signature gate**: Ed25519 verification of `timestamp || body`
//!   ([`SignatureGate`]).
//! - **REST seam**: the [`RestClient`] trait used for follow-up calls once an
//!   interaction has been acknowledged.
//!
//! ```text
//! raw request ──▶ SignatureGate ──▶ Interaction ──▶ (framework) ──▶ InteractionResponse
//!                                                         │
//!                                                         └──▶ RestClient (follow-ups)
//! ```

pub mod error;
pub mod model;
pub mod rest;
pub mod signature;

pub use error::{AuthError, AuthResult, TransportError, TransportResult};
pub use model::{
    ApplicationCommandKind, CommandOption, EPHEMERAL_FLAG, Interaction, InteractionData,
    InteractionKind, InteractionResponse, Member, Message, MessageBody, MessageInteraction,
    OptionKind, ResponseKind, User,
};
pub use rest::{Attachment, HttpMethod, RestClient};
pub use signature::{SIGNATURE_HEADER, SignatureGate, TIMESTAMP_HEADER, verify};
