//! Wire model for interactions.
//!
//! Everything here mirrors the JSON exchanged with the platform. Types are
//! deliberately lenient on input (unknown fields are ignored, most fields are
//! optional) because payload shapes vary across interaction kinds.

pub mod interaction;
pub mod message;
pub mod response;
pub mod user;

pub use interaction::{
    ApplicationCommandKind, CommandOption, Interaction, InteractionData, InteractionKind,
    OptionKind,
};
pub use message::{Message, MessageInteraction};
pub use response::{EPHEMERAL_FLAG, InteractionResponse, MessageBody, ResponseKind};
pub use user::{Member, User};
