//! The inbound interaction payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::Message;
use super::user::{Member, User};

// =============================================================================
// Kind codes
// =============================================================================

/// The kind of an interaction (`type` at the payload root).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// Liveness check sent when the endpoint is configured.
    Ping,
    /// A slash, user or message command.
    ApplicationCommand,
    /// A button or select menu interaction.
    MessageComponent,
    /// An autocomplete query for a command option.
    Autocomplete,
    /// A modal form submission.
    ModalSubmit,
    /// Any code this crate does not know about.
    Unknown(u8),
}

impl InteractionKind {
    /// Maps a wire code to a kind.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            other => Self::Unknown(other),
        }
    }

    /// Returns the wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::Ping => 1,
            Self::ApplicationCommand => 2,
            Self::MessageComponent => 3,
            Self::Autocomplete => 4,
            Self::ModalSubmit => 5,
            Self::Unknown(code) => code,
        }
    }
}

/// The kind of an application command (`data.type`).
///
/// Commands are bucketed by this code in the registry; codes outside the
/// known set are kept as-is so they get a bucket of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApplicationCommandKind(pub u8);

impl ApplicationCommandKind {
    /// Slash commands typed in the chat input.
    pub const CHAT_INPUT: Self = Self(1);
    /// Commands from a user's context menu.
    pub const USER: Self = Self(2);
    /// Commands from a message's context menu.
    pub const MESSAGE: Self = Self(3);
}

impl Default for ApplicationCommandKind {
    fn default() -> Self {
        Self::CHAT_INPUT
    }
}

/// The kind of a command option (`options[].type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionKind(pub u8);

impl OptionKind {
    pub const SUB_COMMAND: Self = Self(1);
    pub const SUB_COMMAND_GROUP: Self = Self(2);
    pub const STRING: Self = Self(3);
    pub const INTEGER: Self = Self(4);
    pub const BOOLEAN: Self = Self(5);
    pub const USER: Self = Self(6);
    pub const CHANNEL: Self = Self(7);
    pub const ROLE: Self = Self(8);
    pub const MENTIONABLE: Self = Self(9);
    pub const NUMBER: Self = Self(10);
    pub const ATTACHMENT: Self = Self(11);
}

// =============================================================================
// Payload
// =============================================================================

/// One option of a command invocation.
///
/// Sub-commands and sub-command groups are options too; they carry their
/// children in `options` instead of a `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    /// Option name.
    pub name: String,
    /// Option kind code.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Option value, for leaf options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Nested options, for sub-commands and groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<CommandOption>>,
    /// Set on the option the user is typing in, for autocomplete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
}

impl CommandOption {
    /// Returns the option kind.
    pub fn option_kind(&self) -> OptionKind {
        OptionKind(self.kind)
    }

    /// Returns `true` for sub-command options.
    pub fn is_subcommand(&self) -> bool {
        self.option_kind() == OptionKind::SUB_COMMAND
    }

    /// Returns `true` for sub-command group options.
    pub fn is_subcommand_group(&self) -> bool {
        self.option_kind() == OptionKind::SUB_COMMAND_GROUP
    }

    /// Returns the nested options, or an empty slice.
    pub fn children(&self) -> &[CommandOption] {
        self.options.as_deref().unwrap_or_default()
    }

    /// Returns `true` if this option is focused for autocomplete.
    pub fn is_focused(&self) -> bool {
        self.focused.unwrap_or(false)
    }
}

/// The `data` object of an interaction.
///
/// Commands fill `name`/`options`, components fill `custom_id`/`values`,
/// modal submissions fill `custom_id`/`components`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionData {
    /// Command snowflake.
    #[serde(default)]
    pub id: Option<String>,
    /// Command name.
    #[serde(default)]
    pub name: Option<String>,
    /// Application command kind code.
    #[serde(rename = "type", default)]
    pub kind: Option<u8>,
    /// Command options.
    #[serde(default)]
    pub options: Option<Vec<CommandOption>>,
    /// Resolved users, members, roles, channels and attachments.
    #[serde(default)]
    pub resolved: Option<Value>,
    /// Custom identifier of a component or modal.
    #[serde(default)]
    pub custom_id: Option<String>,
    /// Component kind code.
    #[serde(default)]
    pub component_type: Option<u8>,
    /// Selected values of a select menu.
    #[serde(default)]
    pub values: Vec<String>,
    /// Submitted modal rows.
    #[serde(default)]
    pub components: Vec<Value>,
    /// Target of a user or message command.
    #[serde(default)]
    pub target_id: Option<String>,
}

impl InteractionData {
    /// Returns the application command kind, defaulting to chat input.
    pub fn command_kind(&self) -> ApplicationCommandKind {
        self.kind
            .map(ApplicationCommandKind)
            .unwrap_or_default()
    }
}

/// An inbound interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Interaction snowflake.
    pub id: String,
    /// Application snowflake.
    #[serde(default)]
    pub application_id: Option<String>,
    /// Interaction kind code.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Kind-specific data. Absent for pings.
    #[serde(default)]
    pub data: Option<InteractionData>,
    /// Guild the interaction was sent from.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Channel the interaction was sent from.
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Guild member, for guild interactions.
    #[serde(default)]
    pub member: Option<Member>,
    /// User, for direct-message interactions.
    #[serde(default)]
    pub user: Option<User>,
    /// Continuation token for follow-ups.
    #[serde(default)]
    pub token: String,
    /// Message the component is attached to.
    #[serde(default)]
    pub message: Option<Message>,
    /// Selected language of the invoking user.
    #[serde(default)]
    pub locale: Option<String>,
    /// Permissions of the application in the channel, as a bitset string.
    #[serde(default)]
    pub app_permissions: Option<String>,
}

impl Interaction {
    /// Returns the decoded interaction kind.
    pub fn interaction_kind(&self) -> InteractionKind {
        InteractionKind::from_code(self.kind)
    }

    /// Returns the user who triggered this interaction.
    ///
    /// Guild interactions carry a member, direct messages a bare user.
    pub fn user(&self) -> Option<&User> {
        self.member
            .as_ref()
            .map(|m| &m.user)
            .or(self.user.as_ref())
    }

    /// Returns the `data` object, or an empty one.
    pub fn data(&self) -> &InteractionData {
        static EMPTY: InteractionData = InteractionData {
            id: None,
            name: None,
            kind: None,
            options: None,
            resolved: None,
            custom_id: None,
            component_type: None,
            values: Vec::new(),
            components: Vec::new(),
            target_id: None,
        };
        self.data.as_ref().unwrap_or(&EMPTY)
    }
}
