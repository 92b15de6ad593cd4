//! Users and guild members.

use serde::{Deserialize, Serialize};

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Snowflake identifier.
    pub id: String,
    /// Account name.
    pub username: String,
    /// Display name, if set.
    #[serde(default)]
    pub global_name: Option<String>,
    /// Legacy discriminator (`"0"` for migrated accounts).
    #[serde(default)]
    pub discriminator: Option<String>,
    /// Avatar hash.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Public account flags.
    #[serde(default)]
    pub public_flags: Option<u64>,
}

impl User {
    /// Returns the mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Returns the name shown in clients, preferring the global display name.
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

/// A guild member. Present instead of a bare user for guild interactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The underlying user.
    pub user: User,
    /// Guild nickname.
    #[serde(default)]
    pub nick: Option<String>,
    /// Role snowflakes.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Join timestamp (ISO 8601).
    #[serde(default)]
    pub joined_at: Option<String>,
    /// Total permissions of the member in the channel, as a bitset string.
    #[serde(default)]
    pub permissions: Option<String>,
    /// Guild-specific avatar hash.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether the member is deafened in voice.
    #[serde(default)]
    pub deaf: bool,
    /// Whether the member is muted in voice.
    #[serde(default)]
    pub mute: bool,
    /// Whether the member has not yet passed membership screening.
    #[serde(default)]
    pub pending: bool,
}

impl Member {
    /// Returns the member's permission bitset, or `0` when absent or malformed.
    pub fn permission_bits(&self) -> u64 {
        self.permissions
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or(0)
    }
}
