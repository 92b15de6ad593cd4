//! Messages attached to component interactions and returned by follow-ups.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::user::User;

/// Metadata about the interaction that created a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInteraction {
    /// Interaction snowflake.
    pub id: String,
    /// Name of the command that was invoked.
    #[serde(default)]
    pub name: Option<String>,
    /// The user who invoked the interaction.
    pub user: User,
}

/// A channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake identifier.
    pub id: String,
    /// Channel the message lives in.
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Message author.
    #[serde(default)]
    pub author: Option<User>,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Creation timestamp (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Embeds, as raw JSON.
    #[serde(default)]
    pub embeds: Vec<Value>,
    /// Component rows, as raw JSON.
    #[serde(default)]
    pub components: Vec<Value>,
    /// Attachments, as raw JSON.
    #[serde(default)]
    pub attachments: Vec<Value>,
    /// Present when the message is an interaction response.
    #[serde(default)]
    pub interaction: Option<MessageInteraction>,
}

impl Message {
    /// Parses the creation timestamp.
    ///
    /// Returns `None` when the timestamp is absent or not RFC 3339.
    pub fn created_at(&self) -> Option<OffsetDateTime> {
        self.timestamp
            .as_deref()
            .and_then(|ts| OffsetDateTime::parse(ts, &Rfc3339).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_created_at_parses_platform_timestamps() {
        let message: Message = serde_json::from_value(json!({
            "id": "1",
            "timestamp": "2021-05-19T02:12:51.710000+00:00"
        }))
        .unwrap();

        assert_eq!(
            message.created_at(),
            Some(datetime!(2021-05-19 02:12:51.71 UTC))
        );
    }

    #[test]
    fn test_created_at_tolerates_missing_or_bad_timestamps() {
        let missing: Message = serde_json::from_value(json!({ "id": "1" })).unwrap();
        assert_eq!(missing.created_at(), None);

        let bad: Message =
            serde_json::from_value(json!({ "id": "1", "timestamp": "yesterday" })).unwrap();
        assert_eq!(bad.created_at(), None);
    }
}
