//! Interaction response bodies.
//!
//! The first reply to every interaction is an [`InteractionResponse`]: a kind
//! code plus optional kind-specific data. Component and embed payloads are
//! kept as raw JSON; building them is left to the application.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};

/// Message flag limiting visibility to the invoking user.
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

/// The kind of an interaction response (`type` of the response body).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// Acknowledges a ping.
    Pong,
    /// Responds with a message.
    ChannelMessage,
    /// Acknowledges now, shows a loading state, message follows later.
    DeferredChannelMessage,
    /// Acknowledges a component now, the message may be edited later.
    DeferredUpdateMessage,
    /// Edits the message the component is attached to.
    UpdateMessage,
    /// Responds to an autocomplete query with choices.
    AutocompleteResult,
    /// Responds with a modal form.
    Modal,
}

impl ResponseKind {
    /// Returns the wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::Pong => 1,
            Self::ChannelMessage => 4,
            Self::DeferredChannelMessage => 5,
            Self::DeferredUpdateMessage => 6,
            Self::UpdateMessage => 7,
            Self::AutocompleteResult => 8,
            Self::Modal => 9,
        }
    }

    /// Maps a wire code to a kind.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::Pong,
            4 => Self::ChannelMessage,
            5 => Self::DeferredChannelMessage,
            6 => Self::DeferredUpdateMessage,
            7 => Self::UpdateMessage,
            8 => Self::AutocompleteResult,
            9 => Self::Modal,
            _ => return None,
        })
    }

    /// Returns `true` for the two placeholder acknowledgements.
    pub fn is_deferred(self) -> bool {
        matches!(
            self,
            Self::DeferredChannelMessage | Self::DeferredUpdateMessage
        )
    }
}

impl Serialize for ResponseKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for ResponseKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown response kind {code}")))
    }
}

// =============================================================================
// MessageBody
// =============================================================================

/// The content of a message sent as a response, follow-up or edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Embeds, as raw JSON.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Value>,
    /// Component rows, as raw JSON.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Value>,
    /// Message flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl MessageBody {
    /// Creates an empty message body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a message body with text content.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Sets the text content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Appends an embed.
    pub fn embed(mut self, embed: Value) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Appends a component row.
    pub fn component_row(mut self, row: Value) -> Self {
        self.components.push(row);
        self
    }

    /// Marks the message as visible to the invoking user only.
    pub fn ephemeral(mut self) -> Self {
        self.flags = Some(self.flags.unwrap_or(0) | EPHEMERAL_FLAG);
        self
    }

    /// Returns `true` if the ephemeral flag is set.
    pub fn is_ephemeral(&self) -> bool {
        self.flags.is_some_and(|f| f & EPHEMERAL_FLAG != 0)
    }

    /// Converts the body to a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

impl From<&str> for MessageBody {
    fn from(content: &str) -> Self {
        Self::text(content)
    }
}

impl From<String> for MessageBody {
    fn from(content: String) -> Self {
        Self::text(content)
    }
}

// =============================================================================
// InteractionResponse
// =============================================================================

/// The structured body returned as the first response to an interaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InteractionResponse {
    /// Response kind.
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    /// Kind-specific data.
    #[serde(default)]
    pub data: Option<Value>,
}

impl Serialize for InteractionResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.data.is_some() { 2 } else { 1 };
        let mut state = serializer.serialize_struct("InteractionResponse", len)?;
        state.serialize_field("type", &self.kind)?;
        if let Some(data) = &self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

impl InteractionResponse {
    /// Creates a response of the given kind without data.
    pub fn new(kind: ResponseKind) -> Self {
        Self { kind, data: None }
    }

    /// Creates a response of the given kind with data.
    pub fn with_data(kind: ResponseKind, data: Value) -> Self {
        Self {
            kind,
            data: Some(data),
        }
    }

    /// Acknowledges a ping.
    pub fn pong() -> Self {
        Self::new(ResponseKind::Pong)
    }

    /// Responds with a message.
    pub fn message(body: impl Into<MessageBody>) -> Self {
        Self::with_data(ResponseKind::ChannelMessage, body.into().to_value())
    }

    /// Responds with a message only the invoking user can see.
    pub fn ephemeral_message(content: impl Into<String>) -> Self {
        Self::message(MessageBody::text(content).ephemeral())
    }

    /// Edits the message a component is attached to.
    pub fn update(body: impl Into<MessageBody>) -> Self {
        Self::with_data(ResponseKind::UpdateMessage, body.into().to_value())
    }

    /// Placeholder acknowledgement of the given deferred kind.
    ///
    /// The ephemeral flag is carried in `data.flags` when requested.
    pub fn deferred(kind: ResponseKind, ephemeral: bool) -> Self {
        if ephemeral {
            Self::with_data(kind, json!({ "flags": EPHEMERAL_FLAG }))
        } else {
            Self::new(kind)
        }
    }

    /// Responds to an autocomplete query.
    ///
    /// `choices` is a list of `{ "name": ..., "value": ... }` objects.
    pub fn autocomplete(choices: Vec<Value>) -> Self {
        Self::with_data(ResponseKind::AutocompleteResult, json!({ "choices": choices }))
    }

    /// Responds with a modal form, given as raw JSON.
    pub fn modal(modal: Value) -> Self {
        Self::with_data(ResponseKind::Modal, modal)
    }

    /// Returns `true` if `data.flags` carries the ephemeral bit.
    pub fn is_ephemeral(&self) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.get("flags"))
            .and_then(Value::as_u64)
            .is_some_and(|f| f & EPHEMERAL_FLAG != 0)
    }

    /// Converts the response to a JSON value.
    pub fn to_value(&self) -> Value {
        match &self.data {
            Some(data) => json!({ "type": self.kind.code(), "data": data }),
            None => json!({ "type": self.kind.code() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pong_serializes_to_type_only() {
        assert_eq!(
            serde_json::to_value(InteractionResponse::pong()).unwrap(),
            json!({ "type": 1 })
        );
    }

    #[test]
    fn test_deferred_ephemeral_carries_flag() {
        let response = InteractionResponse::deferred(ResponseKind::DeferredChannelMessage, true);
        assert_eq!(response.to_value(), json!({ "type": 5, "data": { "flags": 64 } }));
        assert!(response.is_ephemeral());

        let public = InteractionResponse::deferred(ResponseKind::DeferredUpdateMessage, false);
        assert_eq!(public.to_value(), json!({ "type": 6 }));
        assert!(!public.is_ephemeral());
    }

    #[test]
    fn test_ephemeral_message_body() {
        let response = InteractionResponse::ephemeral_message("hidden");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "type": 4, "data": { "content": "hidden", "flags": 64 } })
        );
    }

    #[test]
    fn test_response_deserializes_known_kinds_only() {
        let ok: InteractionResponse =
            serde_json::from_value(json!({ "type": 7, "data": { "content": "x" } })).unwrap();
        assert_eq!(ok.kind, ResponseKind::UpdateMessage);

        assert!(serde_json::from_value::<InteractionResponse>(json!({ "type": 2 })).is_err());
    }

    #[test]
    fn test_message_body_builder() {
        let body = MessageBody::new()
            .content("hi")
            .embed(json!({ "title": "t" }))
            .ephemeral();
        assert!(body.is_ephemeral());
        assert_eq!(
            body.to_value(),
            json!({ "content": "hi", "embeds": [{ "title": "t" }], "flags": 64 })
        );
    }
}
