//! The per-interaction context handed to handlers.
//!
//! One [`InteractionContext`] is created per dispatched interaction and
//! shared through an `Arc`. It exposes the payload, the options injected by
//! the matcher, response helpers, and follow-up operations that go through
//! the REST client once the interaction has been acknowledged.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::debug;

use disunity_core::{
    Attachment, CommandOption, HttpMethod, Interaction, InteractionKind, InteractionResponse,
    Member, Message, MessageBody, ResponseKind, RestClient, TransportError, User,
};

use crate::descriptor::HandlerDescriptor;
use crate::error::{FollowupError, FollowupResult, RegistrationResult};
use crate::registry::Registry;

/// The context of one interaction.
pub struct InteractionContext {
    interaction: Arc<Interaction>,
    raw: Arc<Value>,
    options: Vec<CommandOption>,
    application_id: String,
    rest: Option<Arc<dyn RestClient>>,
    registry: Registry,
    acknowledged: AtomicBool,
}

impl InteractionContext {
    pub(crate) fn new(
        interaction: Arc<Interaction>,
        raw: Arc<Value>,
        options: Vec<CommandOption>,
        application_id: String,
        rest: Option<Arc<dyn RestClient>>,
        registry: Registry,
    ) -> Self {
        Self {
            interaction,
            raw,
            options,
            application_id,
            rest,
            registry,
            acknowledged: AtomicBool::new(false),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the parsed payload.
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub(crate) fn interaction_arc(&self) -> Arc<Interaction> {
        Arc::clone(&self.interaction)
    }

    /// Returns the payload as received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Returns the interaction kind.
    pub fn kind(&self) -> InteractionKind {
        self.interaction.interaction_kind()
    }

    /// Returns the interaction snowflake.
    pub fn id(&self) -> &str {
        &self.interaction.id
    }

    /// Returns the continuation token.
    pub fn token(&self) -> &str {
        &self.interaction.token
    }

    /// Returns the application snowflake used for follow-ups.
    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    /// Returns the channel the interaction was sent from.
    pub fn channel_id(&self) -> Option<&str> {
        self.interaction.channel_id.as_deref()
    }

    /// Returns the guild, for guild interactions.
    pub fn guild_id(&self) -> Option<&str> {
        self.interaction.guild_id.as_deref()
    }

    /// Returns the invoking user's locale.
    pub fn locale(&self) -> Option<&str> {
        self.interaction.locale.as_deref()
    }

    /// Returns the top-level command name, for commands and autocompletes.
    pub fn command_name(&self) -> Option<&str> {
        self.interaction.data().name.as_deref()
    }

    /// Returns the options injected for this invocation.
    pub fn options(&self) -> &[CommandOption] {
        &self.options
    }

    /// Returns the injected option with the given name.
    pub fn option(&self, name: &str) -> Option<&CommandOption> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Returns the option the user is typing in, for autocompletes.
    pub fn focused_option(&self) -> Option<&CommandOption> {
        self.options.iter().find(|o| o.is_focused())
    }

    /// Returns resolved users, members, roles, channels and attachments.
    pub fn resolved(&self) -> Option<&Value> {
        self.interaction.data().resolved.as_ref()
    }

    /// Returns the custom identifier of the component or modal.
    pub fn custom_id(&self) -> Option<&str> {
        self.interaction.data().custom_id.as_deref()
    }

    /// Returns the component type, e.g. `2` for buttons.
    pub fn component_type(&self) -> Option<u8> {
        self.interaction.data().component_type
    }

    /// Returns the selected values of a select menu.
    pub fn values(&self) -> &[String] {
        &self.interaction.data().values
    }

    /// Collects the submitted text inputs of a modal, keyed by the input's
    /// custom identifier.
    pub fn modal_values(&self) -> HashMap<String, String> {
        self.interaction
            .data()
            .components
            .iter()
            .flat_map(|row| {
                row.get("components")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
            })
            .filter_map(|input| {
                let id = input.get("custom_id")?.as_str()?;
                let value = input.get("value")?.as_str()?;
                Some((id.to_owned(), value.to_owned()))
            })
            .collect()
    }

    /// Returns the user who triggered the interaction.
    pub fn invoker(&self) -> Option<&User> {
        self.interaction.user()
    }

    /// Returns the user who used a component. Same as [`invoker`](Self::invoker).
    pub fn used_by(&self) -> Option<&User> {
        self.invoker()
    }

    /// Returns the invoking guild member, for guild interactions.
    pub fn member(&self) -> Option<&Member> {
        self.interaction.member.as_ref()
    }

    /// Returns the message a component is attached to.
    pub fn message(&self) -> Option<&Message> {
        self.interaction.message.as_ref()
    }

    /// Checks whether the user using a component is the user who invoked the
    /// interaction that created the component's message.
    ///
    /// Returns `Ok(false)` when the message carries no interaction metadata.
    pub fn check_user(&self) -> FollowupResult<bool> {
        if self.kind() != InteractionKind::MessageComponent {
            return Err(FollowupError::InvalidMethodUse(
                "check_user is only available for component interactions".into(),
            ));
        }
        let original = self
            .message()
            .and_then(|m| m.interaction.as_ref())
            .map(|i| i.user.id.as_str());
        let current = self.used_by().map(|u| u.id.as_str());
        Ok(original.is_some() && original == current)
    }

    // =========================================================================
    // Responses
    // =========================================================================

    /// Returns `true` once the first response has been sent.
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_acknowledged(&self) {
        self.acknowledged.store(true, Ordering::SeqCst);
    }

    /// Builds a channel message response.
    pub fn reply(&self, body: impl Into<MessageBody>) -> InteractionResponse {
        InteractionResponse::message(body)
    }

    /// Builds a response editing the component's message.
    pub fn update(&self, body: impl Into<MessageBody>) -> InteractionResponse {
        InteractionResponse::update(body)
    }

    /// Builds a modal response.
    pub fn modal(&self, modal: Value) -> InteractionResponse {
        InteractionResponse::modal(modal)
    }

    /// Builds an autocomplete response.
    pub fn autocomplete(&self, choices: Vec<Value>) -> InteractionResponse {
        InteractionResponse::autocomplete(choices)
    }

    /// Builds the placeholder acknowledgement for this interaction kind.
    pub fn defer(&self) -> InteractionResponse {
        InteractionResponse::deferred(self.deferred_kind(), false)
    }

    /// Returns the deferred acknowledgement kind for this interaction.
    ///
    /// Components, and modals submitted from a component, acknowledge with a
    /// deferred update. Everything else acknowledges with a deferred message.
    pub fn deferred_kind(&self) -> ResponseKind {
        match self.kind() {
            InteractionKind::MessageComponent => ResponseKind::DeferredUpdateMessage,
            InteractionKind::ModalSubmit if self.interaction.message.is_some() => {
                ResponseKind::DeferredUpdateMessage
            }
            _ => ResponseKind::DeferredChannelMessage,
        }
    }

    // =========================================================================
    // Follow-ups
    // =========================================================================

    fn rest(&self) -> FollowupResult<&Arc<dyn RestClient>> {
        if !self.is_acknowledged() {
            return Err(FollowupError::InvalidMethodUse(
                "the interaction has not been acknowledged yet".into(),
            ));
        }
        self.rest.as_ref().ok_or(FollowupError::NoRestClient)
    }

    fn bot_rest(&self, operation: &'static str) -> FollowupResult<&Arc<dyn RestClient>> {
        let rest = self.rest.as_ref().ok_or(FollowupError::NoRestClient)?;
        if !rest.has_bot_token() {
            return Err(FollowupError::MissingBotToken(operation));
        }
        Ok(rest)
    }

    fn webhook_route(&self) -> String {
        format!("webhooks/{}/{}", self.application_id, self.interaction.token)
    }

    /// Sends a follow-up message, with optional file uploads.
    pub async fn followup(
        &self,
        body: impl Into<MessageBody>,
        files: Vec<Attachment>,
    ) -> FollowupResult<Message> {
        let rest = self.rest()?;
        let value = rest
            .request(
                HttpMethod::Post,
                &self.webhook_route(),
                Some(body.into().to_value()),
                files,
            )
            .await
            .map_err(webhook_error)?;
        debug!(interaction = %self.id(), "Follow-up sent");
        decode_message(value)
    }

    /// Edits the first response.
    pub async fn edit_original(&self, body: impl Into<MessageBody>) -> FollowupResult<Message> {
        self.edit_message("@original", body).await
    }

    /// Deletes the first response.
    pub async fn delete_original(&self) -> FollowupResult<()> {
        self.delete_message("@original").await
    }

    /// Edits a message sent in response to this interaction.
    pub async fn edit_message(
        &self,
        message_id: &str,
        body: impl Into<MessageBody>,
    ) -> FollowupResult<Message> {
        let rest = self.rest()?;
        let route = format!("{}/messages/{message_id}", self.webhook_route());
        let value = rest
            .request(HttpMethod::Patch, &route, Some(body.into().to_value()), Vec::new())
            .await
            .map_err(webhook_error)?;
        decode_message(value)
    }

    /// Deletes a message sent in response to this interaction.
    pub async fn delete_message(&self, message_id: &str) -> FollowupResult<()> {
        let rest = self.rest()?;
        let route = format!("{}/messages/{message_id}", self.webhook_route());
        rest.request(HttpMethod::Delete, &route, None, Vec::new())
            .await
            .map_err(webhook_error)?;
        Ok(())
    }

    /// Edits any message through the bot's own channel route.
    ///
    /// Unlike [`edit_message`](Self::edit_message) this does not depend on
    /// the interaction token, so it keeps working after the token expires.
    /// Requires a bot token.
    pub async fn edit_as_bot(
        &self,
        channel_id: &str,
        message_id: &str,
        body: impl Into<MessageBody>,
    ) -> FollowupResult<Message> {
        let rest = self.bot_rest("edit_as_bot")?;
        let route = format!("channels/{channel_id}/messages/{message_id}");
        let value = rest
            .request(HttpMethod::Patch, &route, Some(body.into().to_value()), Vec::new())
            .await?;
        debug!(channel = channel_id, message = message_id, "Message edited as bot");
        decode_message(value)
    }

    /// Deletes any message through the bot's own channel route. Requires a
    /// bot token.
    pub async fn delete_as_bot(&self, channel_id: &str, message_id: &str) -> FollowupResult<()> {
        let rest = self.bot_rest("delete_as_bot")?;
        let route = format!("channels/{channel_id}/messages/{message_id}");
        rest.request(HttpMethod::Delete, &route, None, Vec::new())
            .await?;
        Ok(())
    }

    /// Delivers the result of a deferred handler.
    ///
    /// Messages become a follow-up, updates edit the original response.
    /// Returns `Ok(false)` for response kinds that cannot be delivered late.
    pub(crate) async fn deliver(&self, response: InteractionResponse) -> FollowupResult<bool> {
        let (method, route) = match response.kind {
            ResponseKind::ChannelMessage => (HttpMethod::Post, self.webhook_route()),
            ResponseKind::UpdateMessage => (
                HttpMethod::Patch,
                format!("{}/messages/@original", self.webhook_route()),
            ),
            _ => return Ok(false),
        };
        let rest = self.rest()?;
        rest.request(method, &route, response.data, Vec::new())
            .await
            .map_err(webhook_error)?;
        Ok(true)
    }

    // =========================================================================
    // Runtime registration
    // =========================================================================

    /// Registers a handler while the application is running, typically a
    /// component created for the message this handler is about to send.
    pub fn register(&self, descriptor: HandlerDescriptor) -> RegistrationResult<()> {
        self.registry.register(descriptor)
    }

    /// Returns the shared registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Unknown webhook, and invalid webhook token.
const EXPIRED_CODES: [u64; 2] = [10015, 50027];

fn webhook_error(err: TransportError) -> FollowupError {
    match err.platform_code() {
        Some(code) if EXPIRED_CODES.contains(&code) => FollowupError::Expired,
        _ => FollowupError::Transport(err),
    }
}

fn decode_message(value: Value) -> FollowupResult<Message> {
    serde_json::from_value(value).map_err(|e| FollowupError::Decode(e.to_string()))
}

impl std::fmt::Debug for InteractionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionContext")
            .field("id", &self.interaction.id)
            .field("kind", &self.kind())
            .field("options", &self.options.len())
            .field("acknowledged", &self.is_acknowledged())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use disunity_core::TransportResult;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Records every call and answers with a fixed message body, or with
    /// `error` when set.
    #[derive(Default)]
    pub(crate) struct RecordingClient {
        pub(crate) calls: Mutex<Vec<(HttpMethod, String, Option<Value>, usize)>>,
        pub(crate) error: Option<TransportError>,
        pub(crate) bot: bool,
    }

    impl RecordingClient {
        fn failing(status: u16, body: &str) -> Self {
            Self {
                error: Some(TransportError::Status {
                    status,
                    body: body.into(),
                }),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl RestClient for RecordingClient {
        async fn request(
            &self,
            method: HttpMethod,
            route: &str,
            body: Option<Value>,
            files: Vec<Attachment>,
        ) -> TransportResult<Value> {
            self.calls
                .lock()
                .push((method, route.to_owned(), body, files.len()));
            if let Some(err) = &self.error {
                return Err(err.clone());
            }
            if method == HttpMethod::Delete {
                return Ok(Value::Null);
            }
            Ok(json!({ "id": "900", "content": "sent" }))
        }

        fn has_bot_token(&self) -> bool {
            self.bot
        }
    }

    pub(crate) fn context(payload: Value, rest: Option<Arc<dyn RestClient>>) -> InteractionContext {
        let interaction: Interaction = serde_json::from_value(payload.clone()).unwrap();
        InteractionContext::new(
            Arc::new(interaction),
            Arc::new(payload),
            Vec::new(),
            "app".into(),
            rest,
            Registry::new(),
        )
    }

    fn component_payload(clicker: &str, invoker: &str) -> Value {
        json!({
            "id": "1",
            "type": 3,
            "token": "tok",
            "member": { "user": { "id": clicker, "username": "c" } },
            "data": { "custom_id": "confirm-1", "component_type": 2 },
            "message": {
                "id": "m1",
                "interaction": { "id": "0", "user": { "id": invoker, "username": "i" } }
            }
        })
    }

    #[test]
    fn test_check_user() {
        assert!(context(component_payload("5", "5"), None).check_user().unwrap());
        assert!(!context(component_payload("5", "6"), None).check_user().unwrap());

        let command = context(json!({ "id": "1", "type": 2, "data": { "name": "x" } }), None);
        assert!(matches!(
            command.check_user(),
            Err(FollowupError::InvalidMethodUse(_))
        ));
    }

    #[test]
    fn test_modal_values_flatten_rows() {
        let ctx = context(
            json!({
                "id": "1",
                "type": 5,
                "data": {
                    "custom_id": "feedback",
                    "components": [
                        { "type": 1, "components": [{ "type": 4, "custom_id": "title", "value": "Hi" }] },
                        { "type": 1, "components": [{ "type": 4, "custom_id": "body", "value": "Text" }] }
                    ]
                }
            }),
            None,
        );
        let values = ctx.modal_values();
        assert_eq!(values.get("title").map(String::as_str), Some("Hi"));
        assert_eq!(values.get("body").map(String::as_str), Some("Text"));
        assert_eq!(ctx.deferred_kind(), ResponseKind::DeferredChannelMessage);
    }

    #[tokio::test]
    async fn test_followup_requires_acknowledgement() {
        let client = Arc::new(RecordingClient::default());
        let ctx = context(component_payload("5", "5"), Some(client.clone()));

        let err = ctx.followup("early", Vec::new()).await.unwrap_err();
        assert!(matches!(err, FollowupError::InvalidMethodUse(_)));
        assert!(client.calls.lock().is_empty());

        ctx.mark_acknowledged();
        let message = ctx
            .followup("late", vec![Attachment::new("a.txt", b"x".to_vec())])
            .await
            .unwrap();
        assert_eq!(message.id, "900");

        let calls = client.calls.lock();
        assert_eq!(calls[0].0, HttpMethod::Post);
        assert_eq!(calls[0].1, "webhooks/app/tok");
        assert_eq!(calls[0].2, Some(json!({ "content": "late" })));
        assert_eq!(calls[0].3, 1);
    }

    #[tokio::test]
    async fn test_edit_and_delete_routes() {
        let client = Arc::new(RecordingClient::default());
        let ctx = context(component_payload("5", "5"), Some(client.clone()));
        ctx.mark_acknowledged();

        ctx.edit_original("edited").await.unwrap();
        ctx.delete_message("42").await.unwrap();

        let calls = client.calls.lock();
        assert_eq!(calls[0].0, HttpMethod::Patch);
        assert_eq!(calls[0].1, "webhooks/app/tok/messages/@original");
        assert_eq!(calls[1].0, HttpMethod::Delete);
        assert_eq!(calls[1].1, "webhooks/app/tok/messages/42");
    }

    #[tokio::test]
    async fn test_followup_surfaces_transport_errors() {
        let client = Arc::new(RecordingClient::failing(500, "Internal Server Error"));
        let ctx = context(component_payload("5", "5"), Some(client));
        ctx.mark_acknowledged();

        let err = ctx.delete_original().await.unwrap_err();
        assert!(matches!(
            err,
            FollowupError::Transport(TransportError::Status { status: 500, .. })
        ));

        let no_client = context(component_payload("5", "5"), None);
        no_client.mark_acknowledged();
        assert!(matches!(
            no_client.delete_original().await,
            Err(FollowupError::NoRestClient)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_codes() {
        for code in [10015, 50027] {
            let body = format!(r#"{{"message": "Unknown Webhook", "code": {code}}}"#);
            let ctx = context(
                component_payload("5", "5"),
                Some(Arc::new(RecordingClient::failing(404, &body))),
            );
            ctx.mark_acknowledged();

            assert!(matches!(
                ctx.edit_original("late").await,
                Err(FollowupError::Expired)
            ));
            assert!(matches!(
                ctx.followup("late", Vec::new()).await,
                Err(FollowupError::Expired)
            ));
            assert!(matches!(ctx.delete_message("42").await, Err(FollowupError::Expired)));
        }

        let other = context(
            component_payload("5", "5"),
            Some(Arc::new(RecordingClient::failing(
                403,
                r#"{"message": "Missing Access", "code": 50001}"#,
            ))),
        );
        other.mark_acknowledged();
        assert!(matches!(
            other.edit_original("late").await,
            Err(FollowupError::Transport(TransportError::Status { status: 403, .. }))
        ));
    }

    #[tokio::test]
    async fn test_bot_routes() {
        let client = Arc::new(RecordingClient {
            bot: true,
            ..RecordingClient::default()
        });
        let ctx = context(component_payload("5", "5"), Some(client.clone()));

        // Channel routes do not need the interaction to be acknowledged.
        let message = ctx.edit_as_bot("30", "m1", "edited").await.unwrap();
        assert_eq!(message.id, "900");
        ctx.delete_as_bot("30", "m1").await.unwrap();

        let calls = client.calls.lock();
        assert_eq!(calls[0].0, HttpMethod::Patch);
        assert_eq!(calls[0].1, "channels/30/messages/m1");
        assert_eq!(calls[0].2, Some(json!({ "content": "edited" })));
        assert_eq!(calls[1].0, HttpMethod::Delete);
        assert_eq!(calls[1].1, "channels/30/messages/m1");
    }

    #[tokio::test]
    async fn test_bot_routes_require_bot_token() {
        let client = Arc::new(RecordingClient::default());
        let ctx = context(component_payload("5", "5"), Some(client.clone()));

        assert!(matches!(
            ctx.edit_as_bot("30", "m1", "edited").await,
            Err(FollowupError::MissingBotToken("edit_as_bot"))
        ));
        assert!(matches!(
            ctx.delete_as_bot("30", "m1").await,
            Err(FollowupError::MissingBotToken("delete_as_bot"))
        ));
        assert!(client.calls.lock().is_empty());

        let no_client = context(component_payload("5", "5"), None);
        assert!(matches!(
            no_client.delete_as_bot("30", "m1").await,
            Err(FollowupError::NoRestClient)
        ));
    }
}
