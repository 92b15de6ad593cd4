//! The dispatch orchestrator.
//!
//! The [`Dispatcher`] takes one raw inbound request through the whole
//! interaction lifecycle:
//!
//! 1. Verify the signature on the raw body (401 on failure)
//! 2. Parse the payload and answer pings right away
//! 3. Resolve the handler with the [`PayloadMatcher`]
//! 4. Apply component lifecycle rules (timeout, single use)
//! 5. Acknowledge immediately with the handler's result, or acknowledge with
//!    a placeholder and run the handler on the task queue
//!
//! ```rust,ignore
//! use disunity_framework::{Dispatcher, IncomingRequest, Registry};
//!
//! let dispatcher = Dispatcher::builder(registry, gate)
//!     .rest_client(client)
//!     .build();
//!
//! let response = dispatcher
//!     .handle(IncomingRequest::new(body).signature(sig).timestamp(ts))
//!     .await;
//! assert_eq!(response.status, 200);
//! ```

use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tokio_util::task::TaskTracker;
use tower::Service;
use tracing::{Instrument, debug, debug_span, error, trace, warn};

use disunity_core::{Interaction, InteractionKind, InteractionResponse, RestClient, SignatureGate};

use crate::context::InteractionContext;
use crate::descriptor::{Ack, HandlerDescriptor};
use crate::error::{CallbackError, DispatchError, DispatchResult};
use crate::handler::CallbackResult;
use crate::matcher::{InvocationRecord, InvocationTarget, PayloadMatcher, Resolution};
use crate::registry::Registry;

/// Called with every error raised by a deferred handler.
pub type ErrorHook = Arc<dyn Fn(&InvocationTarget, &CallbackError) + Send + Sync>;

// =============================================================================
// Request / Response
// =============================================================================

/// One inbound request as received by the hosting server.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    /// Raw body bytes.
    pub body: Vec<u8>,
    /// Value of the signature header.
    pub signature: Option<String>,
    /// Value of the timestamp header.
    pub timestamp: Option<String>,
}

impl IncomingRequest {
    /// Creates a request without headers.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Sets the signature header.
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Sets the timestamp header.
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// The HTTP answer to an inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: Value,
}

impl DispatchResponse {
    fn ok(response: InteractionResponse) -> Self {
        Self {
            status: 200,
            body: response.to_value(),
        }
    }

    fn failure(status: u16, message: impl std::fmt::Display) -> Self {
        Self {
            status,
            body: json!({ "error": message.to_string() }),
        }
    }
}

/// Texts of the responses the dispatcher produces on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedMessages {
    /// Sent when no command or sub-command matches.
    pub command_not_found: String,
    /// Sent when no component is registered under the custom id's key.
    pub component_not_found: String,
    /// Sent when the command has no autocomplete provider.
    pub autocomplete_not_found: String,
    /// Sent when a component is used after its timeout.
    pub timed_out: String,
    /// Sent when an immediate handler fails or panics.
    pub error: String,
}

impl Default for CannedMessages {
    fn default() -> Self {
        Self {
            command_not_found: "This command could not be found.".into(),
            component_not_found: "This component could not be found.".into(),
            autocomplete_not_found: "This autocomplete could not be found.".into(),
            timed_out: "This component has timed out.".into(),
            error: "Something went wrong while handling this interaction.".into(),
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

struct DispatcherInner {
    registry: Registry,
    matcher: PayloadMatcher,
    gate: SignatureGate,
    rest: Option<Arc<dyn RestClient>>,
    application_id: Option<String>,
    error_hook: ErrorHook,
    messages: CannedMessages,
    tasks: TaskTracker,
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    registry: Registry,
    gate: SignatureGate,
    rest: Option<Arc<dyn RestClient>>,
    application_id: Option<String>,
    error_hook: Option<ErrorHook>,
    messages: CannedMessages,
}

impl DispatcherBuilder {
    /// Sets the REST client used for follow-ups.
    pub fn rest_client(mut self, client: Arc<dyn RestClient>) -> Self {
        self.rest = Some(client);
        self
    }

    /// Sets the application id used in follow-up routes. Defaults to the id
    /// carried by each payload.
    pub fn application_id(mut self, id: impl Into<String>) -> Self {
        self.application_id = Some(id.into());
        self
    }

    /// Sets the hook called with errors of deferred handlers.
    pub fn error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&InvocationTarget, &CallbackError) + Send + Sync + 'static,
    {
        self.error_hook = Some(Arc::new(hook));
        self
    }

    /// Sets the canned response texts.
    pub fn messages(mut self, messages: CannedMessages) -> Self {
        self.messages = messages;
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Dispatcher {
        let error_hook = self.error_hook.unwrap_or_else(|| {
            Arc::new(|target: &InvocationTarget, err: &CallbackError| {
                error!(%target, error = %err, "Deferred handler failed");
            })
        });
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                matcher: PayloadMatcher::new(self.registry.clone()),
                registry: self.registry,
                gate: self.gate,
                rest: self.rest,
                application_id: self.application_id,
                error_hook,
                messages: self.messages,
                tasks: TaskTracker::new(),
            }),
        }
    }
}

/// Routes inbound requests to registered handlers.
///
/// Cloning is cheap; clones share the registry and the task queue.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Starts building a dispatcher over `registry`, authenticating requests
    /// with `gate`.
    pub fn builder(registry: Registry, gate: SignatureGate) -> DispatcherBuilder {
        DispatcherBuilder {
            registry,
            gate,
            rest: None,
            application_id: None,
            error_hook: None,
            messages: CannedMessages::default(),
        }
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Returns the number of deferred handlers still running.
    pub fn pending_tasks(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Waits for every deferred handler to finish.
    pub async fn drain(&self) {
        self.inner.tasks.close();
        debug!(pending = self.inner.tasks.len(), "Draining deferred handlers");
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }

    /// Handles one inbound request.
    ///
    /// Never fails: every error is turned into an HTTP status and body.
    pub async fn handle(&self, request: IncomingRequest) -> DispatchResponse {
        let (interaction, raw) = match self.authenticate(&request) {
            Ok(parsed) => parsed,
            Err(err) => return self.error_response(&err),
        };

        let span = debug_span!("dispatch", id = %interaction.id, kind = interaction.kind);
        self.dispatch(Arc::new(interaction), Arc::new(raw))
            .instrument(span)
            .await
    }

    fn authenticate(&self, request: &IncomingRequest) -> DispatchResult<(Interaction, Value)> {
        self.inner.gate.verify(
            &request.body,
            request.signature.as_deref(),
            request.timestamp.as_deref(),
        )?;
        let raw: Value = serde_json::from_slice(&request.body)
            .map_err(|e| DispatchError::MalformedPayload(e.to_string()))?;
        let interaction = serde_json::from_value(raw.clone())
            .map_err(|e| DispatchError::MalformedPayload(e.to_string()))?;
        Ok((interaction, raw))
    }

    async fn dispatch(&self, interaction: Arc<Interaction>, raw: Arc<Value>) -> DispatchResponse {
        match interaction.interaction_kind() {
            InteractionKind::Ping => {
                debug!("Ping acknowledged");
                return DispatchResponse::ok(InteractionResponse::pong());
            }
            InteractionKind::Unknown(code) => {
                return self.error_response(&DispatchError::UnknownInteraction(code));
            }
            _ => {}
        }

        let record = match self
            .inner
            .matcher
            .resolve(&interaction, OffsetDateTime::now_utc())
        {
            Ok(Resolution::Invoke(record)) => record,
            Ok(Resolution::TimedOut(target)) => {
                debug!(%target, "Component timed out");
                return DispatchResponse::ok(InteractionResponse::ephemeral_message(
                    self.inner.messages.timed_out.clone(),
                ));
            }
            Err(err) => return self.error_response(&err),
        };

        let application_id = self
            .inner
            .application_id
            .clone()
            .or_else(|| interaction.application_id.clone())
            .unwrap_or_default();
        let ctx = Arc::new(InteractionContext::new(
            interaction,
            raw,
            record.options.clone(),
            application_id,
            self.inner.rest.clone(),
            self.inner.registry.clone(),
        ));

        let ack = match record.target {
            InvocationTarget::Autocomplete { .. } => Ack::Immediate,
            _ => record.descriptor.ack(),
        };

        match ack {
            Ack::Deferred { ephemeral } => {
                let response = InteractionResponse::deferred(ctx.deferred_kind(), ephemeral);
                ctx.mark_acknowledged();
                debug!(target = %record.target, ephemeral, "Acknowledged, handler deferred");
                self.spawn_deferred(ctx, record);
                DispatchResponse::ok(response)
            }
            Ack::Immediate => {
                let response = self.run_immediate(&ctx, &record).await;
                ctx.mark_acknowledged();
                DispatchResponse::ok(response)
            }
        }
    }

    async fn run_immediate(
        &self,
        ctx: &Arc<InteractionContext>,
        record: &InvocationRecord,
    ) -> InteractionResponse {
        match invoke(&record.descriptor, Arc::clone(ctx)).await {
            Ok(Some(response)) => {
                trace!(target = %record.target, kind = ?response.kind, "Handler responded");
                response
            }
            Ok(None) => match &record.target {
                InvocationTarget::Autocomplete { .. } => InteractionResponse::autocomplete(Vec::new()),
                target => {
                    if let InvocationTarget::Command { .. } = target {
                        warn!(%target, "Immediate handler returned no response, deferring");
                    }
                    ctx.defer()
                }
            },
            Err(err) => {
                error!(target = %record.target, error = %err, "Handler failed");
                InteractionResponse::ephemeral_message(self.inner.messages.error.clone())
            }
        }
    }

    fn spawn_deferred(&self, ctx: Arc<InteractionContext>, record: InvocationRecord) {
        let hook = Arc::clone(&self.inner.error_hook);
        let task = async move {
            match invoke(&record.descriptor, Arc::clone(&ctx)).await {
                Ok(Some(response)) => match ctx.deliver(response).await {
                    Ok(true) => trace!(target = %record.target, "Deferred result delivered"),
                    Ok(false) => {
                        warn!(target = %record.target, "Deferred result cannot be sent as a follow-up")
                    }
                    Err(err) => hook(
                        &record.target,
                        &CallbackError::Failed(format!("failed to deliver result: {err}")),
                    ),
                },
                Ok(None) => trace!(target = %record.target, "Deferred handler finished"),
                Err(err) => hook(&record.target, &err),
            }
        };
        self.inner.tasks.spawn(task.in_current_span());
    }

    fn error_response(&self, err: &DispatchError) -> DispatchResponse {
        let messages = &self.inner.messages;
        let not_found = |text: &str| {
            debug!(error = %err, "Handler not found");
            DispatchResponse::ok(InteractionResponse::ephemeral_message(text))
        };
        match err {
            DispatchError::Auth(_) => {
                debug!("Rejected request with invalid signature");
                DispatchResponse::failure(err.status(), err)
            }
            DispatchError::MalformedPayload(_) | DispatchError::UnknownInteraction(_) => {
                warn!(error = %err, "Rejected interaction");
                DispatchResponse::failure(err.status(), err)
            }
            DispatchError::CommandNotFound(_) => not_found(&messages.command_not_found),
            DispatchError::ComponentNotFound(_) => not_found(&messages.component_not_found),
            DispatchError::AutocompleteNotFound(_) => not_found(&messages.autocomplete_not_found),
            DispatchError::InvalidMethodUse(_) => {
                error!(error = %err, "Handler registration does not match the payload");
                DispatchResponse::failure(err.status(), err)
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.inner.registry.stats())
            .field("pending_tasks", &self.inner.tasks.len())
            .finish_non_exhaustive()
    }
}

/// Calls the handler, turning panics into [`CallbackError::Panicked`].
async fn invoke(descriptor: &HandlerDescriptor, ctx: Arc<InteractionContext>) -> CallbackResult {
    match AssertUnwindSafe((descriptor.callback())(ctx))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => Err(CallbackError::Panicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

// ============================================================================
// Tower Service Implementation for Dispatcher
// ============================================================================

impl Service<IncomingRequest> for Dispatcher {
    type Response = DispatchResponse;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: IncomingRequest) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.handle(request).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{autocomplete, command, component, subcommand};
    use crate::Ctx;
    use crate::context::tests::RecordingClient;
    use crate::extractor::{Focused, Options};
    use disunity_core::HttpMethod;
    use ed25519_dalek::{Signer, SigningKey};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    const TIMESTAMP: &str = "1700000000";

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn signed(payload: &Value) -> IncomingRequest {
        let body = serde_json::to_vec(payload).unwrap();
        let mut message = TIMESTAMP.as_bytes().to_vec();
        message.extend_from_slice(&body);
        let signature = hex::encode(signing_key().sign(&message).to_bytes());
        IncomingRequest::new(body)
            .signature(signature)
            .timestamp(TIMESTAMP)
    }

    fn dispatcher(registry: &Registry) -> Dispatcher {
        Dispatcher::builder(
            registry.clone(),
            SignatureGate::from_key(signing_key().verifying_key()),
        )
        .application_id("app")
        .build()
    }

    fn command_payload(name: &str, options: Value) -> Value {
        json!({
            "id": "1", "type": 2, "token": "tok",
            "member": { "user": { "id": "10", "username": "alice" } },
            "data": { "name": name, "type": 1, "options": options }
        })
    }

    fn component_payload(custom_id: &str, timestamp: Option<&str>) -> Value {
        let mut message = json!({ "id": "m1" });
        if let Some(ts) = timestamp {
            message["timestamp"] = json!(ts);
        }
        json!({
            "id": "2", "type": 3, "token": "tok",
            "user": { "id": "10", "username": "alice" },
            "data": { "custom_id": custom_id, "component_type": 2 },
            "message": message
        })
    }

    #[tokio::test]
    async fn test_invalid_signature_is_rejected() {
        let dispatcher = dispatcher(&Registry::new());
        let mut request = signed(&json!({ "id": "1", "type": 1 }));
        request.body.push(b' ');

        let response = dispatcher.handle(request).await;
        assert_eq!(response.status, 401);

        let unsigned = IncomingRequest::new(br#"{"id":"1","type":1}"#.to_vec());
        assert_eq!(dispatcher.handle(unsigned).await.status, 401);
    }

    #[tokio::test]
    async fn test_ping_is_answered_with_pong() {
        let dispatcher = dispatcher(&Registry::new());
        let response = dispatcher.handle(signed(&json!({ "id": "1", "type": 1 }))).await;
        assert_eq!(response, DispatchResponse { status: 200, body: json!({ "type": 1 }) });
    }

    #[tokio::test]
    async fn test_unknown_kind_and_bad_json_are_protocol_errors() {
        let dispatcher = dispatcher(&Registry::new());
        let response = dispatcher.handle(signed(&json!({ "id": "1", "type": 42 }))).await;
        assert_eq!(response.status, 400);

        let response = dispatcher.handle(signed(&json!({ "type": "nope" }))).await;
        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn test_ping_command_invoked_once_with_empty_options() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(None));
        let (c, s) = (calls.clone(), seen.clone());
        registry
            .register(command("ping").handler(move |Options(options): Options| {
                let (c, s) = (c.clone(), s.clone());
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    *s.lock() = Some(options.len());
                    "pong"
                }
            }))
            .unwrap();

        let response = dispatcher(&registry)
            .handle(signed(&command_payload("ping", Value::Null)))
            .await;

        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({ "type": 4, "data": { "content": "pong" } }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock(), Some(0));
    }

    #[tokio::test]
    async fn test_grouped_subcommand_and_missing_leaf() {
        let registry = Registry::new();
        registry
            .register(
                subcommand("mod", "ban")
                    .group("admin")
                    .handler(|Options(options): Options| async move {
                        format!("banned {}", options[0].value.as_ref().and_then(Value::as_str).unwrap_or("?"))
                    }),
            )
            .unwrap();
        let dispatcher = dispatcher(&registry);

        let ban = command_payload(
            "mod",
            json!([{ "name": "admin", "type": 2, "options": [{
                "name": "ban", "type": 1,
                "options": [{ "name": "user", "type": 6, "value": "42" }]
            }]}]),
        );
        let response = dispatcher.handle(signed(&ban)).await;
        assert_eq!(response.body["data"]["content"], "banned 42");

        let kick = command_payload(
            "mod",
            json!([{ "name": "admin", "type": 2, "options": [{ "name": "kick", "type": 1 }] }]),
        );
        let response = dispatcher.handle(signed(&kick)).await;
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            json!({ "type": 4, "data": { "content": "This command could not be found.", "flags": 64 } })
        );
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_server_error() {
        let registry = Registry::new();
        registry.register(command("ping").handler(|| async {})).unwrap();
        let response = dispatcher(&registry)
            .handle(signed(&command_payload("ping", json!([{ "name": "x", "type": 1 }]))))
            .await;
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_single_use_component_second_dispatch_not_found() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        registry
            .register(component("confirm").single_use().handler(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    InteractionResponse::update("confirmed")
                }
            }))
            .unwrap();
        let dispatcher = dispatcher(&registry);

        let first = dispatcher.handle(signed(&component_payload("confirm-1", None))).await;
        assert_eq!(first.body["type"], 7);

        let second = dispatcher.handle(signed(&component_payload("confirm-1", None))).await;
        assert_eq!(second.body["data"]["content"], "This component could not be found.");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_single_use_dispatch_invokes_once() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        registry
            .register(component("once").single_use().handler(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    InteractionResponse::update("done")
                }
            }))
            .unwrap();
        let dispatcher = dispatcher(&registry);

        let deliveries: Vec<_> = (0..64)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher
                        .handle(signed(&component_payload("once-1", None)))
                        .await
                })
            })
            .collect();

        let mut updates = 0;
        for delivery in deliveries {
            let response = delivery.await.unwrap();
            assert_eq!(response.status, 200);
            if response.body["type"] == 7 {
                updates += 1;
            }
        }
        assert_eq!(updates, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.lookup_component("once").is_none());
    }

    #[tokio::test]
    async fn test_components_registered_per_message() {
        let registry = Registry::new();
        let clicks = Arc::new(AtomicUsize::new(0));
        let c = clicks.clone();
        registry
            .register(command("delete").handler(move |ctx: Ctx| {
                let c = c.clone();
                async move {
                    let name = format!("confirm{}", uuid::Uuid::new_v4().simple());
                    ctx.register(component(name.clone()).single_use().handler(move || {
                        let c = c.clone();
                        async move {
                            c.fetch_add(1, Ordering::SeqCst);
                            InteractionResponse::update("Deleted.")
                        }
                    }))
                    .map(|()| name)
                }
            }))
            .unwrap();
        let dispatcher = dispatcher(&registry);

        let mut names = Vec::new();
        for _ in 0..2 {
            let response = dispatcher
                .handle(signed(&command_payload("delete", json!([]))))
                .await;
            names.push(response.body["data"]["content"].as_str().unwrap().to_owned());
        }
        assert_ne!(names[0], names[1]);

        for name in &names {
            let first = dispatcher.handle(signed(&component_payload(name, None))).await;
            assert_eq!(first.body["data"]["content"], "Deleted.");
            let again = dispatcher.handle(signed(&component_payload(name, None))).await;
            assert_eq!(again.body["data"]["content"], "This component could not be found.");
        }
        assert_eq!(clicks.load(Ordering::SeqCst), 2);
        assert_eq!(registry.stats().components, 0);
    }

    #[tokio::test]
    async fn test_component_timeout_uses_message_age() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        registry
            .register(
                component("vote")
                    .timeout(Duration::from_secs(60))
                    .defer()
                    .handler(move || {
                        let c = c.clone();
                        async move {
                            c.fetch_add(1, Ordering::SeqCst);
                        }
                    }),
            )
            .unwrap();
        let dispatcher = dispatcher(&registry);

        let fresh = OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap();
        let response = dispatcher
            .handle(signed(&component_payload("vote-1", Some(&fresh))))
            .await;
        assert_eq!(response.body, json!({ "type": 6 }));
        dispatcher.drain().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stale = "2020-01-01T00:00:00+00:00";
        let response = dispatcher
            .handle(signed(&component_payload("vote-1", Some(stale))))
            .await;
        assert_eq!(
            response.body,
            json!({ "type": 4, "data": { "content": "This component has timed out.", "flags": 64 } })
        );
        dispatcher.drain().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_deferred_ack_returned_before_callback_runs() {
        let registry = Registry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        registry
            .register(command("slow").defer_ephemeral().handler(move || {
                let l = l.clone();
                async move {
                    l.lock().push("callback");
                }
            }))
            .unwrap();
        let dispatcher = dispatcher(&registry);

        let response = dispatcher
            .handle(signed(&command_payload("slow", Value::Null)))
            .await;
        log.lock().push("responded");

        assert_eq!(response.body, json!({ "type": 5, "data": { "flags": 64 } }));
        dispatcher.drain().await;
        assert_eq!(*log.lock(), ["responded", "callback"]);
    }

    #[tokio::test]
    async fn test_deferred_result_is_sent_as_followup() {
        let registry = Registry::new();
        registry
            .register(command("slow").defer().handler(|| async { "done" }))
            .unwrap();
        let client = Arc::new(RecordingClient::default());
        let dispatcher = Dispatcher::builder(
            registry,
            SignatureGate::from_key(signing_key().verifying_key()),
        )
        .application_id("app")
        .rest_client(client.clone())
        .build();

        let response = dispatcher
            .handle(signed(&command_payload("slow", Value::Null)))
            .await;
        assert_eq!(response.body, json!({ "type": 5 }));
        dispatcher.drain().await;

        let calls = client.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, HttpMethod::Post);
        assert_eq!(calls[0].1, "webhooks/app/tok");
        assert_eq!(calls[0].2, Some(json!({ "content": "done" })));
    }

    #[tokio::test]
    async fn test_deferred_errors_reach_the_hook() {
        let registry = Registry::new();
        registry
            .register(command("fail").defer().handler(|| async {
                Err::<(), _>(anyhow::anyhow!("boom"))
            }))
            .unwrap();
        registry
            .register(command("panic").defer().handler(|| async {
                if true {
                    panic!("kaboom");
                }
            }))
            .unwrap();

        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = errors.clone();
        let dispatcher = Dispatcher::builder(
            registry,
            SignatureGate::from_key(signing_key().verifying_key()),
        )
        .error_hook(move |target, err| e.lock().push(format!("{target}: {err}")))
        .build();

        dispatcher.handle(signed(&command_payload("fail", Value::Null))).await;
        dispatcher.handle(signed(&command_payload("panic", Value::Null))).await;
        dispatcher.drain().await;

        let mut errors = errors.lock().clone();
        errors.sort();
        assert_eq!(
            errors,
            [
                "command 'fail': handler failed: boom",
                "command 'panic': handler panicked: kaboom",
            ]
        );
    }

    #[tokio::test]
    async fn test_immediate_errors_become_generic_response() {
        let registry = Registry::new();
        registry
            .register(command("fail").handler(|| async { Err::<String, _>("nope") }))
            .unwrap();
        registry
            .register(command("needs-user").handler(|_: crate::extractor::Invoker| async {}))
            .unwrap();
        let dispatcher = dispatcher(&registry);

        let response = dispatcher.handle(signed(&command_payload("fail", Value::Null))).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["data"]["flags"], 64);
        assert_eq!(
            response.body["data"]["content"],
            CannedMessages::default().error
        );

        let mut anonymous = command_payload("needs-user", Value::Null);
        anonymous.as_object_mut().unwrap().remove("member");
        let response = dispatcher.handle(signed(&anonymous)).await;
        assert_eq!(response.body["data"]["content"], CannedMessages::default().error);
    }

    #[tokio::test]
    async fn test_immediate_without_body_gets_deferred_ack() {
        let registry = Registry::new();
        registry.register(command("quiet").handler(|| async {})).unwrap();
        registry.register(component("tick").handler(|| async {})).unwrap();
        let dispatcher = dispatcher(&registry);

        let response = dispatcher.handle(signed(&command_payload("quiet", Value::Null))).await;
        assert_eq!(response.body, json!({ "type": 5 }));

        let response = dispatcher.handle(signed(&component_payload("tick-1", None))).await;
        assert_eq!(response.body, json!({ "type": 6 }));
    }

    #[tokio::test]
    async fn test_autocomplete_is_always_immediate() {
        let registry = Registry::new();
        registry
            .register(autocomplete("search").handler(|Focused(option): Focused| async move {
                let typed = option.value.and_then(|v| v.as_str().map(str::to_owned)).unwrap_or_default();
                InteractionResponse::autocomplete(vec![json!({ "name": typed.clone(), "value": typed })])
            }))
            .unwrap();

        let payload = json!({
            "id": "3", "type": 4, "token": "tok",
            "data": {
                "name": "search", "type": 1,
                "options": [{ "name": "query", "type": 3, "value": "ru", "focused": true }]
            }
        });
        let response = dispatcher(&registry).handle(signed(&payload)).await;
        assert_eq!(
            response.body,
            json!({ "type": 8, "data": { "choices": [{ "name": "ru", "value": "ru" }] } })
        );
    }

    #[tokio::test]
    async fn test_dispatcher_as_tower_service() {
        let registry = Registry::new();
        let response = dispatcher(&registry)
            .oneshot(signed(&json!({ "id": "1", "type": 1 })))
            .await
            .unwrap();
        assert_eq!(response.body, json!({ "type": 1 }));
    }
}
