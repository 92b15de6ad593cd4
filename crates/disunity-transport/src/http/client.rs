//! Outbound REST client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use disunity_core::{Attachment, HttpMethod, RestClient, TransportError, TransportResult};

/// Default REST API base.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10/";

/// Default OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://discord.com/api/oauth2/token";

/// Scope requested with client credentials.
const CREDENTIALS_SCOPE: &str = "applications.commands.update";

/// Settings for [`HttpRestClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL relative routes are joined to.
    pub api_base: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Bot token. Takes precedence over client credentials.
    pub bot_token: Option<String>,
    /// Application id, for client credentials.
    pub client_id: Option<String>,
    /// Application secret, for client credentials.
    pub client_secret: Option<String>,
    /// OAuth2 token endpoint.
    pub token_url: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            bot_token: None,
            client_id: None,
            client_secret: None,
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

// =============================================================================
// Credentials
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Caches a client-credentials bearer token.
///
/// Tokens are refreshed once half of their lifetime has passed.
#[derive(Debug)]
pub struct CredentialCache {
    client_id: String,
    client_secret: String,
    token_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl CredentialCache {
    /// Creates an empty cache for the given application credentials.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: token_url.into(),
            token: Mutex::new(None),
        }
    }

    /// Returns a valid bearer token, fetching a new one when needed.
    pub async fn bearer(&self, client: &Client) -> TransportResult<String> {
        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(cached.access_token.clone());
        }

        debug!(client_id = %self.client_id, "Requesting client credentials token");
        let response = client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", CREDENTIALS_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| TransportError::Credentials(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::Credentials(format!(
                "token endpoint returned {}: {text}",
                status.as_u16()
            )));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Credentials(e.to_string()))?;

        let cached = CachedToken {
            access_token: body.access_token,
            refresh_at: refresh_deadline(Instant::now(), body.expires_in),
        };
        let access_token = cached.access_token.clone();
        *token = Some(cached);
        Ok(access_token)
    }
}

fn refresh_deadline(now: Instant, expires_in: u64) -> Instant {
    now + Duration::from_secs(expires_in / 2)
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug)]
enum Authorization {
    Bot(String),
    ClientCredentials(CredentialCache),
    Anonymous,
}

/// REST client over `reqwest`.
#[derive(Debug)]
pub struct HttpRestClient {
    client: Client,
    api_base: String,
    auth: Authorization,
}

impl HttpRestClient {
    /// Creates a client from its settings.
    pub fn new(config: HttpClientConfig) -> TransportResult<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        let auth = match (config.bot_token, config.client_id, config.client_secret) {
            (Some(token), _, _) => Authorization::Bot(token),
            (None, Some(id), Some(secret)) => {
                Authorization::ClientCredentials(CredentialCache::new(id, secret, config.token_url))
            }
            _ => Authorization::Anonymous,
        };

        info!(
            api_base = %config.api_base,
            auth = auth.label(),
            "REST client ready"
        );
        Ok(Self {
            client,
            api_base: config.api_base,
            auth,
        })
    }

    /// Resolves a route against the API base.
    pub fn url(&self, route: &str) -> String {
        join_url(&self.api_base, route)
    }

    async fn authorize(&self, request: RequestBuilder) -> TransportResult<RequestBuilder> {
        Ok(match &self.auth {
            Authorization::Bot(token) => request.header("Authorization", format!("Bot {token}")),
            Authorization::ClientCredentials(cache) => {
                request.bearer_auth(cache.bearer(&self.client).await?)
            }
            Authorization::Anonymous => request,
        })
    }
}

impl Authorization {
    fn label(&self) -> &'static str {
        match self {
            Self::Bot(_) => "bot",
            Self::ClientCredentials(_) => "client-credentials",
            Self::Anonymous => "none",
        }
    }
}

#[async_trait]
impl RestClient for HttpRestClient {
    async fn request(
        &self,
        method: HttpMethod,
        route: &str,
        body: Option<Value>,
        files: Vec<Attachment>,
    ) -> TransportResult<Value> {
        let url = self.url(route);
        trace!(%method, %url, files = files.len(), "REST request");

        let mut request = self.client.request(to_method(method), &url);
        request = self.authorize(request).await?;
        if !files.is_empty() {
            request = request.multipart(multipart_form(body, files)?);
        } else if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }

    fn has_bot_token(&self) -> bool {
        matches!(self.auth, Authorization::Bot(_))
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn join_url(base: &str, route: &str) -> String {
    if route.starts_with("https://") || route.starts_with("http://") {
        return route.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        route.trim_start_matches('/')
    )
}

/// Adds the `attachments` metadata array that links `files[n]` parts to the
/// message.
fn payload_with_attachments(body: Option<Value>, files: &[Attachment]) -> Value {
    let mut payload = match body {
        Some(Value::Object(map)) => Value::Object(map),
        _ => json!({}),
    };
    let attachments: Vec<Value> = files
        .iter()
        .enumerate()
        .map(|(id, file)| {
            let mut meta = json!({ "id": id, "filename": file.filename });
            if let Some(description) = &file.description {
                meta["description"] = json!(description);
            }
            meta
        })
        .collect();
    payload["attachments"] = Value::Array(attachments);
    payload
}

fn multipart_form(body: Option<Value>, files: Vec<Attachment>) -> TransportResult<Form> {
    let payload = payload_with_attachments(body, &files);
    let payload_json =
        serde_json::to_string(&payload).map_err(|e| TransportError::Decode(e.to_string()))?;
    let mut form = Form::new().text("payload_json", payload_json);
    for (i, file) in files.into_iter().enumerate() {
        form = form.part(
            format!("files[{i}]"),
            Part::bytes(file.content).file_name(file.filename),
        );
    }
    Ok(form)
}
