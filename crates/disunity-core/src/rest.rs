//! The outbound REST seam.
//!
//! Once an interaction has been acknowledged, further messages are sent
//! through the platform's REST API. The framework only depends on the
//! [`RestClient`] trait; the HTTP implementation lives in
//! `disunity-transport`.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportResult;

/// HTTP method of a REST call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    /// Returns the method name in upper case.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file uploaded alongside a message.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown in the client.
    pub filename: String,
    /// Raw file content.
    pub content: Vec<u8>,
    /// Alt text.
    pub description: Option<String>,
}

impl Attachment {
    /// Creates an attachment from a file name and its content.
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            description: None,
        }
    }

    /// Sets the alt text.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("size", &self.content.len())
            .field("description", &self.description)
            .finish()
    }
}

/// A client for the platform's REST API.
///
/// `route` is either relative to the API base (`webhooks/{app}/{token}`) or
/// an absolute URL. Implementations send `body` as JSON, or as a multipart
/// form when `files` is non-empty, and return the decoded response body
/// (`Value::Null` for empty responses).
#[async_trait]
pub trait RestClient: Send + Sync {
    async fn request(
        &self,
        method: HttpMethod,
        route: &str,
        body: Option<Value>,
        files: Vec<Attachment>,
    ) -> TransportResult<Value>;

    /// Returns `true` when requests are authorized with a bot token, which
    /// `channels/...` routes require.
    fn has_bot_token(&self) -> bool {
        false
    }
}
