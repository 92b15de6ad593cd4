//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use disunity_framework::CannedMessages;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisunityConfig {
    /// Application credentials.
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Interaction endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound REST settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Texts of the responses produced by the dispatcher itself.
    #[serde(default)]
    pub messages: MessagesConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Application
// =============================================================================

/// Application credentials issued by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApplicationConfig {
    /// Hex-encoded Ed25519 public key used to verify inbound requests.
    #[serde(default)]
    pub public_key: String,

    /// Application id. Taken from each payload when unset.
    #[serde(default)]
    pub application_id: Option<String>,

    /// Client secret, for client-credentials authorization.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Bot token. Preferred over client credentials.
    #[serde(default)]
    pub bot_token: Option<String>,
}

// =============================================================================
// Server
// =============================================================================

/// Interaction endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the interaction endpoint.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_path() -> String {
    "/interactions".to_string()
}

// =============================================================================
// HTTP
// =============================================================================

/// Outbound REST configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL relative routes are joined to.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl HttpConfig {
    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_api_base() -> String {
    "https://discord.com/api/v10/".to_string()
}

fn default_timeout_ms() -> u64 {
    30000
}

// =============================================================================
// Messages
// =============================================================================

/// Canned response texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub command_not_found: String,
    pub component_not_found: String,
    pub autocomplete_not_found: String,
    pub timed_out: String,
    pub error: String,
}

impl MessagesConfig {
    /// Converts to the dispatcher's message set.
    pub fn to_canned(&self) -> CannedMessages {
        CannedMessages {
            command_not_found: self.command_not_found.clone(),
            component_not_found: self.component_not_found.clone(),
            autocomplete_not_found: self.autocomplete_not_found.clone(),
            timed_out: self.timed_out.clone(),
            error: self.error.clone(),
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        let canned = CannedMessages::default();
        Self {
            command_not_found: canned.command_not_found,
            component_not_found: canned.component_not_found,
            autocomplete_not_found: canned.autocomplete_not_found,
            timed_out: canned.timed_out,
            error: canned.error,
        }
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level name as used in filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level. `RUST_LOG` takes precedence.
    pub level: LogLevel,

    /// Line format.
    pub format: LogFormat,

    /// Destination.
    pub output: LogOutput,

    /// Span events to log.
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    pub thread_ids: bool,

    /// Include file names and line numbers.
    pub file_location: bool,

    /// Log file, for `output = "file"`. Rotated daily.
    pub file_path: Option<PathBuf>,

    /// Number of rotated files to keep.
    pub max_files: u32,

    /// Per-module level overrides, e.g. `disunity_framework = "debug"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            max_files: 5,
            filters: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DisunityConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.path, "/interactions");
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
        assert_eq!(config.messages.to_canned(), CannedMessages::default());
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
