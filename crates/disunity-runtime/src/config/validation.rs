//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ApplicationConfig, DisunityConfig, HttpConfig, MessagesConfig, ServerConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &DisunityConfig) -> ConfigResult<()> {
    validate_application(&config.application)?;
    validate_server(&config.server)?;
    validate_http(&config.http)?;
    validate_messages(&config.messages)?;
    Ok(())
}

fn validate_application(application: &ApplicationConfig) -> ConfigResult<()> {
    let key = &application.public_key;
    if key.is_empty() {
        return Err(ConfigError::missing_field("application.public_key"));
    }
    if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::validation(
            "application.public_key must be 64 hexadecimal characters",
        ));
    }
    if application.client_secret.is_some() && application.application_id.is_none() {
        return Err(ConfigError::missing_field("application.application_id"));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> ConfigResult<()> {
    if server.port == 0 {
        return Err(ConfigError::InvalidPort(server.port));
    }
    if !server.path.starts_with('/') {
        return Err(ConfigError::validation("server.path must start with '/'"));
    }
    Ok(())
}

fn validate_http(http: &HttpConfig) -> ConfigResult<()> {
    if http.timeout_ms == 0 {
        return Err(ConfigError::validation("http.timeout_ms must be greater than 0"));
    }
    if !http.api_base.starts_with("http://") && !http.api_base.starts_with("https://") {
        return Err(ConfigError::validation(format!(
            "http.api_base must be an http(s) URL, got {}",
            http.api_base
        )));
    }
    Ok(())
}

fn validate_messages(messages: &MessagesConfig) -> ConfigResult<()> {
    let fields = [
        ("messages.command_not_found", &messages.command_not_found),
        ("messages.component_not_found", &messages.component_not_found),
        ("messages.autocomplete_not_found", &messages.autocomplete_not_found),
        ("messages.timed_out", &messages.timed_out),
        ("messages.error", &messages.error),
    ];
    for (field, text) in fields {
        if text.trim().is_empty() {
            return Err(ConfigError::validation(format!("{field} must not be empty")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> DisunityConfig {
        let mut config = DisunityConfig::default();
        config.application.public_key = "a".repeat(64);
        config
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_validate_missing_public_key() {
        let result = validate_config(&DisunityConfig::default());
        assert!(matches!(result, Err(ConfigError::MissingField { field }) if field == "application.public_key"));
    }

    #[test]
    fn test_validate_public_key_shape() {
        let mut config = valid();
        config.application.public_key = "zz".repeat(32);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_client_secret_needs_id() {
        let mut config = valid();
        config.application.client_secret = Some("secret".into());
        assert!(validate_config(&config).is_err());
        config.application.application_id = Some("42".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_server() {
        let mut config = valid();
        config.server.port = 0;
        assert!(matches!(validate_config(&config), Err(ConfigError::InvalidPort(0))));

        let mut config = valid();
        config.server.path = "interactions".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_http_and_messages() {
        let mut config = valid();
        config.http.timeout_ms = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.messages.timed_out = "  ".into();
        assert!(validate_config(&config).is_err());
    }
}
