//! Runtime orchestration.
//!
//! The runtime wires configuration into a running endpoint: it initializes
//! logging, builds the signature gate and REST client, owns the registry and
//! dispatcher, then serves until a shutdown signal arrives.
//!
//! ```rust,ignore
//! use disunity_runtime::DisunityRuntime;
//!
//! // Auto-loads disunity.toml from the current or user config directory
//! let runtime = DisunityRuntime::new()?;
//!
//! // Custom configuration path
//! let runtime = DisunityRuntime::builder()
//!     .config_file("config/disunity.toml")
//!     .profile("production")
//!     .build()?;
//! ```

#[cfg(feature = "http-client")]
use std::sync::Arc;

use tracing::info;

use crate::config::{ConfigLoader, DisunityConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;
use disunity_core::SignatureGate;
use disunity_framework::{Dispatcher, HandlerDescriptor, Package, Registry};

/// The Disunity runtime.
pub struct DisunityRuntime {
    config: DisunityConfig,
    registry: Registry,
    dispatcher: Dispatcher,
}

impl DisunityRuntime {
    /// Loads and validates configuration from the default locations, then
    /// builds the runtime.
    pub fn new() -> RuntimeResult<Self> {
        Self::builder().build()
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration.
    ///
    /// Initializes logging first so that setup itself is logged. The
    /// configuration is not validated here beyond what building the gate and
    /// REST client requires.
    pub fn from_config(config: &DisunityConfig) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);

        let gate = SignatureGate::from_hex(&config.application.public_key)?;
        let registry = Registry::new();

        let mut builder =
            Dispatcher::builder(registry.clone(), gate).messages(config.messages.to_canned());
        if let Some(application_id) = &config.application.application_id {
            builder = builder.application_id(application_id.clone());
        }

        #[cfg(feature = "http-client")]
        {
            let client = Self::rest_client(config)?;
            builder = builder.rest_client(Arc::new(client));
            tracing::debug!(api_base = %config.http.api_base, "REST client configured");
        }

        info!(
            log_level = %config.logging.level,
            host = %config.server.host,
            port = config.server.port,
            path = %config.server.path,
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config: config.clone(),
            registry,
            dispatcher: builder.build(),
        })
    }

    #[cfg(feature = "http-client")]
    fn rest_client(
        config: &DisunityConfig,
    ) -> RuntimeResult<disunity_transport::http::HttpRestClient> {
        use disunity_transport::http::{HttpClientConfig, HttpRestClient};

        let client = HttpRestClient::new(HttpClientConfig {
            api_base: config.http.api_base.clone(),
            timeout: config.http.timeout(),
            bot_token: config.application.bot_token.clone(),
            client_id: config.application.application_id.clone(),
            client_secret: config.application.client_secret.clone(),
            ..Default::default()
        })?;
        Ok(client)
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &DisunityConfig {
        &self.config
    }

    /// Returns the handler registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the dispatcher, usable as a `tower::Service`.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Registers a single handler descriptor.
    pub fn register(&self, descriptor: HandlerDescriptor) -> RuntimeResult<()> {
        Ok(self.registry.register(descriptor)?)
    }

    /// Registers every descriptor of a package.
    pub fn register_package(&self, package: Package) -> RuntimeResult<()> {
        Ok(self.registry.register_package(package)?)
    }

    /// Serves the interaction endpoint until Ctrl+C or SIGTERM.
    #[cfg(feature = "http-server")]
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("Disunity runtime is now running. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Serves the interaction endpoint until `shutdown` completes, then
    /// waits for in-flight deferred handlers.
    #[cfg(feature = "http-server")]
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let addr = disunity_transport::http::socket_addr(
            &self.config.server.host,
            self.config.server.port,
        )?;
        let handle = disunity_transport::listen(
            &addr.to_string(),
            &self.config.server.path,
            self.dispatcher.clone(),
        )
        .await?;

        handle.run_until(shutdown).await;

        let pending = self.dispatcher.pending_tasks();
        if pending > 0 {
            info!(pending, "Waiting for deferred handlers");
        }
        self.dispatcher.drain().await;

        info!("Runtime stopped");
        Ok(())
    }
}

/// Waits for Ctrl+C, or SIGTERM on unix.
#[cfg(feature = "http-server")]
async fn wait_for_shutdown() {
    use tokio::signal;

    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register SIGTERM handler");
            }
        }
    }

    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    info!("Received Ctrl+C, shutting down");
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`DisunityRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder searching the default locations.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: DisunityConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads, validates and builds the runtime.
    pub fn build(self) -> RuntimeResult<DisunityRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        DisunityRuntime::from_config(&config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
