//! # Disunity Transport
//!
//! Network plumbing around the Disunity dispatch engine.
//!
//! ## Features
//!
//! - `http-server`: axum endpoint receiving signed interactions
//! - `http-client`: reqwest implementation of the core `RestClient` trait
//! - `full`: both
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  Platform            │
//! ├──────────────────────┤
//! │  disunity-transport  │  <- This crate
//! │  server ──▶ Dispatcher (tower::Service)
//! │  client ◀── InteractionContext follow-ups
//! ├──────────────────────┤
//! │  disunity-framework  │
//! │  disunity-core       │
//! └──────────────────────┘
//! ```
//!
//! ```rust,ignore
//! use disunity_transport::http::{HttpClientConfig, HttpRestClient, listen};
//!
//! let client = HttpRestClient::new(HttpClientConfig::default())?;
//! let handle = listen("0.0.0.0:8080", "/interactions", dispatcher).await?;
//! handle.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await;
//! ```

#[cfg(any(feature = "http-client", feature = "http-server"))]
pub mod http;

#[cfg(feature = "http-client")]
pub use http::{HttpClientConfig, HttpRestClient};

#[cfg(feature = "http-server")]
pub use http::{ServerHandle, listen};
