//! HTTP transport.
//!
//! This module provides the inbound interaction endpoint and the outbound
//! REST client.

#[cfg(feature = "http-client")]
mod client;
#[cfg(feature = "http-client")]
pub use client::{
    CredentialCache, DEFAULT_API_BASE, DEFAULT_TOKEN_URL, HttpClientConfig, HttpRestClient,
};

#[cfg(feature = "http-server")]
mod server;
#[cfg(feature = "http-server")]
pub use server::{ServerHandle, listen, router, socket_addr};
