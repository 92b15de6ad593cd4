//! Inbound interaction endpoint.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::{Service, ServiceExt};
use tracing::{error, info, trace};

use disunity_core::{SIGNATURE_HEADER, TIMESTAMP_HEADER, TransportError, TransportResult};
use disunity_framework::{DispatchResponse, IncomingRequest};

/// Builds the router serving `POST {path}`.
///
/// `service` is typically a `Dispatcher`, optionally wrapped in tower
/// middleware.
pub fn router<S>(path: &str, service: S) -> Router
where
    S: Service<IncomingRequest, Response = DispatchResponse, Error = Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send,
{
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Router::new()
        .route(&path, post(interactions::<S>))
        .with_state(service)
}

/// A running interaction server.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting connections and waits for in-flight requests.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            error!(error = %e, "HTTP server task failed");
        }
    }

    /// Waits for `signal`, then shuts the server down gracefully.
    pub async fn run_until(self, signal: impl Future<Output = ()>) {
        signal.await;
        info!("Shutdown signal received");
        self.shutdown().await;
    }
}

/// Binds `addr` and serves `POST {path}` in a background task.
pub async fn listen<S>(addr: &str, path: &str, service: S) -> TransportResult<ServerHandle>
where
    S: Service<IncomingRequest, Response = DispatchResponse, Error = Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send,
{
    let router = router(path, service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!(addr = %actual_addr, path = %path, "Interaction endpoint listening");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        if let Err(e) = server.await {
            error!(error = %e, "HTTP server error");
        }
        info!("Interaction endpoint stopped");
    });

    Ok(ServerHandle {
        addr: actual_addr,
        shutdown: shutdown_tx,
        task,
    })
}

/// Parses `host:port` into a socket address.
pub fn socket_addr(host: &str, port: u16) -> TransportResult<SocketAddr> {
    format!("{host}:{port}")
        .parse::<SocketAddr>()
        .map_err(|e| TransportError::InvalidConfig(e.to_string()))
}

/// HTTP POST handler.
async fn interactions<S>(State(service): State<S>, headers: HeaderMap, body: Bytes) -> Response
where
    S: Service<IncomingRequest, Response = DispatchResponse, Error = Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send,
{
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    let request = IncomingRequest {
        body: body.to_vec(),
        signature: header(SIGNATURE_HEADER),
        timestamp: header(TIMESTAMP_HEADER),
    };
    trace!(len = request.body.len(), "Received interaction");

    let response = match service.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use disunity_core::SignatureGate;
    use disunity_framework::{Dispatcher, Registry, command};
    use ed25519_dalek::{Signer, SigningKey};
    use serde_json::{Value, json};

    const TIMESTAMP: &str = "1700000000";

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[3u8; 32])
    }

    fn dispatcher() -> Dispatcher {
        let registry = Registry::new();
        registry
            .register(command("ping").handler(|| async { "pong" }))
            .unwrap();
        Dispatcher::builder(registry, SignatureGate::from_key(signing_key().verifying_key()))
            .build()
    }

    fn request(body: &Value, sign: bool) -> Request<Body> {
        let body = serde_json::to_vec(body).unwrap();
        let mut builder = Request::builder()
            .method("POST")
            .uri("/interactions")
            .header("content-type", "application/json");
        if sign {
            let mut message = TIMESTAMP.as_bytes().to_vec();
            message.extend_from_slice(&body);
            builder = builder
                .header(SIGNATURE_HEADER, hex::encode(signing_key().sign(&message).to_bytes()))
                .header(TIMESTAMP_HEADER, TIMESTAMP);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_signed_command_is_dispatched() {
        let payload = json!({ "id": "1", "type": 2, "token": "t", "data": { "name": "ping" } });
        let (status, body) = call(router("interactions", dispatcher()), request(&payload, true)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "type": 4, "data": { "content": "pong" } }));
    }

    #[tokio::test]
    async fn test_unsigned_request_is_unauthorized() {
        let payload = json!({ "id": "1", "type": 1 });
        let (status, _) = call(router("/interactions", dispatcher()), request(&payload, false)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_listen_and_shutdown() {
        let handle = listen("127.0.0.1:0", "/interactions", dispatcher())
            .await
            .unwrap();
        assert_ne!(handle.local_addr().port(), 0);
        handle.shutdown().await;
    }

    #[test]
    fn test_socket_addr() {
        assert_eq!(socket_addr("127.0.0.1", 8080).unwrap().port(), 8080);
        assert!(matches!(
            socket_addr("not a host", 1),
            Err(TransportError::InvalidConfig(_))
        ));
    }
}
