//! HTTP server, routing and start/stop lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, ws::WebSocketUpgrade},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use relayhub_config::ServerConfig;

use crate::error::HubError;
use crate::hub::BroadcastHub;
use crate::session::InboundSession;

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;

/// State shared by the route handlers.
struct RouteState {
    hub: Arc<BroadcastHub>,
    outbound_buffer: usize,
}

/// Create the router: the upgrade endpoint at `path` plus `/health`.
pub fn create_router(hub: Arc<BroadcastHub>, path: &str, outbound_buffer: usize) -> Router {
    let state = Arc::new(RouteState {
        hub,
        outbound_buffer,
    });

    Router::new()
        .route(path, get(ws_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<RouteState>>) -> Response {
    ws.on_upgrade(move |socket| {
        let (session, outbound_rx) = InboundSession::new(state.hub.clone(), state.outbound_buffer);
        debug!("Upgraded connection {}", session.id());
        session.run(socket, outbound_rx)
    })
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<RouteState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::json!({
            "status": "ok",
            "connections": state.hub.registry().len(),
            "entries": state.hub.transcript().len(),
        })
        .to_string(),
    )
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

/// Listening endpoint in front of a [`BroadcastHub`].
///
/// The hub outlives the listener: stopping and starting again keeps the
/// transcript and any sessions that were already active.
pub struct HubServer {
    config: ServerConfig,
    hub: Arc<BroadcastHub>,
    running: Mutex<Option<RunningServer>>,
}

impl HubServer {
    pub fn new(config: ServerConfig, hub: Arc<BroadcastHub>) -> Self {
        Self {
            config,
            hub,
            running: Mutex::new(None),
        }
    }

    pub fn hub(&self) -> Arc<BroadcastHub> {
        self.hub.clone()
    }

    /// Address the listener is bound to, if running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.addr)
    }

    /// Bind and start serving. Starting a running server returns its address.
    pub async fn start(&self) -> Result<SocketAddr, HubError> {
        let mut running = self.running.lock().await;
        if let Some(server) = running.as_ref() {
            info!("Hub already running on {}", server.addr);
            return Ok(server.addr);
        }

        if !self.config.path.starts_with('/') {
            return Err(HubError::InvalidPath(self.config.path.clone()));
        }

        let bind_addr = self.config.address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| HubError::Bind {
                addr: bind_addr.clone(),
                reason: e.to_string(),
            })?;
        let addr = listener.local_addr().map_err(|e| HubError::Bind {
            addr: bind_addr,
            reason: e.to_string(),
        })?;

        let router = create_router(
            self.hub.clone(),
            &self.config.path,
            self.config.outbound_buffer,
        );
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await;
            if let Err(e) = result {
                error!("Hub server error: {}", e);
            }
        });

        info!("Hub listening on ws://{}{}", addr, self.config.path);
        *running = Some(RunningServer {
            addr,
            shutdown,
            task,
        });
        Ok(addr)
    }

    /// Close the listener, giving in-flight handshakes the configured grace
    /// period. Returns whether a server was running.
    ///
    /// Sessions that already upgraded are not interrupted.
    pub async fn stop(&self) -> Result<bool, HubError> {
        let Some(mut server) = self.running.lock().await.take() else {
            info!("Hub not running");
            return Ok(false);
        };

        info!("Stopping hub on {}", server.addr);
        server.shutdown.cancel();

        let grace = self.config.shutdown_grace();
        match tokio::time::timeout(grace, &mut server.task).await {
            Ok(_) => {
                info!("Hub stopped");
                Ok(true)
            }
            Err(_) => {
                warn!("Hub did not stop within {:?}, aborting", grace);
                server.task.abort();
                Err(HubError::ShutdownTimeout(grace))
            }
        }
    }
}
