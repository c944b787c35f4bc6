//! HTTP and websocket server for the webtime daemon.
//!
//! The server:
//! - Serves the clock page on `/time/` and every path below it
//! - Upgrades `/ws/` (and paths below it) to a websocket and spawns a
//!   ConnectionHandler for it
//! - Redirects `/time` and `/ws` to their trailing-slash forms
//! - Answers everything else with a plain 404
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   TimeServer    │
//! │                 │
//! │  TcpListener    │
//! └───────┬─────────┘
//!         │ GET /ws/ (upgrade)
//!         ▼
//! ┌─────────────────┐  subscribe()  ┌──────────────────────┐
//! │ConnectionHandler│──────────────▶│ SubscriptionRegistrar│
//! │   (per peer)    │◀──────────────│                      │
//! └─────────────────┘  Subscription └──────────────────────┘
//!         │
//!         │ {"time": "..."}
//!         ▼
//! ┌─────────────────┐
//! │ Browser / peer  │
//! └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the crate's panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Connection errors end that connection only

mod connection;
pub mod page;

pub use connection::{ConnectionError, ConnectionHandler, WRITE_TIMEOUT};

use std::net::SocketAddr;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::registrar::SubscriptionRegistrar;

/// Maximum size of a frame accepted from a peer (64 KiB)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Body returned for unknown paths
pub const NOT_FOUND_BODY: &str = "custom 404";

/// State shared by every request handler.
#[derive(Clone)]
struct AppState {
    registrar: SubscriptionRegistrar,
    shutdown: CancellationToken,
    /// `host:port` used on the page when the request has no usable Host header
    fallback_host: String,
}

/// HTTP server exposing the clock page and the websocket feed.
pub struct TimeServer {
    /// Bound listener
    listener: TcpListener,

    /// Address the listener actually bound to
    local_addr: SocketAddr,

    /// Shared request state
    state: AppState,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,
}

impl TimeServer {
    /// Binds the listener.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to listen on (port 0 picks a free port)
    /// * `registrar` - Registrar every websocket subscribes through
    /// * `cancel_token` - Token for graceful shutdown; also ends every open connection
    pub async fn bind(
        addr: SocketAddr,
        registrar: SubscriptionRegistrar,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr,
                error: e.to_string(),
            })?;
        let local_addr = listener.local_addr().map_err(|e| ServerError::Bind {
            addr,
            error: e.to_string(),
        })?;

        let state = AppState {
            registrar,
            shutdown: cancel_token.clone(),
            fallback_host: format!("localhost:{}", local_addr.port()),
        };

        Ok(Self {
            listener,
            local_addr,
            state,
            cancel_token,
        })
    }

    /// Returns the address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the server.
    ///
    /// Serves requests until the cancellation token is triggered.
    /// This method does not return until shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(addr = %self.local_addr, "Daemon server listening");

        let app = router(self.state);
        let cancel_token = self.cancel_token.clone();

        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("Server shutdown requested");
        })
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;

        info!("Server stopped");
        Ok(())
    }
}

/// Path of the clock page
pub const TIME_PATH: &str = "/time/";

/// Path of the websocket feed
pub const WS_PATH: &str = "/ws/";

/// Builds the request router.
///
/// Each prefix owns its whole subtree; the bare form redirects to it.
fn router(state: AppState) -> Router {
    Router::new()
        .route("/time", get(|| async { Redirect::permanent(TIME_PATH) }))
        .route(TIME_PATH, get(home_handler))
        .route("/time/{*rest}", get(home_handler))
        .route("/ws", get(|| async { Redirect::permanent(WS_PATH) }))
        .route(WS_PATH, get(ws_handler))
        .route("/ws/{*rest}", get(ws_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// Serves the clock page.
async fn home_handler(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    Html(page::render(page::sanitize_host(host, &state.fallback_host)))
}

/// Upgrades the request and hands the socket to a ConnectionHandler.
async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let handler = ConnectionHandler::new(peer, state.registrar, state.shutdown.child_token());

    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handler.run(socket))
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },

    #[error("Server error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:8888".parse().unwrap(),
            error: "address in use".to_string(),
        };
        assert!(err.to_string().contains("127.0.0.1:8888"));
        assert!(err.to_string().contains("address in use"));
    }

    #[test]
    fn test_max_message_size() {
        assert_eq!(MAX_MESSAGE_SIZE, 65_536);
    }
}
