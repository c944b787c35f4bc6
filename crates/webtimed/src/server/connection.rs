//! Connection handler for individual websocket peers.
//!
//! Each upgraded connection gets its own `ConnectionHandler` that:
//! - Subscribes to the ticker through the registrar
//! - Relays every delivered tick to the peer as a `TimeUpdate` frame
//! - Logs (and otherwise ignores) frames sent by the peer
//! - Cancels its subscription when the peer goes away or a write fails
//!
//! # Panic-Free Guarantees
//!
//! This module follows the crate's panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Connection errors are logged and result in graceful disconnect

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use webtime_protocol::{ProtocolError, TimeUpdate};

use crate::registrar::{Subscription, SubscriptionRegistrar};

/// Write timeout (10 seconds)
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Relays ticks from one subscription to one websocket peer.
pub struct ConnectionHandler {
    /// Remote address, for logging
    peer: SocketAddr,

    /// Source of the subscription
    registrar: SubscriptionRegistrar,

    /// Fires when this connection should end
    cancel: CancellationToken,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `peer` - Remote address of the client
    /// * `registrar` - Registrar to subscribe through
    /// * `cancel` - Token ending this connection (usually a child of the server's)
    pub fn new(peer: SocketAddr, registrar: SubscriptionRegistrar, cancel: CancellationToken) -> Self {
        Self {
            peer,
            registrar,
            cancel,
        }
    }

    /// Runs the connection until the peer leaves or the server stops.
    pub async fn run(self, socket: WebSocket) {
        info!(peer = %self.peer, "Client connected");

        let updates = self.registrar.subscribe(self.cancel.clone());
        let (sink, stream) = socket.split();

        let reader = tokio::spawn(read_loop(stream, self.peer, self.cancel.clone()));

        if let Err(e) = write_loop(sink, updates, self.peer).await {
            debug!(peer = %self.peer, error = %e, "Connection closed");
        }

        // Whatever ended the writer, the subscription and reader go with it
        self.cancel.cancel();
        let _ = reader.await;

        info!(peer = %self.peer, "Client disconnected");
    }
}

/// Forwards ticks to the peer until the subscription closes.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut updates: Subscription,
    peer: SocketAddr,
) -> Result<(), ConnectionError> {
    while let Some(tick) = updates.recv().await {
        let json = TimeUpdate::from(&tick).to_json()?;
        debug!(peer = %peer, seq = tick.seq, "Sending update");
        send_frame(&mut sink, Message::Text(json.into())).await?;
    }

    // Subscription over: tell the peer, but don't wait long for it
    let _ = send_frame(&mut sink, Message::Close(None)).await;
    Ok(())
}

/// Sends a single frame with the write timeout applied.
async fn send_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: Message,
) -> Result<(), ConnectionError> {
    match timeout(WRITE_TIMEOUT, sink.send(msg)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ConnectionError::Io(e.to_string())),
        Err(_) => Err(ConnectionError::WriteTimeout),
    }
}

/// Drains frames from the peer, cancelling `cancel` when the peer goes away.
async fn read_loop(mut stream: SplitStream<WebSocket>, peer: SocketAddr, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        debug!(peer = %peer, text = %text.as_str(), "Received text frame");
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!(peer = %peer, len = data.len(), "Received binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(peer = %peer, "Peer closed connection");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong are answered by the websocket layer
                    }
                    Some(Err(e)) => {
                        debug!(peer = %peer, error = %e, "Read error");
                        break;
                    }
                }
            }
        }
    }

    cancel.cancel();
}

/// Errors that can occur while relaying to a peer.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Encode error: {0}")]
    Encode(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Write timeout")]
    WriteTimeout,
}
