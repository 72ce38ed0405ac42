//! WebSocket delivery of transcript events.
//!
//! One pipeline feeds any number of connected clients: a forwarder task
//! pumps the result channel into a broadcast channel, and each connection
//! relays broadcast events as JSON text frames. An idle connection gets a
//! ping every keep-alive interval so proxies don't cut it.

use crate::config::ServerConfig;
use crate::error::{Result, StreamscribeError};
use crate::segment::block::TranscriptEvent;
use crate::segment::pipeline::TranscriptReceiver;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

/// Broadcast buffer per subscriber. A client that lags behind this many
/// events misses the overflowed ones and gets a warning logged.
const BROADCAST_CAPACITY: usize = 64;

/// Messages sent to delivery clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Sent once when the connection is accepted.
    Status { message: String },
    /// One transcribed window.
    Partial { index: u64, text: String },
}

impl ServerMessage {
    fn partial(event: TranscriptEvent) -> Self {
        ServerMessage::Partial {
            index: event.index,
            text: event.text,
        }
    }
}

/// WebSocket server that fans transcript events out to clients.
pub struct TranscriptServer {
    bind: String,
    keepalive: Duration,
}

impl TranscriptServer {
    pub fn new(bind: &str, keepalive: Duration) -> Self {
        Self {
            bind: bind.to_string(),
            keepalive,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(&config.bind, Duration::from_millis(config.keepalive_ms))
    }

    /// Bind the listening socket. Serving starts with [`BoundTranscriptServer::run`].
    pub async fn bind(self) -> Result<BoundTranscriptServer> {
        let listener =
            TcpListener::bind(&self.bind)
                .await
                .map_err(|e| StreamscribeError::Server {
                    message: format!("failed to bind {}: {}", self.bind, e),
                })?;
        log::info!("transcript server listening on {}", self.bind);
        Ok(BoundTranscriptServer {
            listener,
            keepalive: self.keepalive,
        })
    }

    /// Bind and serve until the pipeline's result channel closes.
    pub async fn run(self, receiver: TranscriptReceiver) -> Result<()> {
        self.bind().await?.run(receiver).await
    }
}

/// A transcript server with its socket bound.
pub struct BoundTranscriptServer {
    listener: TcpListener,
    keepalive: Duration,
}

impl BoundTranscriptServer {
    /// The actual listening address, useful when binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| StreamscribeError::Server {
                message: format!("failed to read local address: {}", e),
            })
    }

    /// Serve until the pipeline's result channel closes.
    ///
    /// Per-connection errors only drop that connection; the accept loop
    /// keeps running.
    pub async fn run(self, mut receiver: TranscriptReceiver) -> Result<()> {
        let (events_tx, _) = broadcast::channel::<TranscriptEvent>(BROADCAST_CAPACITY);
        let forward_tx = events_tx.clone();
        let mut forwarder = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                // Err just means no client is connected right now.
                forward_tx.send(event).ok();
            }
        });

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let events = events_tx.subscribe();
                            let keepalive = self.keepalive;
                            tokio::spawn(async move {
                                handle_connection(stream, peer, events, keepalive).await;
                            });
                        }
                        Err(e) => {
                            log::warn!("accept failed: {}", e);
                        }
                    }
                }
                // Pipeline ended; dropping events_tx closes remaining clients.
                _ = &mut forwarder => break,
            }
        }
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    mut events: broadcast::Receiver<TranscriptEvent>,
    keepalive: Duration,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            log::warn!("handshake with {} failed: {}", peer, e);
            return;
        }
    };
    log::info!("client {} connected", peer);
    let (mut sender, mut receiver) = ws.split();

    let status = ServerMessage::Status {
        message: "connected".to_string(),
    };
    if send_json(&mut sender, &status).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            polled = tokio::time::timeout(keepalive, events.recv()) => {
                match polled {
                    Ok(Ok(event)) => {
                        let msg = ServerMessage::partial(event);
                        if send_json(&mut sender, &msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(Err(broadcast::error::RecvError::Lagged(missed))) => {
                        log::warn!("client {} lagged, skipped {} events", peer, missed);
                    }
                    Ok(Err(broadcast::error::RecvError::Closed)) => {
                        sender.send(Message::Close(None)).await.ok();
                        break;
                    }
                    Err(_) => {
                        if sender.send(Message::Ping(Vec::new())).await.is_err() {
                            break;
                        }
                    }
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("client {} errored: {}", peer, e);
                        break;
                    }
                }
            }
        }
    }
    log::info!("client {} disconnected", peer);
}

async fn send_json<S>(sender: &mut S, msg: &ServerMessage) -> std::result::Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let payload = match serde_json::to_string(msg) {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("failed to serialize delivery payload: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(payload)).await.map_err(|_| ())
}
