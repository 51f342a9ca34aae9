//! WebSocket relay: room-keyed fan-out of inventory change events.
//!
//! ```text
//! Client A ──┐                                ┌──► Client A
//!            ├── room "grant-key" ── publish ─┼──► Client B
//! Client B ──┘        ▲                       └──► (publisher too,
//!                     │                              when subscribed)
//!   Persistence ──────┘  (publishes without joining)
//! ```
//!
//! The relay holds no durable state: a restart loses all membership and
//! in-flight frames, and clients are expected to re-join their rooms and
//! re-fetch a snapshot rather than assume continuity. Event payloads pass
//! through byte-for-byte — authorization happened at the persistence
//! boundary, classification happens at the consuming client.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::broadcast::{BroadcastGroup, RoomRegistry};
use crate::protocol::Frame;

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind to
    pub bind_addr: String,
    /// Frames buffered per room subscriber before lagging members drop
    pub broadcast_capacity: usize,
    /// Outgoing frames buffered per connection
    pub outgoing_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9090".to_string(),
            broadcast_capacity: 256,
            outgoing_capacity: 256,
        }
    }
}

/// Server-wide statistics.
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    pub total_connections: u64,
    pub active_connections: u64,
    pub total_frames: u64,
    pub total_bytes: u64,
    pub active_rooms: usize,
}

/// The relay server.
pub struct RelayServer {
    config: RelayConfig,
    rooms: Arc<RoomRegistry>,
    stats: Arc<RwLock<RelayStats>>,
}

impl RelayServer {
    /// Create a new relay with the given configuration.
    pub fn new(config: RelayConfig) -> Self {
        let rooms = Arc::new(RoomRegistry::new(config.broadcast_capacity));
        Self {
            config,
            rooms,
            stats: Arc::new(RwLock::new(RelayStats::default())),
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(RelayConfig::default())
    }

    /// Start listening for WebSocket connections.
    ///
    /// This runs the accept loop. Call from an async runtime.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        log::info!("Relay listening on {}", self.config.bind_addr);

        loop {
            let (stream, addr) = listener.accept().await?;
            log::debug!("New TCP connection from {addr}");

            let rooms = self.rooms.clone();
            let stats = self.stats.clone();
            let config = self.config.clone();

            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, addr, rooms, stats, config).await
                {
                    log::error!("Connection error from {addr}: {e}");
                }
            });
        }
    }

    /// Handle a single WebSocket connection.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        rooms: Arc<RoomRegistry>,
        stats: Arc<RwLock<RelayStats>>,
        config: RelayConfig,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let ws_stream = tokio_tungstenite::accept_async(stream).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let connection_id = Uuid::new_v4();
        log::info!("Connection {connection_id} established from {addr}");

        {
            let mut s = stats.write().await;
            s.total_connections += 1;
            s.active_connections += 1;
        }

        // Rooms this connection has joined. Each membership runs a
        // forwarder task moving frames from the room channel into this
        // connection's single outgoing queue, so one connection can sit in
        // any number of rooms.
        let mut joined: HashMap<String, (Arc<BroadcastGroup>, tokio::task::JoinHandle<()>)> =
            HashMap::new();
        let (out_tx, mut out_rx) = mpsc::channel::<Arc<str>>(config.outgoing_capacity);

        loop {
            tokio::select! {
                // Incoming WebSocket message
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            {
                                let mut s = stats.write().await;
                                s.total_frames += 1;
                                s.total_bytes += text.len() as u64;
                            }

                            match Frame::decode(text.as_str()) {
                                Ok(Frame::JoinRoom { room_key }) => {
                                    // Rejoining is idempotent.
                                    if joined.contains_key(&room_key) {
                                        log::debug!(
                                            "Connection {connection_id} already in room {room_key}"
                                        );
                                        continue;
                                    }

                                    let group = rooms.get_or_create(&room_key).await;
                                    let mut rx = group.join(connection_id).await;

                                    let tx = out_tx.clone();
                                    let lag_group = group.clone();
                                    let lag_room = room_key.clone();
                                    let forwarder = tokio::spawn(async move {
                                        loop {
                                            match rx.recv().await {
                                                Ok(frame) => {
                                                    if tx.send(frame).await.is_err() {
                                                        break;
                                                    }
                                                }
                                                Err(broadcast::error::RecvError::Lagged(n)) => {
                                                    lag_group.note_lagged(n);
                                                    log::warn!(
                                                        "Connection {connection_id} lagged by {n} frames in room {lag_room}"
                                                    );
                                                }
                                                Err(broadcast::error::RecvError::Closed) => break,
                                            }
                                        }
                                    });

                                    joined.insert(room_key.clone(), (group, forwarder));
                                    {
                                        let mut s = stats.write().await;
                                        s.active_rooms = rooms.room_count().await;
                                    }
                                    log::info!(
                                        "Connection {connection_id} joined room {room_key}"
                                    );
                                }

                                Ok(Frame::ItemStream { room_key, .. }) => {
                                    // Forward the original text untouched; joining is not
                                    // required to publish. No room means no subscribers —
                                    // the publish is a silent no-op.
                                    match rooms.get(&room_key).await {
                                        Some(group) => {
                                            let delivered =
                                                group.publish(Arc::from(text.as_str()));
                                            log::debug!(
                                                "Relayed event to {delivered} members of room {room_key}"
                                            );
                                        }
                                        None => {
                                            log::debug!(
                                                "Dropped event for subscriber-less room {room_key}"
                                            );
                                        }
                                    }
                                }

                                Err(e) => {
                                    // One malformed frame never takes down the stream.
                                    log::warn!("Failed to decode frame from {addr}: {e}");
                                }
                            }
                        }

                        Some(Ok(Message::Close(_))) | None => {
                            log::info!("Connection {connection_id} closed from {addr}");
                            break;
                        }

                        Some(Ok(Message::Ping(data))) => {
                            ws_sender.send(Message::Pong(data)).await?;
                        }

                        Some(Ok(Message::Binary(_))) => {
                            log::debug!("Ignoring binary frame from {addr}");
                        }

                        Some(Err(e)) => {
                            log::error!("WebSocket error from {addr}: {e}");
                            break;
                        }

                        _ => {}
                    }
                }

                // Outgoing frame fanned in from one of the joined rooms
                frame = out_rx.recv() => {
                    match frame {
                        Some(frame) => {
                            ws_sender.send(Message::Text(frame.to_string().into())).await?;
                        }
                        None => break,
                    }
                }
            }
        }

        // Cleanup: leave every room; drop rooms left empty.
        for (room_key, (group, forwarder)) in joined {
            forwarder.abort();
            group.leave(&connection_id).await;
            rooms.remove_if_empty(&room_key).await;
        }
        {
            let mut s = stats.write().await;
            s.active_connections = s.active_connections.saturating_sub(1);
            s.active_rooms = rooms.room_count().await;
        }

        Ok(())
    }

    /// Get server statistics.
    pub async fn stats(&self) -> RelayStats {
        self.stats.read().await.clone()
    }

    /// Get the configured bind address.
    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }

    /// Get the room registry.
    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_config_default() {
        let config = RelayConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:9090");
        assert_eq!(config.broadcast_capacity, 256);
        assert_eq!(config.outgoing_capacity, 256);
    }

    #[test]
    fn test_relay_creation() {
        let relay = RelayServer::with_defaults();
        assert_eq!(relay.bind_addr(), "127.0.0.1:9090");
    }

    #[test]
    fn test_relay_custom_config() {
        let config = RelayConfig {
            bind_addr: "0.0.0.0:8080".to_string(),
            broadcast_capacity: 64,
            outgoing_capacity: 32,
        };
        let relay = RelayServer::new(config);
        assert_eq!(relay.bind_addr(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_relay_stats_initial() {
        let relay = RelayServer::with_defaults();
        let stats = relay.stats().await;
        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.active_connections, 0);
        assert_eq!(stats.total_frames, 0);
        assert_eq!(stats.total_bytes, 0);
        assert_eq!(stats.active_rooms, 0);
    }

    #[tokio::test]
    async fn test_relay_starts_with_no_rooms() {
        let relay = RelayServer::with_defaults();
        assert_eq!(relay.rooms().room_count().await, 0);
    }
}
