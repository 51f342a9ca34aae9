//! WebSocket client for the relay.
//!
//! Joins rooms, publishes confirmed events, and surfaces classified room
//! events to the application. Joined rooms are remembered and replayed on
//! every (re)connect: there is no session resumption, so a delivery gap is
//! expected and healed by the next snapshot fetch rather than replayed.
//! The client never reconnects on its own — that policy belongs to the
//! owner.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;

use loadout_core::event::ChangeEvent;

use crate::protocol::{Frame, ProtocolError};

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Events surfaced to the application.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// Connection established; recorded rooms have been re-joined.
    Connected,
    /// Connection lost. The owner decides whether to reconnect.
    Disconnected,
    /// A classified change event delivered to a joined room.
    Item {
        room_key: String,
        event: ChangeEvent,
    },
}

/// The relay client.
pub struct RelayClient {
    /// Server URL (ws://…)
    server_url: String,

    /// Connection state
    state: Arc<RwLock<ConnectionState>>,

    /// Rooms to (re-)join on every connect
    joined: Arc<RwLock<BTreeSet<String>>>,

    /// Channel to the WebSocket writer task
    outgoing_tx: Option<mpsc::Sender<String>>,

    /// Event receiver for the application
    event_rx: Option<mpsc::Receiver<RelayEvent>>,

    /// Event sender (held by the reader task)
    event_tx: mpsc::Sender<RelayEvent>,
}

impl RelayClient {
    /// Create a new client for the given server URL.
    pub fn new(server_url: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            server_url: server_url.into(),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            joined: Arc::new(RwLock::new(BTreeSet::new())),
            outgoing_tx: None,
            event_rx: Some(event_rx),
            event_tx,
        }
    }

    /// Take the event receiver (can only be called once).
    pub fn take_event_rx(&mut self) -> Option<mpsc::Receiver<RelayEvent>> {
        self.event_rx.take()
    }

    /// Connect to the relay.
    ///
    /// Spawns background tasks for reading and writing, re-joins every
    /// recorded room, and emits [`RelayEvent::Connected`].
    pub async fn connect(&mut self) -> Result<(), ProtocolError> {
        *self.state.write().await = ConnectionState::Connecting;

        match tokio_tungstenite::connect_async(&self.server_url).await {
            Ok((ws_stream, _)) => {
                let (mut ws_writer, mut ws_reader) = ws_stream.split();

                // Writer task: forward the outgoing channel to the socket
                let (out_tx, mut out_rx) = mpsc::channel::<String>(256);
                self.outgoing_tx = Some(out_tx);
                tokio::spawn(async move {
                    while let Some(text) = out_rx.recv().await {
                        if ws_writer.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                });

                *self.state.write().await = ConnectionState::Connected;
                let _ = self.event_tx.send(RelayEvent::Connected).await;

                // Re-join every previously joined room; missed deliveries
                // are healed by the next snapshot fetch, not replayed.
                let rooms: Vec<String> = self.joined.read().await.iter().cloned().collect();
                if !rooms.is_empty() {
                    log::info!("Re-joining {} rooms", rooms.len());
                }
                for room_key in rooms {
                    self.send_frame(&Frame::JoinRoom { room_key }).await?;
                }

                // Reader task: classify and surface incoming frames
                let event_tx = self.event_tx.clone();
                let state = self.state.clone();
                tokio::spawn(async move {
                    while let Some(msg) = ws_reader.next().await {
                        match msg {
                            Ok(Message::Text(text)) => match Frame::decode(text.as_str()) {
                                Ok(Frame::ItemStream { room_key, event }) => {
                                    match ChangeEvent::classify(&event) {
                                        Ok(event) => {
                                            let _ = event_tx
                                                .send(RelayEvent::Item { room_key, event })
                                                .await;
                                        }
                                        Err(e) => {
                                            // Drop the one bad event, keep the stream.
                                            log::warn!(
                                                "Dropping malformed event in room {room_key}: {e}"
                                            );
                                        }
                                    }
                                }
                                Ok(Frame::JoinRoom { .. }) => {
                                    log::debug!("Ignoring joinRoom frame from relay");
                                }
                                Err(e) => {
                                    log::warn!("Failed to decode frame: {e}");
                                }
                            },
                            Ok(Message::Close(_)) | Err(_) => break,
                            _ => {}
                        }
                    }

                    // Connection lost
                    *state.write().await = ConnectionState::Disconnected;
                    let _ = event_tx.send(RelayEvent::Disconnected).await;
                });

                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to connect to {}: {e}", self.server_url);
                *self.state.write().await = ConnectionState::Disconnected;
                Err(ProtocolError::ConnectionClosed)
            }
        }
    }

    /// Join a room.
    ///
    /// The membership is recorded either way and replayed on reconnect;
    /// the frame is only sent while connected.
    pub async fn join(&self, room_key: impl Into<String>) -> Result<(), ProtocolError> {
        let room_key = room_key.into();
        self.joined.write().await.insert(room_key.clone());

        if *self.state.read().await == ConnectionState::Connected {
            self.send_frame(&Frame::JoinRoom { room_key }).await?;
        }
        Ok(())
    }

    /// Publish a confirmed event to a room. Joining first is not required.
    pub async fn publish(
        &self,
        room_key: impl Into<String>,
        event: &ChangeEvent,
    ) -> Result<(), ProtocolError> {
        self.send_frame(&Frame::ItemStream {
            room_key: room_key.into(),
            event: event.to_wire(),
        })
        .await
    }

    async fn send_frame(&self, frame: &Frame) -> Result<(), ProtocolError> {
        let text = frame.encode()?;
        match &self.outgoing_tx {
            Some(tx) => tx
                .send(text)
                .await
                .map_err(|_| ProtocolError::ConnectionClosed),
            None => Err(ProtocolError::ConnectionClosed),
        }
    }

    /// Current connection state.
    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Rooms this client has joined (or will join on connect).
    pub async fn joined_rooms(&self) -> Vec<String> {
        self.joined.read().await.iter().cloned().collect()
    }

    /// Server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}
