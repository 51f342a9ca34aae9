//! # loadout-collab — real-time layer for Loadout
//!
//! Room-keyed WebSocket fan-out of inventory change events.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     WebSocket      ┌─────────────┐
//! │ RelayClient │ ◄─────────────────► │ RelayServer │
//! │ (per user)  │    JSON frames      │ (central)   │
//! └──────┬──────┘                     └──────┬──────┘
//!        │                                   │
//!        ▼                                   ▼
//! ┌─────────────┐                     ┌──────────────┐
//! │ ViewSession │                     │ RoomRegistry │
//! │ (core)      │                     │ (fan-out)    │
//! └─────────────┘                     └──────────────┘
//! ```
//!
//! The relay is deliberately dumb: it subscribes connections to rooms and
//! reflects `itemStream` frames to every member, byte-for-byte, publisher
//! included. It validates nothing, stores nothing, and loses everything on
//! restart — clients re-join and re-fetch a snapshot to recover.
//!
//! ## Modules
//!
//! - [`protocol`] — JSON wire frames (`joinRoom` / `itemStream`)
//! - [`broadcast`] — per-room fan-out groups and the room registry
//! - [`server`] — the WebSocket relay server
//! - [`client`] — the WebSocket relay client

pub mod broadcast;
pub mod client;
pub mod protocol;
pub mod server;

// Re-exports for convenience
pub use broadcast::{BroadcastGroup, RoomRegistry, RoomStats};
pub use client::{ConnectionState, RelayClient, RelayEvent};
pub use protocol::{Frame, ProtocolError};
pub use server::{RelayConfig, RelayServer, RelayStats};
