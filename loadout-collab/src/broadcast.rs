//! Room-keyed fan-out with backpressure.
//!
//! Uses tokio broadcast channels for O(1) send to all subscribers. Each
//! member gets an independent receiver buffering up to `capacity` frames;
//! a member that falls behind drops frames rather than stalling the room.
//! Rooms are the mutual-exclusion boundary: every room owns its own
//! channel, so traffic in one room never blocks another, and the registry
//! lock is held only for lookup/insert.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Statistics for monitoring room health.
#[derive(Debug, Clone, Default)]
pub struct RoomStats {
    pub frames_sent: u64,
    pub frames_dropped: u64,
    pub members: usize,
}

/// Atomic room stats — lock-free on the publish path.
struct AtomicRoomStats {
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
}

impl AtomicRoomStats {
    fn new() -> Self {
        Self {
            frames_sent: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
        }
    }
}

/// A broadcast group for a single room.
///
/// Every member shares one channel; a published frame is fanned out to
/// whatever receiver set exists at send time, the publisher's own
/// receiver included when it is subscribed. A member that joins later
/// simply misses the frame — recovered by the next snapshot fetch.
pub struct BroadcastGroup {
    /// Broadcast channel sender (cloned per room)
    sender: broadcast::Sender<Arc<str>>,

    /// Connections subscribed to this room
    members: Arc<RwLock<HashSet<Uuid>>>,

    /// Channel capacity (frames buffered per receiver)
    capacity: usize,

    /// Lock-free stats (atomics)
    stats: Arc<AtomicRoomStats>,
}

impl BroadcastGroup {
    /// Create a new broadcast group with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            members: Arc::new(RwLock::new(HashSet::new())),
            capacity,
            stats: Arc::new(AtomicRoomStats::new()),
        }
    }

    /// Subscribe a connection to this room.
    ///
    /// Returns the receiver the connection consumes frames from.
    pub async fn join(&self, connection: Uuid) -> broadcast::Receiver<Arc<str>> {
        let mut members = self.members.write().await;
        members.insert(connection);
        self.sender.subscribe()
    }

    /// Remove a connection; returns false (without raising) when it was
    /// already absent.
    pub async fn leave(&self, connection: &Uuid) -> bool {
        let mut members = self.members.write().await;
        members.remove(connection)
    }

    /// Whether a connection is subscribed.
    pub async fn contains(&self, connection: &Uuid) -> bool {
        self.members.read().await.contains(connection)
    }

    /// Current member count.
    pub async fn member_count(&self) -> usize {
        self.members.read().await.len()
    }

    /// Fan a pre-encoded frame out to every current receiver.
    ///
    /// Returns the receiver count; sending into an empty room is a silent
    /// no-op. Lock-free: tokio broadcast::send + atomic stats.
    pub fn publish(&self, frame: Arc<str>) -> usize {
        let count = self.sender.send(frame).unwrap_or(0);
        self.stats.frames_sent.fetch_add(1, Ordering::Relaxed);
        count
    }

    /// Record frames a lagging member dropped.
    pub(crate) fn note_lagged(&self, count: u64) {
        self.stats.frames_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Snapshot of this room's statistics.
    pub async fn stats(&self) -> RoomStats {
        let members = self.members.read().await;
        RoomStats {
            frames_sent: self.stats.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.stats.frames_dropped.load(Ordering::Relaxed),
            members: members.len(),
        }
    }

    /// Channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Subscribe without membership tracking (raw receiver).
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.sender.subscribe()
    }
}

/// Room registry: opaque room key → broadcast group.
///
/// Keys are grant-key strings; each room gets its own group so frames are
/// isolated between parties.
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, Arc<BroadcastGroup>>>>,
    default_capacity: usize,
}

impl RoomRegistry {
    /// Create a new registry.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            default_capacity,
        }
    }

    /// Look a room up without creating it. Publishing uses this path: a
    /// room with no members does not exist, and the publish is a no-op.
    pub async fn get(&self, key: &str) -> Option<Arc<BroadcastGroup>> {
        self.rooms.read().await.get(key).cloned()
    }

    /// Get or create the room for a key.
    pub async fn get_or_create(&self, key: &str) -> Arc<BroadcastGroup> {
        // Fast path: read lock
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(key) {
                return room.clone();
            }
        }

        // Slow path: write lock to create
        let mut rooms = self.rooms.write().await;
        // Double-check after acquiring write lock
        if let Some(room) = rooms.get(key) {
            return room.clone();
        }

        let room = Arc::new(BroadcastGroup::new(self.default_capacity));
        rooms.insert(key.to_string(), room.clone());
        room
    }

    /// Remove a room once its last member left.
    pub async fn remove_if_empty(&self, key: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get(key) {
            if room.member_count().await == 0 {
                rooms.remove(key);
                return true;
            }
        }
        false
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Keys of all live rooms.
    pub async fn active_rooms(&self) -> Vec<String> {
        self.rooms.read().await.keys().cloned().collect()
    }
}
