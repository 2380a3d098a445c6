//! Live listener registry, partitioned by room.
//!
//! The registry owns only the fan-out set: which listeners are currently
//! connected to which room. Message content and history live in the durable
//! log. A room whose listener count drops to zero keeps its log; only the
//! delivery set is emptied.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use relief_grid_core::RoomId;
use relief_grid_store::Message;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A registry mapping rooms to their currently connected listeners.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, HashMap<u64, UnboundedSender<Arc<Message>>>>>,
    next_listener: AtomicU64,
}

impl RoomRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener on a room.
    ///
    /// Returns a handle whose [`Subscription::release`] (or drop)
    /// unregisters the listener, and the channel on which fanned-out
    /// messages arrive.
    pub fn subscribe(
        self: &Arc<Self>,
        room: RoomId,
    ) -> (Subscription, UnboundedReceiver<Arc<Message>>) {
        let listener_id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.rooms
            .write()
            .entry(room)
            .or_default()
            .insert(listener_id, tx);

        tracing::debug!(room = %room, listener_id, "Listener subscribed");

        let subscription = Subscription {
            registry: Arc::clone(self),
            room,
            listener_id,
            released: AtomicBool::new(false),
        };

        (subscription, rx)
    }

    /// Fan a message out to every listener currently registered on its room.
    ///
    /// Delivery to a listener whose receiver is gone is dropped for that
    /// listener and the dead entry is pruned. Returns the number of
    /// listeners that received the message.
    pub fn deliver(&self, message: &Arc<Message>) -> usize {
        let mut dead = Vec::new();
        let mut delivered = 0;

        {
            let rooms = self.rooms.read();
            let Some(listeners) = rooms.get(&message.room) else {
                return 0;
            };

            for (&listener_id, tx) in listeners {
                if tx.send(Arc::clone(message)).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(listener_id);
                }
            }
        }

        if !dead.is_empty() {
            let mut rooms = self.rooms.write();
            if let Some(listeners) = rooms.get_mut(&message.room) {
                for listener_id in dead {
                    listeners.remove(&listener_id);
                }
            }
        }

        delivered
    }

    /// Number of listeners currently registered on a room.
    #[must_use]
    pub fn listener_count(&self, room: &RoomId) -> usize {
        self.rooms.read().get(room).map_or(0, HashMap::len)
    }

    fn release(&self, room: &RoomId, listener_id: u64) {
        let mut rooms = self.rooms.write();
        if let Some(listeners) = rooms.get_mut(room) {
            listeners.remove(&listener_id);
            tracing::debug!(room = %room, listener_id, "Listener released");
        }
    }
}

/// A scoped subscription handle.
///
/// Callers must release the handle on disconnect to stop further delivery;
/// dropping the handle releases it as well. Release is idempotent.
#[derive(Debug)]
pub struct Subscription {
    registry: Arc<RoomRegistry>,
    room: RoomId,
    listener_id: u64,
    released: AtomicBool,
}

impl Subscription {
    /// The room this subscription listens on.
    #[must_use]
    pub const fn room(&self) -> RoomId {
        self.room
    }

    /// Stop delivery to this handle. Safe to call more than once;
    /// in-flight fan-out to other handles is unaffected.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.registry.release(&self.room, self.listener_id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
