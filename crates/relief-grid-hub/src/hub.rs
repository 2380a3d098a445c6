//! The message hub: sequence assignment, durable append, and fan-out.
//!
//! Publishing is serialized per room so that sequence numbers are assigned
//! atomically even under concurrent publishers, and so that fan-out order
//! matches sequence order. Rooms are independent: a slow append or a busy
//! room never delays another room.
//!
//! The hard invariant is **durability precedes delivery**: a message is
//! fanned out only after the durable store has confirmed the append. A
//! failed or timed-out append surfaces as [`HubError::Persistence`] and
//! nothing is delivered.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use relief_grid_core::{ActorId, MessageId, RoomId};
use relief_grid_store::{Message, Store};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{HubError, Result};
use crate::registry::{RoomRegistry, Subscription};

/// Configuration for the message hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// How long a durable append may take before publish fails with
    /// [`HubError::Persistence`] instead of hanging.
    pub persist_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            persist_timeout: Duration::from_secs(5),
        }
    }
}

/// Per-room publish state: the serialization point for sequence assignment.
///
/// `None` until the head is lazily loaded from the durable log, so sequence
/// numbers continue where a previous process left off.
#[derive(Debug, Default)]
struct RoomHead {
    last_sequence: Option<u64>,
}

/// The message hub service.
pub struct MessageHub<S: Store> {
    store: Arc<S>,
    registry: Arc<RoomRegistry>,
    rooms: Mutex<HashMap<RoomId, Arc<AsyncMutex<RoomHead>>>>,
    config: HubConfig,
}

impl<S: Store + 'static> MessageHub<S> {
    /// Create a new hub over the given store.
    #[must_use]
    pub fn new(store: Arc<S>, config: HubConfig) -> Self {
        Self {
            store,
            registry: Arc::new(RoomRegistry::new()),
            rooms: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, HubConfig::default())
    }

    /// The live listener registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Register a live listener on a room.
    ///
    /// Joining clients call [`Self::history`] first, then `subscribe`, and
    /// discard any pushed message whose sequence they have already seen;
    /// that closes the join-boundary race in either direction.
    pub fn subscribe(&self, room: RoomId) -> (Subscription, UnboundedReceiver<Arc<Message>>) {
        self.registry.subscribe(room)
    }

    /// Publish a message to a room.
    ///
    /// Assigns the room's next sequence number, appends to the durable log,
    /// then fans out to every currently connected listener of that room.
    /// Returns the stamped message so callers observe the canonical record
    /// without re-reading.
    ///
    /// # Errors
    ///
    /// - [`HubError::EmptyMessage`] if `content` is empty after trimming;
    /// - [`HubError::Persistence`] if the durable append fails or exceeds
    ///   the configured timeout. Nothing is fanned out, and the cached
    ///   sequence head is discarded so a retry resumes from whatever the
    ///   durable log actually holds.
    pub async fn publish(&self, room: RoomId, author: ActorId, content: &str) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(HubError::EmptyMessage);
        }

        let head = self.room_head(room);

        // Per-room serialization point: sequence assignment, durable
        // append, and fan-out happen under this lock so two racing
        // publishers can neither share a sequence nor deliver out of order.
        let mut head = head.lock().await;

        let last = match head.last_sequence {
            Some(last) => last,
            None => self
                .store
                .last_sequence(&room)
                .map_err(|e| HubError::Persistence(e.to_string()))?,
        };
        let sequence = last + 1;

        let created_at = Utc::now();
        let message = Message {
            message_id: MessageId::derive(
                &room,
                sequence,
                created_at.timestamp_nanos_opt().unwrap_or_default(),
            ),
            room,
            author,
            content: content.to_string(),
            created_at,
            sequence,
        };

        if let Err(e) = self.append_with_timeout(message.clone()).await {
            // A timed-out append may still land in the log after we give
            // up on it. Forget the cached head so the next publish
            // re-reads it from the store instead of re-assigning a
            // sequence the log may already hold.
            head.last_sequence = None;
            return Err(e);
        }
        head.last_sequence = Some(sequence);

        let message = Arc::new(message);
        let delivered = self.registry.deliver(&message);

        tracing::debug!(
            room = %room,
            sequence,
            delivered,
            "Published message"
        );

        Ok(Arc::unwrap_or_clone(message))
    }

    /// Read a room's backlog in sequence order, starting after
    /// `since_sequence` (0 for the full log).
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Persistence`] if the durable store cannot be
    /// read.
    pub async fn history(&self, room: RoomId, since_sequence: u64) -> Result<Vec<Message>> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.read_log(&room, since_sequence))
            .await
            .map_err(|e| HubError::Internal(e.to_string()))?
            .map_err(|e| HubError::Persistence(e.to_string()))
    }

    /// Get or create the per-room head lock.
    fn room_head(&self, room: RoomId) -> Arc<AsyncMutex<RoomHead>> {
        Arc::clone(self.rooms.lock().entry(room).or_default())
    }

    /// Append to the durable log, bounded by the configured timeout.
    async fn append_with_timeout(&self, message: Message) -> Result<()> {
        let store = Arc::clone(&self.store);
        let append = tokio::task::spawn_blocking(move || store.append_message(&message));

        match tokio::time::timeout(self.config.persist_timeout, append).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(HubError::Persistence(e.to_string())),
            Ok(Err(join)) => Err(HubError::Internal(join.to_string())),
            Err(_) => Err(HubError::Persistence(format!(
                "durable append exceeded {:?}",
                self.config.persist_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_grid_core::{DisasterId, ResourceId, TaskId};
    use relief_grid_store::{
        ContactProfile, DisasterRecord, ResourceRecord, RocksStore, StoreError, TaskRecord,
    };
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn setup() -> (Arc<MessageHub<RocksStore>>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        (Arc::new(MessageHub::with_defaults(store)), dir)
    }

    fn actor(uid: &str) -> ActorId {
        uid.parse().unwrap()
    }

    /// How the next `append_message` call should behave. One-shot: the
    /// store reverts to healthy after taking the injected behavior.
    enum AppendMode {
        Healthy,
        /// Fail without writing anything.
        Fail,
        /// Commit the write, then block long enough that the hub's
        /// timeout fires first.
        CommitThenStall(Duration),
    }

    /// A store wrapper with injectable append behavior, for exercising
    /// the publish failure paths against a real durable log underneath.
    struct FlakyStore {
        inner: RocksStore,
        append_mode: Mutex<AppendMode>,
    }

    impl FlakyStore {
        fn open(dir: &TempDir) -> Arc<Self> {
            Arc::new(Self {
                inner: RocksStore::open(dir.path()).unwrap(),
                append_mode: Mutex::new(AppendMode::Healthy),
            })
        }

        fn inject(&self, mode: AppendMode) {
            *self.append_mode.lock() = mode;
        }
    }

    impl Store for FlakyStore {
        fn append_message(&self, message: &Message) -> relief_grid_store::Result<()> {
            let mode = std::mem::replace(&mut *self.append_mode.lock(), AppendMode::Healthy);
            match mode {
                AppendMode::Healthy => self.inner.append_message(message),
                AppendMode::Fail => Err(StoreError::Database("injected append failure".into())),
                AppendMode::CommitThenStall(stall) => {
                    self.inner.append_message(message)?;
                    std::thread::sleep(stall);
                    Ok(())
                }
            }
        }

        fn last_sequence(&self, room: &RoomId) -> relief_grid_store::Result<u64> {
            self.inner.last_sequence(room)
        }

        fn read_log(&self, room: &RoomId, since: u64) -> relief_grid_store::Result<Vec<Message>> {
            self.inner.read_log(room, since)
        }

        fn put_disaster(&self, disaster: &DisasterRecord) -> relief_grid_store::Result<()> {
            self.inner.put_disaster(disaster)
        }

        fn get_disaster(
            &self,
            disaster_id: &DisasterId,
        ) -> relief_grid_store::Result<Option<DisasterRecord>> {
            self.inner.get_disaster(disaster_id)
        }

        fn list_disasters_by_prefix(
            &self,
            prefix: &str,
        ) -> relief_grid_store::Result<Vec<DisasterRecord>> {
            self.inner.list_disasters_by_prefix(prefix)
        }

        fn list_all_disasters(&self) -> relief_grid_store::Result<Vec<DisasterRecord>> {
            self.inner.list_all_disasters()
        }

        fn put_contact(&self, contact: &ContactProfile) -> relief_grid_store::Result<()> {
            self.inner.put_contact(contact)
        }

        fn get_contact(&self, uid: &ActorId) -> relief_grid_store::Result<Option<ContactProfile>> {
            self.inner.get_contact(uid)
        }

        fn list_contacts_by_prefix(
            &self,
            prefix: &str,
        ) -> relief_grid_store::Result<Vec<ContactProfile>> {
            self.inner.list_contacts_by_prefix(prefix)
        }

        fn list_all_contacts(&self) -> relief_grid_store::Result<Vec<ContactProfile>> {
            self.inner.list_all_contacts()
        }

        fn put_task(&self, task: &TaskRecord) -> relief_grid_store::Result<()> {
            self.inner.put_task(task)
        }

        fn get_task(&self, task_id: &TaskId) -> relief_grid_store::Result<Option<TaskRecord>> {
            self.inner.get_task(task_id)
        }

        fn list_tasks_by_disaster(
            &self,
            disaster_id: &DisasterId,
        ) -> relief_grid_store::Result<Vec<TaskRecord>> {
            self.inner.list_tasks_by_disaster(disaster_id)
        }

        fn put_resource(&self, resource: &ResourceRecord) -> relief_grid_store::Result<()> {
            self.inner.put_resource(resource)
        }

        fn get_resource(
            &self,
            resource_id: &ResourceId,
        ) -> relief_grid_store::Result<Option<ResourceRecord>> {
            self.inner.get_resource(resource_id)
        }

        fn delete_resource(&self, resource_id: &ResourceId) -> relief_grid_store::Result<()> {
            self.inner.delete_resource(resource_id)
        }

        fn list_resources_by_disaster(
            &self,
            disaster_id: &DisasterId,
        ) -> relief_grid_store::Result<Vec<ResourceRecord>> {
            self.inner.list_resources_by_disaster(disaster_id)
        }
    }

    #[tokio::test]
    async fn publish_assigns_sequences_from_one() {
        let (hub, _dir) = setup();
        let room = RoomId::Disaster(DisasterId::generate());

        let first = hub.publish(room, actor("a"), "need water").await.unwrap();
        let second = hub.publish(room, actor("b"), "on my way").await.unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(first.room, room);
    }

    #[tokio::test]
    async fn publish_rejects_empty_content() {
        let (hub, _dir) = setup();

        let result = hub.publish(RoomId::Global, actor("a"), "   ").await;
        assert!(matches!(result, Err(HubError::EmptyMessage)));

        // Nothing was appended.
        assert!(hub.history(RoomId::Global, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sequences_resume_after_restart() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let room = RoomId::Global;

        {
            let hub = MessageHub::with_defaults(Arc::clone(&store));
            hub.publish(room, actor("a"), "before restart").await.unwrap();
        }

        // A fresh hub over the same store continues the sequence.
        let hub = MessageHub::with_defaults(store);
        let next = hub.publish(room, actor("a"), "after restart").await.unwrap();
        assert_eq!(next.sequence, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_publishers_get_distinct_consecutive_sequences() {
        let (hub, _dir) = setup();
        let room = RoomId::Disaster(DisasterId::generate());

        let mut handles = Vec::new();
        for i in 0..32 {
            let hub = Arc::clone(&hub);
            handles.push(tokio::spawn(async move {
                hub.publish(room, actor("racer"), &format!("msg {i}"))
                    .await
                    .unwrap()
                    .sequence
            }));
        }

        let mut sequences = HashSet::new();
        for handle in handles {
            assert!(sequences.insert(handle.await.unwrap()));
        }

        // Exactly N distinct, consecutive sequence numbers.
        assert_eq!(sequences.len(), 32);
        assert_eq!(*sequences.iter().min().unwrap(), 1);
        assert_eq!(*sequences.iter().max().unwrap(), 32);
    }

    #[tokio::test]
    async fn fanout_reaches_current_listeners_only() {
        let (hub, _dir) = setup();
        let room = RoomId::Disaster(DisasterId::generate());
        let other = RoomId::Disaster(DisasterId::generate());

        let (_sub, mut rx) = hub.subscribe(room);
        let (_sub_other, mut rx_other) = hub.subscribe(other);
        let (sub_gone, rx_gone) = hub.subscribe(room);

        sub_gone.release();
        drop(rx_gone);

        let published = hub.publish(room, actor("a"), "need water").await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.sequence, published.sequence);
        assert_eq!(received.content, "need water");

        // Room isolation: the other room saw nothing.
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn history_then_subscribe_sees_every_message_once() {
        let (hub, _dir) = setup();
        let room = RoomId::Disaster(DisasterId::generate());

        hub.publish(room, actor("a"), "one").await.unwrap();
        hub.publish(room, actor("a"), "two").await.unwrap();

        // Late joiner: backlog, then live subscription, deduplicating by
        // sequence as the consumer contract requires.
        let backlog = hub.history(room, 0).await.unwrap();
        let (_sub, mut rx) = hub.subscribe(room);

        hub.publish(room, actor("b"), "three").await.unwrap();

        let mut seen: Vec<u64> = backlog.iter().map(|m| m.sequence).collect();
        while let Ok(pushed) = rx.try_recv() {
            if !seen.contains(&pushed.sequence) {
                seen.push(pushed.sequence);
            }
        }

        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn history_since_returns_only_the_tail() {
        let (hub, _dir) = setup();
        let room = RoomId::Global;

        for text in ["a", "b", "c"] {
            hub.publish(room, actor("x"), text).await.unwrap();
        }

        let tail = hub.history(room, 2).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].content, "c");
    }

    #[tokio::test]
    async fn failed_append_delivers_nothing_and_room_stays_usable() {
        let dir = TempDir::new().unwrap();
        let store = FlakyStore::open(&dir);
        let hub = MessageHub::with_defaults(Arc::clone(&store));
        let room = RoomId::Disaster(DisasterId::generate());

        let (_sub, mut rx) = hub.subscribe(room);

        store.inject(AppendMode::Fail);
        let result = hub.publish(room, actor("a"), "need water").await;
        assert!(matches!(result, Err(HubError::Persistence(_))));

        // Durability precedes delivery: the listener saw nothing and the
        // log is empty.
        assert!(rx.try_recv().is_err());
        assert!(hub.history(room, 0).await.unwrap().is_empty());

        // The failure was transient; a retry publishes normally.
        let retried = hub.publish(room, actor("a"), "need water").await.unwrap();
        assert_eq!(retried.sequence, 1);
        assert_eq!(rx.recv().await.unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn room_recovers_after_append_outlives_the_timeout() {
        let dir = TempDir::new().unwrap();
        let store = FlakyStore::open(&dir);
        let hub = MessageHub::new(
            Arc::clone(&store),
            HubConfig {
                persist_timeout: Duration::from_millis(50),
            },
        );
        let room = RoomId::Disaster(DisasterId::generate());

        let (_sub, mut rx) = hub.subscribe(room);

        // The append commits, then stalls past the hub's timeout: the
        // publish is reported as failed even though sequence 1 landed.
        store.inject(AppendMode::CommitThenStall(Duration::from_millis(200)));
        let result = hub.publish(room, actor("a"), "first").await;
        assert!(matches!(result, Err(HubError::Persistence(_))));
        assert!(rx.try_recv().is_err());
        assert_eq!(hub.history(room, 0).await.unwrap().len(), 1);

        // The retry must not re-assign the sequence the log already
        // holds: the hub re-reads the durable head and moves on to 2.
        let retried = hub.publish(room, actor("a"), "second").await.unwrap();
        assert_eq!(retried.sequence, 2);
        assert_eq!(rx.recv().await.unwrap().content, "second");

        let log = hub.history(room, 0).await.unwrap();
        assert_eq!(
            log.iter().map(|m| m.sequence).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }
}
