//! The hub: a single coordinator task owning every room.
//!
//! Room creation, registration, deregistration and broadcast requests are
//! submitted through a [`HubHandle`] onto one bounded FIFO event queue. The
//! coordinator consumes events one at a time, so membership changes and
//! fan-out decisions are totally ordered and the room table needs no lock.
//! Only the [`RoomDirectory`] used for listings is shared, and the coordinator
//! updates it within the same step as the change it mirrors.

use huddle_protocol::{codec, MessageKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::directory::{RoomDirectory, RoomInfo, SessionInfo};
use crate::message::Message;
use crate::metrics::{self, DropReason};
use crate::room::{validate_room_id, Room, RoomId};
use crate::session::{Session, SessionBinding, SessionToken};

/// Hub errors.
#[derive(Debug, Error)]
pub enum HubError {
    /// Invalid room id.
    #[error("Invalid room id: {0}")]
    InvalidRoomId(&'static str),

    /// The coordinator is no longer running.
    #[error("Hub is not running")]
    Closed,
}

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the coordinator's event queue.
    pub event_queue_capacity: usize,
    /// How long the coordinator waits on one recipient's full queue (or
    /// stalled transport, for signals) before dropping the message for it.
    pub enqueue_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: 64,
            enqueue_timeout: Duration::from_millis(250),
        }
    }
}

enum HubEvent {
    CreateRoom {
        room_id: RoomId,
        name: String,
        done: oneshot::Sender<()>,
    },
    Register(Session),
    Unregister {
        binding: SessionBinding,
        token: SessionToken,
    },
    Broadcast(Message),
}

/// Cloneable entry point to a running hub.
#[derive(Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
    directory: Arc<RoomDirectory>,
}

impl HubHandle {
    async fn submit(&self, event: HubEvent) -> Result<(), HubError> {
        self.events.send(event).await.map_err(|_| HubError::Closed)
    }

    /// Create an empty room, replacing any room with the same id.
    ///
    /// Returns once the coordinator has applied the change, so a following
    /// registration is guaranteed to see the room.
    ///
    /// # Errors
    ///
    /// Returns an error if the room id is invalid or the hub has stopped.
    pub async fn create_room(
        &self,
        room_id: impl Into<RoomId>,
        name: impl Into<String>,
    ) -> Result<(), HubError> {
        let room_id = room_id.into();
        validate_room_id(&room_id).map_err(HubError::InvalidRoomId)?;

        let (done, applied) = oneshot::channel();
        self.submit(HubEvent::CreateRoom {
            room_id,
            name: name.into(),
            done,
        })
        .await?;
        applied.await.map_err(|_| HubError::Closed)
    }

    /// Submit a session for registration into its room.
    ///
    /// Registration is fire-and-forget: a missing room is logged by the
    /// coordinator, not reported here.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the hub has stopped.
    pub async fn register(&self, session: Session) -> Result<(), HubError> {
        self.submit(HubEvent::Register(session)).await
    }

    /// Submit a deregistration.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the hub has stopped.
    pub async fn unregister(
        &self,
        binding: SessionBinding,
        token: SessionToken,
    ) -> Result<(), HubError> {
        self.submit(HubEvent::Unregister { binding, token }).await
    }

    /// Submit a message for delivery to its room.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the hub has stopped.
    pub async fn broadcast(&self, message: Message) -> Result<(), HubError> {
        self.submit(HubEvent::Broadcast(message)).await
    }

    /// Snapshot of all rooms.
    #[must_use]
    pub fn list_rooms(&self) -> Vec<RoomInfo> {
        self.directory.rooms()
    }

    /// Snapshot of a room's sessions; empty for an unknown room.
    #[must_use]
    pub fn list_sessions(&self, room_id: &str) -> Vec<SessionInfo> {
        self.directory.sessions(room_id)
    }

    /// Check if the coordinator is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.events.is_closed()
    }
}

/// The coordinator.
///
/// Created together with its [`HubHandle`] and driven by [`Hub::run`]. It
/// stops once every handle has been dropped.
pub struct Hub {
    rooms: HashMap<RoomId, Room>,
    events: mpsc::Receiver<HubEvent>,
    directory: Arc<RoomDirectory>,
    config: HubConfig,
}

impl Hub {
    /// Create a hub and its handle.
    #[must_use]
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        info!("Creating hub with config: {:?}", config);
        let (tx, rx) = mpsc::channel(config.event_queue_capacity.max(1));
        let directory = Arc::new(RoomDirectory::new());

        let hub = Self {
            rooms: HashMap::new(),
            events: rx,
            directory: Arc::clone(&directory),
            config,
        };
        let handle = HubHandle {
            events: tx,
            directory,
        };
        (hub, handle)
    }

    /// Create a hub and run it on a new task.
    #[must_use]
    pub fn spawn(config: HubConfig) -> HubHandle {
        let (hub, handle) = Self::new(config);
        tokio::spawn(hub.run());
        handle
    }

    /// Process events until every handle is dropped.
    pub async fn run(mut self) {
        info!("Hub running");
        while let Some(event) = self.events.recv().await {
            match event {
                HubEvent::CreateRoom {
                    room_id,
                    name,
                    done,
                } => {
                    self.create_room(room_id, name);
                    let _ = done.send(());
                }
                HubEvent::Register(session) => self.register(session).await,
                HubEvent::Unregister { binding, token } => self.unregister(&binding, token).await,
                HubEvent::Broadcast(message) => self.broadcast(message).await,
            }
        }
        info!("Hub stopped");
    }

    fn active_sessions(&self) -> usize {
        self.rooms.values().map(Room::len).sum()
    }

    fn create_room(&mut self, room_id: RoomId, name: String) {
        self.directory.put_room(&room_id, &name);
        let replaced = self.rooms.insert(room_id.clone(), Room::new(room_id.clone(), name));

        match replaced {
            Some(old) => {
                // Dropping the old room closes its members' queues
                warn!(room = %room_id, members = old.len(), "Room replaced");
                metrics::set_active_sessions(self.active_sessions());
            }
            None => info!(room = %room_id, "Room created"),
        }
        metrics::set_active_rooms(self.rooms.len());
    }

    async fn register(&mut self, session: Session) {
        let binding = session.binding().clone();

        let Some(room) = self.rooms.get_mut(&binding.room_id) else {
            warn!(
                room = %binding.room_id,
                session = %binding.session_id,
                identity = %binding.identity,
                "Room does not exist, registration dropped"
            );
            return;
        };

        if let Err(rejected) = room.insert(session) {
            info!(
                room = %binding.room_id,
                session = %binding.session_id,
                token = %rejected.token(),
                "Session id already registered, registration ignored"
            );
            return;
        }

        self.directory
            .add_session(&binding.room_id, &binding.session_id, &binding.identity);
        metrics::record_registration(self.active_sessions());
        info!(
            room = %binding.room_id,
            session = %binding.session_id,
            identity = %binding.identity,
            "Session joined room"
        );

        let notice = Message::notification(
            binding.room_id.clone(),
            format!("{} se pridružio sobi.", binding.identity),
        );
        self.broadcast(notice).await;
    }

    async fn unregister(&mut self, binding: &SessionBinding, token: SessionToken) {
        let removed = self
            .rooms
            .get_mut(&binding.room_id)
            .and_then(|room| room.remove(&binding.session_id, token));

        let Some(session) = removed else {
            debug!(
                room = %binding.room_id,
                session = %binding.session_id,
                "Session not registered, nothing to remove"
            );
            return;
        };

        self.directory
            .remove_session(&binding.room_id, &binding.session_id);
        metrics::set_active_sessions(self.active_sessions());
        info!(
            room = %binding.room_id,
            session = %binding.session_id,
            identity = %binding.identity,
            "Session left room"
        );

        let notice = Message::notification(
            binding.room_id.clone(),
            format!("{} je napustio sobu.", binding.identity),
        );
        self.broadcast(notice).await;

        // Closes the outbound queue; the write loop drains and exits
        drop(session);
    }

    async fn broadcast(&self, message: Message) {
        let Some(room) = self.rooms.get(&message.room_id) else {
            warn!(
                room = %message.room_id,
                sender = %message.sender,
                "Broadcast to unknown room dropped"
            );
            metrics::record_drop(DropReason::UnknownRoom);
            return;
        };

        metrics::record_message(message.kind);
        debug!(
            room = %message.room_id,
            kind = %message.kind,
            sender = %message.sender,
            members = room.len(),
            "Broadcast"
        );

        let delivered = if message.kind == MessageKind::Signal {
            self.deliver_signal(room, &message).await
        } else {
            self.fan_out(room, Arc::new(message)).await
        };
        metrics::record_deliveries(delivered);
    }

    /// Enqueue onto every member's outbound queue, the sender's included.
    async fn fan_out(&self, room: &Room, message: Arc<Message>) -> usize {
        let mut delivered = 0;

        for session in room.members() {
            let target = &session.binding().session_id;
            match session
                .queue()
                .send_timeout(Arc::clone(&message), self.config.enqueue_timeout)
                .await
            {
                Ok(()) => {
                    trace!(room = %room.id(), session = %target, "Enqueued");
                    delivered += 1;
                }
                Err(SendTimeoutError::Timeout(_)) => {
                    warn!(
                        room = %room.id(),
                        session = %target,
                        timeout_ms = self.config.enqueue_timeout.as_millis() as u64,
                        "Outbound queue full, message dropped for session"
                    );
                    metrics::record_drop(DropReason::QueueFull);
                }
                Err(SendTimeoutError::Closed(_)) => {
                    debug!(room = %room.id(), session = %target, "Outbound queue closed, skipping");
                    metrics::record_drop(DropReason::QueueClosed);
                }
            }
        }

        delivered
    }

    /// Write a signal straight to every member's transport except the
    /// sender's own sessions.
    async fn deliver_signal(&self, room: &Room, message: &Message) -> usize {
        let text = match codec::encode_signal(&message.to_signal_frame()) {
            Ok(text) => text,
            Err(e) => {
                error!(
                    room = %room.id(),
                    sender = %message.sender,
                    error = %e,
                    "Failed to encode signal"
                );
                metrics::record_drop(DropReason::Encode);
                return 0;
            }
        };

        let mut delivered = 0;
        for session in room
            .members()
            .filter(|s| s.binding().identity != message.sender)
        {
            let target = &session.binding().session_id;
            let write = session.writer().send(text.clone());
            match tokio::time::timeout(self.config.enqueue_timeout, write).await {
                Ok(Ok(())) => {
                    trace!(room = %room.id(), session = %target, "Signal written");
                    delivered += 1;
                }
                Ok(Err(e)) => {
                    warn!(room = %room.id(), session = %target, error = %e, "Signal write failed");
                    metrics::record_drop(DropReason::SignalWrite);
                }
                Err(_) => {
                    warn!(room = %room.id(), session = %target, "Signal write timed out");
                    metrics::record_drop(DropReason::SignalWrite);
                }
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_transport::memory::{self, MemoryPeer};
    use serde_json::value::RawValue;

    type Queue = mpsc::Receiver<Arc<Message>>;

    fn session(id: &str, room: &str, identity: &str) -> (Session, Queue, MemoryPeer) {
        let (peer, _reader, writer) = memory::pair(8);
        let (session, rx) = Session::new(SessionBinding::new(id, room, identity), writer, 10);
        (session, rx, peer)
    }

    #[tokio::test]
    async fn test_create_room_rejects_invalid_id() {
        let hub = Hub::spawn(HubConfig::default());
        assert!(matches!(
            hub.create_room("", "Nameless").await,
            Err(HubError::InvalidRoomId(_))
        ));
        assert!(hub.list_rooms().is_empty());
    }

    #[tokio::test]
    async fn test_register_announces_join() {
        let hub = Hub::spawn(HubConfig::default());
        hub.create_room("r1", "Lobby").await.unwrap();

        let (s1, mut rx1, _peer) = session("s1", "r1", "alice");
        hub.register(s1).await.unwrap();

        let notice = rx1.recv().await.unwrap();
        assert_eq!(notice.kind, MessageKind::Notification);
        assert_eq!(notice.content, "alice se pridružio sobi.");
        assert_eq!(notice.room_id, "r1");
        assert_eq!(
            hub.list_sessions("r1"),
            vec![SessionInfo {
                id: "s1".into(),
                username: "alice".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_signal_skips_sender() {
        let hub = Hub::spawn(HubConfig::default());
        hub.create_room("r1", "Lobby").await.unwrap();

        let (alice, mut alice_rx, mut alice_peer) = session("s1", "r1", "alice");
        let (bob, mut bob_rx, mut bob_peer) = session("s2", "r1", "bob");
        hub.register(alice).await.unwrap();
        hub.register(bob).await.unwrap();

        let offer = RawValue::from_string(r#"{"sdp":"offer"}"#.to_string()).unwrap();
        hub.broadcast(Message::signal("r1", "alice", offer))
            .await
            .unwrap();

        let text = bob_peer.recv().await.unwrap();
        let frame = codec::decode_signal(&text).unwrap();
        assert_eq!(frame.from, "alice");
        assert_eq!(frame.data.as_deref().map(RawValue::get), Some(r#"{"sdp":"offer"}"#));

        // Signals bypass the queues entirely
        hub.create_room("barrier", "").await.unwrap();
        assert!(alice_peer.try_recv().is_none());
        while let Ok(msg) = alice_rx.try_recv() {
            assert_eq!(msg.kind, MessageKind::Notification);
        }
        while let Ok(msg) = bob_rx.try_recv() {
            assert_eq!(msg.kind, MessageKind::Notification);
        }
    }

    #[tokio::test]
    async fn test_hub_stops_when_handles_dropped() {
        let (hub, handle) = Hub::new(HubConfig::default());
        let task = tokio::spawn(hub.run());
        drop(handle);
        task.await.unwrap();
    }
}
