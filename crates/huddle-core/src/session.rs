//! Connection sessions.
//!
//! A session pumps one client connection with two tasks:
//!
//! - the **read loop** decodes inbound frames and hands them to the hub, and
//!   deregisters the session when the transport ends;
//! - the **write loop** drains the session's outbound queue onto the transport
//!   and stops once the hub drops the queue's sender.
//!
//! Whichever loop finishes first closes the transport; the writer's close is
//! single-shot, so the second close is a no-op.

use huddle_protocol::codec;
use huddle_transport::{FrameReader, FrameWriter, TransportError};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::hub::{HubError, HubHandle};
use crate::message::Message;
use crate::metrics;

/// Default outbound queue capacity per session.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

static TOKEN_COUNTER: AtomicU64 = AtomicU64::new(1);

/// The room and identity a connection was opened with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionBinding {
    /// Caller chosen session id, unique within a room.
    pub session_id: String,
    /// Room the session belongs to.
    pub room_id: String,
    /// Identity messages from this session are attributed to.
    pub identity: String,
}

impl SessionBinding {
    /// Create a new binding.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        room_id: impl Into<String>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            room_id: room_id.into(),
            identity: identity.into(),
        }
    }
}

/// Process-unique tag for one connection.
///
/// Two connections may claim the same session id; the token tells them apart
/// so one cannot deregister the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Generate a fresh token.
    #[must_use]
    pub fn generate() -> Self {
        Self(TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tok_{}", self.0)
    }
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Outbound queue capacity.
    pub queue_capacity: usize,
    /// End the session when nothing is received for this long.
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            idle_timeout: None,
        }
    }
}

/// The hub's view of a session.
///
/// Holds the sending half of the outbound queue; dropping the `Session`
/// closes the queue and lets the write loop finish.
pub struct Session {
    binding: SessionBinding,
    token: SessionToken,
    queue: mpsc::Sender<Arc<Message>>,
    writer: Arc<dyn FrameWriter>,
}

impl Session {
    /// Create a session and the receiving half of its outbound queue.
    #[must_use]
    pub fn new(
        binding: SessionBinding,
        writer: Arc<dyn FrameWriter>,
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<Arc<Message>>) {
        let (queue, rx) = mpsc::channel(queue_capacity.max(1));
        let session = Self {
            binding,
            token: SessionToken::generate(),
            queue,
            writer,
        };
        (session, rx)
    }

    /// Get the binding.
    #[must_use]
    pub fn binding(&self) -> &SessionBinding {
        &self.binding
    }

    /// Get the connection token.
    #[must_use]
    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub(crate) fn queue(&self) -> &mpsc::Sender<Arc<Message>> {
        &self.queue
    }

    pub(crate) fn writer(&self) -> &Arc<dyn FrameWriter> {
        &self.writer
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("binding", &self.binding)
            .field("token", &self.token)
            .field("queue_capacity", &self.queue.max_capacity())
            .finish_non_exhaustive()
    }
}

/// Handle to a running session's tasks.
#[derive(Debug)]
pub struct SessionHandle {
    binding: SessionBinding,
    token: SessionToken,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl SessionHandle {
    /// Get the binding.
    #[must_use]
    pub fn binding(&self) -> &SessionBinding {
        &self.binding
    }

    /// Get the connection token.
    #[must_use]
    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// Wait for both loops to finish.
    pub async fn closed(self) {
        for (task, result) in [("read", self.read_task.await), ("write", self.write_task.await)] {
            if let Err(e) = result {
                error!(session = %self.binding.session_id, task, error = %e, "Session task failed");
            }
        }
    }
}

/// Bind a connection to a room and start pumping it.
///
/// Submits the registration to the hub, then spawns the read and write loops.
/// Whether the room exists is decided by the hub; a registration it rejects
/// ends the session once the write loop sees its queue closed.
///
/// # Errors
///
/// Returns [`HubError::Closed`] if the hub is no longer running, after
/// closing the transport.
pub async fn join<R>(
    hub: &HubHandle,
    binding: SessionBinding,
    reader: R,
    writer: Arc<dyn FrameWriter>,
    config: &SessionConfig,
) -> Result<SessionHandle, HubError>
where
    R: FrameReader + 'static,
{
    let (session, queue) =
        Session::new(binding.clone(), Arc::clone(&writer), config.queue_capacity);
    let token = session.token();

    if let Err(e) = hub.register(session).await {
        let _ = writer.close().await;
        return Err(e);
    }

    debug!(
        session = %binding.session_id,
        room = %binding.room_id,
        identity = %binding.identity,
        %token,
        "Session started"
    );

    let write_task = tokio::spawn(write_loop(
        binding.clone(),
        queue,
        Arc::clone(&writer),
    ));
    let read_task = tokio::spawn(read_loop(
        hub.clone(),
        binding.clone(),
        token,
        reader,
        writer,
        config.idle_timeout,
    ));

    Ok(SessionHandle {
        binding,
        token,
        read_task,
        write_task,
    })
}

async fn write_loop(
    binding: SessionBinding,
    mut queue: mpsc::Receiver<Arc<Message>>,
    writer: Arc<dyn FrameWriter>,
) {
    while let Some(message) = queue.recv().await {
        let text = match codec::encode_message(&message.to_frame()) {
            Ok(text) => text,
            Err(e) => {
                error!(session = %binding.session_id, error = %e, "Failed to encode message");
                metrics::record_drop(metrics::DropReason::Encode);
                continue;
            }
        };

        trace!(
            session = %binding.session_id,
            kind = %message.kind,
            "Writing message"
        );

        if let Err(e) = writer.send(text).await {
            debug!(session = %binding.session_id, error = %e, "Write failed");
            break;
        }
    }

    if let Err(e) = writer.close().await {
        debug!(session = %binding.session_id, error = %e, "Close failed");
    }
    debug!(session = %binding.session_id, "Write loop stopped");
}

async fn read_loop<R: FrameReader>(
    hub: HubHandle,
    binding: SessionBinding,
    token: SessionToken,
    mut reader: R,
    writer: Arc<dyn FrameWriter>,
    idle_timeout: Option<Duration>,
) {
    loop {
        let received = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, reader.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    info!(session = %binding.session_id, "Session idle, disconnecting");
                    break;
                }
            },
            None => reader.recv().await,
        };

        match received {
            Ok(Some(text)) => {
                trace!(session = %binding.session_id, frame = %text, "Received frame");

                let frame = match codec::decode_message(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(
                            session = %binding.session_id,
                            error = %e,
                            "Discarding malformed frame"
                        );
                        metrics::record_decode_error();
                        continue;
                    }
                };

                let message = Message::from_frame(frame, &binding);
                if hub.broadcast(message).await.is_err() {
                    warn!(session = %binding.session_id, "Hub stopped, ending session");
                    break;
                }
            }
            Ok(None) => {
                debug!(session = %binding.session_id, "Connection closed by peer");
                break;
            }
            Err(TransportError::FrameTooLarge { size, limit }) => {
                warn!(session = %binding.session_id, size, limit, "Discarding oversized frame");
                metrics::record_decode_error();
            }
            Err(e) => {
                warn!(session = %binding.session_id, error = %e, "Read failed");
                break;
            }
        }
    }

    if hub.unregister(binding.clone(), token).await.is_err() {
        debug!(session = %binding.session_id, "Hub stopped before deregistration");
    }
    if let Err(e) = writer.close().await {
        debug!(session = %binding.session_id, error = %e, "Close failed");
    }
    debug!(session = %binding.session_id, "Read loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("tok_"));
    }

    #[test]
    fn test_session_queue_capacity() {
        let (_peer, _reader, writer) = huddle_transport::memory::pair(1);
        let (session, _rx) = Session::new(SessionBinding::new("s1", "r1", "alice"), writer, 0);
        assert_eq!(session.queue().max_capacity(), 1);
    }
}
