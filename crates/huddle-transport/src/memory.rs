//! In-process transport.
//!
//! Connects a session to a [`MemoryPeer`] through bounded channels. Used by
//! tests and benchmarks to drive sessions without sockets; a peer that stops
//! reading makes `send` block exactly like a stalled socket would.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

use crate::traits::{FrameReader, FrameWriter, TransportError};

/// Create a connected transport.
///
/// `buffer` is the number of frames each direction holds before senders wait.
#[must_use]
pub fn pair(buffer: usize) -> (MemoryPeer, MemoryReader, Arc<MemoryWriter>) {
    let (to_server, from_peer) = mpsc::channel(buffer);
    let (to_peer, from_server) = mpsc::channel(buffer);
    let (closed_tx, closed_rx) = watch::channel(false);

    let peer = MemoryPeer {
        outbound: Some(to_server),
        inbound: from_server,
    };
    let reader = MemoryReader {
        inbound: from_peer,
        closed: closed_rx,
    };
    let writer = Arc::new(MemoryWriter {
        outbound: Mutex::new(Some(to_peer)),
        closed: closed_tx,
        is_open: AtomicBool::new(true),
    });

    (peer, reader, writer)
}

/// The client end of a memory transport.
#[derive(Debug)]
pub struct MemoryPeer {
    outbound: Option<mpsc::Sender<String>>,
    inbound: mpsc::Receiver<String>,
}

impl MemoryPeer {
    /// Send a frame to the server side.
    ///
    /// # Errors
    ///
    /// Returns an error once either side has closed.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), TransportError> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or(TransportError::ConnectionClosed)?;
        outbound
            .send(text.into())
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Receive the next frame written by the server side.
    ///
    /// Returns `None` once the server closed and all frames were drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Take a frame if one is already waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.inbound.try_recv().ok()
    }

    /// Close the client side, ending the server's reader.
    pub fn close(&mut self) {
        self.outbound = None;
    }
}

/// Server side inbound half.
#[derive(Debug)]
pub struct MemoryReader {
    inbound: mpsc::Receiver<String>,
    closed: watch::Receiver<bool>,
}

#[async_trait]
impl FrameReader for MemoryReader {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        if *self.closed.borrow() {
            return Ok(None);
        }

        tokio::select! {
            frame = self.inbound.recv() => Ok(frame),
            _ = self.closed.changed() => Ok(None),
        }
    }
}

/// Server side outbound half.
#[derive(Debug)]
pub struct MemoryWriter {
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    closed: watch::Sender<bool>,
    is_open: AtomicBool,
}

#[async_trait]
impl FrameWriter for MemoryWriter {
    async fn send(&self, text: String) -> Result<(), TransportError> {
        let outbound = self
            .outbound
            .lock()
            .await
            .clone()
            .ok_or(TransportError::ConnectionClosed)?;

        outbound
            .send(text)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        if !self.is_open.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        self.outbound.lock().await.take();
        self.closed.send_replace(true);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_open.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (mut peer, mut reader, writer) = pair(4);

        peer.send("hello").await.unwrap();
        assert_eq!(reader.recv().await.unwrap(), Some("hello".to_string()));

        writer.send("world".to_string()).await.unwrap();
        assert_eq!(peer.recv().await, Some("world".to_string()));
    }

    #[tokio::test]
    async fn test_peer_close_ends_reader() {
        let (mut peer, mut reader, _writer) = pair(4);

        peer.send("last").await.unwrap();
        peer.close();

        assert_eq!(reader.recv().await.unwrap(), Some("last".to_string()));
        assert_eq!(reader.recv().await.unwrap(), None);
        assert!(peer.send("more").await.is_err());
    }

    #[tokio::test]
    async fn test_writer_close_is_single_shot() {
        let (mut peer, mut reader, writer) = pair(4);

        assert!(writer.is_open());
        writer.close().await.unwrap();
        writer.close().await.unwrap();
        assert!(!writer.is_open());

        assert_eq!(reader.recv().await.unwrap(), None);
        assert_eq!(peer.recv().await, None);
        assert!(matches!(
            writer.send("late".to_string()).await,
            Err(TransportError::ConnectionClosed)
        ));
    }
}
