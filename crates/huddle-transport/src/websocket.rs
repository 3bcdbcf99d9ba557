//! WebSocket transport implementation.
//!
//! Wraps an upgraded axum [`WebSocket`] and splits it into a reader owned by
//! the session's read loop and a shareable writer.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::traits::{FrameReader, FrameWriter, TransportError};

/// Split an upgraded socket into its reader and writer halves.
#[must_use]
pub fn split(
    socket: WebSocket,
    max_message_size: usize,
) -> (WebSocketReader, Arc<WebSocketWriter>) {
    let (sink, stream) = socket.split();
    let reader = WebSocketReader {
        stream,
        max_message_size,
    };
    let writer = Arc::new(WebSocketWriter {
        sink: Mutex::new(sink),
        is_open: AtomicBool::new(true),
    });
    (reader, writer)
}

/// Inbound half of a WebSocket connection.
pub struct WebSocketReader {
    stream: SplitStream<WebSocket>,
    max_message_size: usize,
}

impl WebSocketReader {
    fn check_size(&self, size: usize) -> Result<(), TransportError> {
        if size > self.max_message_size {
            warn!(
                "Message too large: {} bytes (max: {})",
                size, self.max_message_size
            );
            return Err(TransportError::FrameTooLarge {
                size,
                limit: self.max_message_size,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FrameReader for WebSocketReader {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    self.check_size(text.len())?;
                    return Ok(Some(text));
                }
                Some(Ok(Message::Binary(data))) => {
                    // Binary frames carry the same JSON documents
                    self.check_size(data.len())?;
                    return Ok(Some(String::from_utf8_lossy(&data).into_owned()));
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // axum answers pings itself
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Received close frame");
                    return Ok(None);
                }
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    debug!("WebSocket stream ended");
                    return Ok(None);
                }
            }
        }
    }
}

/// Outbound half of a WebSocket connection.
pub struct WebSocketWriter {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    is_open: AtomicBool,
}

#[async_trait]
impl FrameWriter for WebSocketWriter {
    async fn send(&self, text: String) -> Result<(), TransportError> {
        if !self.is_open.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }

        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        if !self.is_open.swap(false, Ordering::SeqCst) {
            return Ok(()); // Already closed
        }

        let mut sink = self.sink.lock().await;
        sink.close()
            .await
            .map_err(|e| TransportError::SendFailed(format!("Failed to close: {}", e)))
    }

    fn is_open(&self) -> bool {
        self.is_open.load(Ordering::SeqCst)
    }
}
