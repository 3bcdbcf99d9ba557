//! End-to-end tests over real WebSocket connections.

use futures_util::{SinkExt, StreamExt};
use huddle_core::{Hub, HubConfig, HubHandle};
use huddle_protocol::{codec, MessageFrame, MessageKind};
use huddle_server::{build_router, AppState, Config};
use serde_json::value::RawValue;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (SocketAddr, HubHandle) {
    let hub = Hub::spawn(HubConfig::default());
    let state = Arc::new(AppState::new(Config::default(), hub.clone()));
    let app = build_router(state).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, hub)
}

async fn connect(addr: SocketAddr, room: &str, id: &str, username: &str) -> Client {
    let url = format!(
        "ws://{}/websocket/joinRoom/{}?userID={}&username={}",
        addr, room, id, username
    );
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

/// Next text frame, or `None` once the server closed.
async fn next_text(ws: &mut Client) -> Option<String> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame");
        match msg {
            Some(Ok(Message::Text(text))) => return Some(text),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

async fn expect_content(ws: &mut Client, content: &str) -> MessageFrame {
    loop {
        let text = next_text(ws).await.expect("connection closed");
        if let Ok(frame) = codec::decode_message(&text) {
            if frame.content == content {
                return frame;
            }
        }
    }
}

#[tokio::test]
async fn test_room_conversation() {
    let (addr, hub) = start_server().await;
    hub.create_room("r1", "Lobby").await.unwrap();

    let mut alice = connect(addr, "r1", "s1", "alice").await;
    expect_content(&mut alice, "alice se pridružio sobi.").await;

    let mut bob = connect(addr, "r1", "s2", "bob").await;
    expect_content(&mut alice, "bob se pridružio sobi.").await;
    expect_content(&mut bob, "bob se pridružio sobi.").await;

    let mut sessions = hub.list_sessions("r1");
    sessions.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].username, "alice");

    // Chat echoes to everyone, sender included
    alice
        .send(Message::Text(r#"{"content":"hi"}"#.to_string()))
        .await
        .unwrap();
    for ws in [&mut alice, &mut bob] {
        let frame = expect_content(ws, "hi").await;
        assert_eq!(frame.kind, MessageKind::Chat);
        assert_eq!(frame.username, "alice");
        assert_eq!(frame.room_id, "r1");
    }

    // Signals skip the sender
    bob.send(Message::Text(
        r#"{"type":"signal","data":{"sdp":"offer","n":1e400},"roomId":"r1","username":"bob"}"#
            .to_string(),
    ))
    .await
    .unwrap();
    let text = next_text(&mut alice).await.unwrap();
    let signal = codec::decode_signal(&text).unwrap();
    assert_eq!(signal.from, "bob");
    assert_eq!(
        signal.data.as_deref().map(RawValue::get),
        Some(r#"{"sdp":"offer","n":1e400}"#)
    );

    // Leaving is announced to whoever remains
    bob.close(None).await.unwrap();
    expect_content(&mut alice, "bob je napustio sobu.").await;
    assert_eq!(hub.list_sessions("r1").len(), 1);
}

#[tokio::test]
async fn test_join_unknown_room_is_disconnected() {
    let (addr, hub) = start_server().await;

    let mut ws = connect(addr, "ghost", "s1", "alice").await;
    assert_eq!(next_text(&mut ws).await, None);
    assert!(hub.list_sessions("ghost").is_empty());
}

#[tokio::test]
async fn test_oversized_frame_is_dropped_without_disconnect() {
    let (addr, hub) = start_server().await;
    hub.create_room("r1", "Lobby").await.unwrap();

    let mut alice = connect(addr, "r1", "s1", "alice").await;
    expect_content(&mut alice, "alice se pridružio sobi.").await;

    // Over the 64 KiB session limit but under the protocol ceiling
    let big = MessageFrame::chat("r1", "alice", "x".repeat(100 * 1024));
    let text = codec::encode_message(&big).unwrap();
    alice.send(Message::Text(text)).await.unwrap();

    alice
        .send(Message::Text(r#"{"content":"still here"}"#.to_string()))
        .await
        .unwrap();
    let frame = expect_content(&mut alice, "still here").await;
    assert_eq!(frame.username, "alice");
    assert_eq!(hub.list_sessions("r1").len(), 1);
}
