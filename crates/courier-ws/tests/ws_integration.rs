//! End-to-end tests over real WebSocket connections
//!
//! Boots a relay plus the WebSocket front end on an ephemeral port and
//! drives it with tokio-tungstenite clients, the same way a browser would.

use std::time::Duration;

use courier_core::{
    ClientFrame, MessageKind, RelayConfig, ServerFrame, SystemTimeSource, UserId,
};
use courier_relay::RelayService;
use courier_ws::WsServer;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> String {
    let (service, handle) = RelayService::new(RelayConfig::default(), SystemTimeSource);
    tokio::spawn(service.run());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(WsServer::new(handle).run(listener));

    format!("ws://{addr}")
}

async fn connect(url: &str, user: &str) -> Socket {
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    send(&mut socket, &ClientFrame::Hello {
        user: UserId::new(user),
    })
    .await;
    socket
}

async fn send(socket: &mut Socket, frame: &ClientFrame) {
    let text = serde_json::to_string(frame).unwrap();
    socket.send(WsMessage::Text(text)).await.unwrap();
}

async fn recv(socket: &mut Socket) -> ServerFrame {
    loop {
        let message = timeout(RECV_TIMEOUT, socket.next())
            .await
            .expect("expected a frame within the timeout")
            .expect("socket closed unexpectedly")
            .expect("socket error");
        if let WsMessage::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
        // skip pings
    }
}

#[tokio::test]
async fn message_travels_between_two_sockets() {
    let url = start_server().await;
    let mut alice = connect(&url, "alice").await;
    let mut bob = connect(&url, "bob").await;

    // alice sees bob come online
    match recv(&mut alice).await {
        ServerFrame::PresenceOnline { user } => assert_eq!(user, UserId::new("bob")),
        other => panic!("unexpected frame: {other:?}"),
    }

    send(&mut alice, &ClientFrame::SendMessage {
        to: UserId::new("bob"),
        kind: MessageKind::Text,
        payload: "over the wire".to_string(),
    })
    .await;

    match recv(&mut bob).await {
        ServerFrame::ReceiveMessage { message } => {
            assert_eq!(message.payload, "over the wire");
            assert!(message.delivered);
        }
        other => panic!("unexpected frame: {other:?}"),
    }
    match recv(&mut alice).await {
        ServerFrame::MessageSent { message } => assert!(message.delivered),
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[tokio::test]
async fn history_fetch_round_trips_over_the_socket() {
    let url = start_server().await;
    let mut alice = connect(&url, "alice").await;

    send(&mut alice, &ClientFrame::SendMessage {
        to: UserId::new("bob"),
        kind: MessageKind::File,
        payload: "attachment-ref-1".to_string(),
    })
    .await;
    match recv(&mut alice).await {
        ServerFrame::MessageSent { message } => assert!(!message.delivered),
        other => panic!("unexpected frame: {other:?}"),
    }

    let mut bob = connect(&url, "bob").await;
    send(&mut bob, &ClientFrame::FetchHistory {
        with: UserId::new("alice"),
    })
    .await;
    match recv(&mut bob).await {
        ServerFrame::History { with, messages } => {
            assert_eq!(with, UserId::new("alice"));
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].kind, MessageKind::File);
        }
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_json_gets_an_error_frame() {
    let url = start_server().await;
    let mut alice = connect(&url, "alice").await;

    alice
        .send(WsMessage::Text("this is not json".to_string()))
        .await
        .unwrap();

    match recv(&mut alice).await {
        ServerFrame::Error { reason } => assert!(reason.contains("malformed")),
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[tokio::test]
async fn socket_without_hello_is_rejected() {
    let url = start_server().await;
    let (mut socket, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

    send(&mut socket, &ClientFrame::FetchHistory {
        with: UserId::new("bob"),
    })
    .await;

    match recv(&mut socket).await {
        ServerFrame::Error { reason } => assert!(reason.contains("hello")),
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[tokio::test]
async fn reconnecting_closes_the_old_socket() {
    let url = start_server().await;
    let mut old_bob = connect(&url, "bob").await;
    let _new_bob = connect(&url, "bob").await;

    // The superseded session's outbound channel closes, which closes its
    // socket.
    let outcome = timeout(RECV_TIMEOUT, old_bob.next()).await.expect("old socket should close");
    match outcome {
        None | Some(Ok(WsMessage::Close(_))) | Some(Err(_)) => {}
        Some(Ok(other)) => panic!("unexpected frame on dead socket: {other:?}"),
    }
}
