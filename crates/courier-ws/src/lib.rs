//! WebSocket front end for the Courier relay
//!
//! Bridges browser WebSocket sessions to the relay task. Each accepted
//! socket must open with a `hello` frame carrying the authenticated
//! identity (issued by the auth layer, trusted opaquely); after that, text
//! frames are JSON [`ClientFrame`]s fed to the relay, and the session's
//! [`ServerFrame`]s are pumped back out by a writer task.

use std::net::SocketAddr;

use courier_core::{ClientFrame, ServerFrame, SessionId, UserId};
use courier_relay::RelayHandle;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// WebSocket listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Address the listener binds to.
    pub bind_addr: String,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9470".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Server
// ----------------------------------------------------------------------------

/// Accept loop bridging WebSocket sessions to the relay.
pub struct WsServer {
    relay: RelayHandle,
}

impl WsServer {
    pub fn new(relay: RelayHandle) -> Self {
        Self { relay }
    }

    /// Serve connections on an already-bound listener until it fails.
    pub async fn run(self, listener: TcpListener) -> std::io::Result<()> {
        let local = listener.local_addr()?;
        info!("WebSocket listener on {local}");

        loop {
            let (stream, peer) = listener.accept().await?;
            let relay = self.relay.clone();
            tokio::spawn(async move {
                handle_connection(relay, stream, peer).await;
            });
        }
    }
}

// ----------------------------------------------------------------------------
// Per-Connection Bridge
// ----------------------------------------------------------------------------

async fn handle_connection(relay: RelayHandle, stream: TcpStream, peer: SocketAddr) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!("WebSocket handshake with {peer} failed: {err}");
            return;
        }
    };
    let (mut sink, mut source) = ws.split();

    // The first frame must be the hello; everything before registration is
    // answered on the socket directly.
    let user = match read_hello(&mut source).await {
        Ok(user) => user,
        Err(reason) => {
            debug!("Rejecting {peer}: {reason}");
            let error = ServerFrame::Error {
                reason: reason.to_string(),
            };
            if let Ok(text) = serde_json::to_string(&error) {
                let _ = sink.send(WsMessage::Text(text)).await;
            }
            let _ = sink.close().await;
            return;
        }
    };

    let (session, mut frames) = match relay.connect(user.clone()).await {
        Ok(connected) => connected,
        Err(err) => {
            warn!("Relay refused session for {user}: {err}");
            return;
        }
    };
    info!("Session {session} opened for {user} from {peer}");

    // Frames the bridge itself produces (parse rejections) merge into the
    // same outbound pump as relay frames.
    let (local_sender, mut local_frames) = mpsc::channel::<ServerFrame>(8);

    let mut writer = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                frame = frames.recv() => frame,
                frame = local_frames.recv() => frame,
            };
            // A closed frame channel means the session was superseded or
            // the relay stopped; either way the socket is done.
            let Some(frame) = frame else { break };
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(err) => {
                    warn!("Failed to encode frame: {err}");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let reader = read_frames(&relay, &user, session, &mut source, &local_sender);
    tokio::select! {
        _ = &mut writer => {}
        _ = reader => {
            writer.abort();
        }
    }

    let _ = relay.disconnect(user.clone(), session).await;
    info!("Session {session} closed for {user}");
}

type WsSource = futures::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<TcpStream>,
>;

/// Read frames off the socket and feed them to the relay until it closes.
async fn read_frames(
    relay: &RelayHandle,
    user: &UserId,
    session: SessionId,
    source: &mut WsSource,
    local_sender: &mpsc::Sender<ServerFrame>,
) {
    while let Some(message) = source.next().await {
        let text = match message {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) | Err(_) => break,
            // Pings are answered by tungstenite; binary frames are not part
            // of the protocol.
            Ok(_) => continue,
        };

        match serde_json::from_str::<ClientFrame>(&text) {
            Ok(frame) => {
                if relay.frame(user.clone(), session, frame).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                debug!("Malformed frame from {user}: {err}");
                let _ = local_sender
                    .send(ServerFrame::Error {
                        reason: format!("malformed frame: {err}"),
                    })
                    .await;
            }
        }
    }
}

/// Wait for the opening `hello` frame and extract the identity.
async fn read_hello(source: &mut WsSource) -> Result<UserId, &'static str> {
    let message = match source.next().await {
        Some(Ok(message)) => message,
        _ => return Err("socket closed before hello"),
    };

    let text = match message {
        WsMessage::Text(text) => text,
        _ => return Err("expected a text hello frame"),
    };

    match serde_json::from_str::<ClientFrame>(&text) {
        Ok(ClientFrame::Hello { user }) => Ok(user),
        Ok(_) => Err("first frame must be hello"),
        Err(_) => Err("malformed hello frame"),
    }
}
