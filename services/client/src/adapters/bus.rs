//! services/client/src/adapters/bus.rs
//!
//! The WebSocket message-bus adapter: the concrete implementation of the
//! `ChatBus` port. It owns the single bus connection for the process,
//! routes incoming room events to subscriber channels, and reconnects
//! with a bounded, linearly-backed-off retry when the connection drops.
//!
//! The connection object is constructed explicitly at the composition
//! root and handed to its consumers by reference; nothing here is global
//! state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use storefront_core::domain::{ChatMessage, MessageId};
use storefront_core::ports::{BusSubscription, ChatBus, PortError, PortResult};

use crate::protocol::{ClientFrame, ServerFrame};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Sink = futures::stream::SplitSink<Socket, WsMessage>;

//=========================================================================================
// Configuration and Shared State
//=========================================================================================

#[derive(Debug, Clone)]
pub struct WsBusConfig {
    pub url: String,
    /// Reconnect attempts before the bus stays down for good.
    pub max_reconnect_attempts: u32,
    /// Base delay of the linearly increasing reconnect backoff.
    pub base_delay: Duration,
}

struct BusShared {
    ready: AtomicBool,
    /// Room id -> live subscriber channel. Senders whose receivers were
    /// dropped are pruned lazily.
    routes: StdMutex<HashMap<Uuid, mpsc::Sender<ChatMessage>>>,
}

impl BusShared {
    fn route_for(&self, room_id: Uuid) -> Option<mpsc::Sender<ChatMessage>> {
        self.routes.lock().unwrap().get(&room_id).cloned()
    }

    fn live_rooms(&self) -> Vec<Uuid> {
        let mut routes = self.routes.lock().unwrap();
        routes.retain(|_, sender| !sender.is_closed());
        routes.keys().copied().collect()
    }
}

//=========================================================================================
// The Bus Handle
//=========================================================================================

/// A cheaply cloneable handle to the single bus connection. Dropping the
/// last handle closes the connection.
#[derive(Clone)]
pub struct WsBus {
    shared: Arc<BusShared>,
    commands: mpsc::Sender<ClientFrame>,
}

impl WsBus {
    /// Starts the connection task and returns the handle immediately;
    /// `is_ready` flips once the socket is up. The access token rides on
    /// the connection URL, as the backend expects.
    pub fn connect(config: WsBusConfig, access_token: Option<String>) -> Self {
        let shared = Arc::new(BusShared {
            ready: AtomicBool::new(false),
            routes: StdMutex::new(HashMap::new()),
        });
        let (commands, command_rx) = mpsc::channel(64);
        tokio::spawn(run_connection(config, access_token, shared.clone(), command_rx));
        Self { shared, commands }
    }

    async fn send_command(&self, frame: ClientFrame) -> PortResult<()> {
        self.commands
            .send(frame)
            .await
            .map_err(|_| PortError::Unavailable("bus connection task stopped".to_string()))
    }
}

#[async_trait]
impl ChatBus for WsBus {
    fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::SeqCst)
    }

    async fn subscribe(&self, room_id: Uuid) -> PortResult<BusSubscription> {
        if !self.is_ready() {
            return Err(PortError::Unavailable(
                "bus connection not established".to_string(),
            ));
        }
        let (sender, events) = mpsc::channel(32);
        self.shared.routes.lock().unwrap().insert(room_id, sender);
        self.send_command(ClientFrame::Subscribe { room_id }).await?;
        Ok(BusSubscription { room_id, events })
    }

    async fn publish_message(&self, message: &ChatMessage) -> PortResult<()> {
        if !self.is_ready() {
            return Err(PortError::Unavailable(
                "bus connection not established".to_string(),
            ));
        }
        let local_id = match message.id {
            MessageId::Pending { local_id } => local_id,
            MessageId::Confirmed { server_id } => server_id,
        };
        self.send_command(ClientFrame::Send {
            room_id: message.room_id,
            local_id,
            content: message.content.clone(),
            attachments: message.attachments.clone(),
        })
        .await
    }

    async fn publish_read_receipt(&self, room_id: Uuid, user_id: Uuid) -> PortResult<()> {
        if !self.is_ready() {
            return Err(PortError::Unavailable(
                "bus connection not established".to_string(),
            ));
        }
        self.send_command(ClientFrame::MarkRead { room_id, user_id })
            .await
    }
}

//=========================================================================================
// The Connection Task
//=========================================================================================

async fn run_connection(
    config: WsBusConfig,
    access_token: Option<String>,
    shared: Arc<BusShared>,
    mut commands: mpsc::Receiver<ClientFrame>,
) {
    let url = match &access_token {
        Some(token) => format!("{}?token={}", config.url, token),
        None => config.url.clone(),
    };

    let mut attempt: u32 = 0;
    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!("Bus connected to {}", config.url);
                attempt = 0;
                shared.ready.store(true, Ordering::SeqCst);
                let shutdown = drive(&shared, socket, &mut commands).await;
                shared.ready.store(false, Ordering::SeqCst);
                if shutdown {
                    return;
                }
                warn!("Bus connection lost");
            }
            Err(e) => warn!("Bus connect attempt failed: {e}"),
        }

        attempt += 1;
        if attempt > config.max_reconnect_attempts {
            // Best-effort connectivity: log and stay down, no user-facing
            // error. Dropping the routes closes every subscriber feed.
            error!(
                "Giving up on the bus after {} reconnect attempts",
                config.max_reconnect_attempts
            );
            shared.routes.lock().unwrap().clear();
            return;
        }
        tokio::time::sleep(config.base_delay * attempt).await;
    }
}

/// Drives one established socket until it fails or every handle is gone.
/// Returns true when the bus should shut down for good (handles dropped).
async fn drive(
    shared: &Arc<BusShared>,
    socket: Socket,
    commands: &mut mpsc::Receiver<ClientFrame>,
) -> bool {
    let (mut sink, mut stream) = socket.split();

    // Re-subscribe the rooms that survived the outage.
    for room_id in shared.live_rooms() {
        if send_frame(&mut sink, &ClientFrame::Subscribe { room_id })
            .await
            .is_err()
        {
            return false;
        }
    }

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => handle_text(shared, &mut sink, &text).await,
                Some(Ok(WsMessage::Close(_))) | None => return false,
                Some(Ok(_)) => {} // binary/ping/pong frames carry nothing for us
                Some(Err(e)) => {
                    warn!("Bus read failed: {e}");
                    return false;
                }
            },
            command = commands.recv() => match command {
                Some(frame) => {
                    if send_frame(&mut sink, &frame).await.is_err() {
                        return false;
                    }
                }
                None => {
                    // All handles dropped; close politely.
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return true;
                }
            },
        }
    }
}

async fn handle_text(shared: &Arc<BusShared>, sink: &mut Sink, text: &str) {
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(ServerFrame::ReadReceipt { room_id, .. }) => {
            debug!("Read receipt for room {room_id} (ignored)");
        }
        Ok(ServerFrame::Error { message }) => warn!("Bus reported an error: {message}"),
        Ok(frame) => {
            let Some(message) = frame.into_message() else {
                return;
            };
            let room_id = message.room_id;
            match shared.route_for(room_id) {
                Some(sender) => {
                    if sender.send(message).await.is_err() {
                        // Subscriber went away; release the topic.
                        shared.routes.lock().unwrap().remove(&room_id);
                        let _ = send_frame(sink, &ClientFrame::Unsubscribe { room_id }).await;
                    }
                }
                None => debug!("No subscriber for room {room_id}"),
            }
        }
        Err(e) => warn!("Failed to deserialize bus frame: {e}"),
    }
}

async fn send_frame(sink: &mut Sink, frame: &ClientFrame) -> Result<(), ()> {
    let text = match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to serialize bus frame: {e}");
            return Ok(()); // nothing to send, connection is still fine
        }
    };
    sink.send(WsMessage::Text(text)).await.map_err(|e| {
        warn!("Bus write failed: {e}");
    })
}
