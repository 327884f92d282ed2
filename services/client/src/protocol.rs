//! services/client/src/protocol.rs
//!
//! Defines the message-bus wire protocol between this client and the
//! chat backend. One logical topic exists per chat room; all frames are
//! JSON text messages over the single WebSocket connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::domain::{ChatMessage, MessageId, SenderRole};
use uuid::Uuid;

//=========================================================================================
// Frames Sent FROM the Client TO the Bus
//=========================================================================================

/// Represents the structured frames this client can send to the bus.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Opens the room's topic. Events for the room start flowing after
    /// the backend acknowledges by simply delivering them.
    Subscribe { room_id: Uuid },

    /// Releases the room's topic.
    Unsubscribe { room_id: Uuid },

    /// A send request. `local_id` is echoed back so the sender could
    /// correlate, though reconciliation matches on content and sender.
    Send {
        room_id: Uuid,
        local_id: Uuid,
        content: String,
        attachments: Vec<String>,
    },

    /// A read receipt for every message in the room, as of now.
    MarkRead { room_id: Uuid, user_id: Uuid },
}

//=========================================================================================
// Frames Sent FROM the Bus TO the Client
//=========================================================================================

/// Represents the structured frames the bus can deliver to this client.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A message in one of the subscribed rooms: either this user's own
    /// echoed send (now bearing its server id) or a counterpart's
    /// message.
    Message {
        id: Uuid,
        room_id: Uuid,
        sender_id: Uuid,
        sender_role: SenderRole,
        content: String,
        #[serde(default)]
        attachments: Vec<String>,
        #[serde(default)]
        read: bool,
        created_at: DateTime<Utc>,
    },

    /// A counterpart read the room. Read counts are out of scope for the
    /// session store; the frame is tolerated and dropped.
    ReadReceipt { room_id: Uuid, user_id: Uuid },

    /// A backend-reported failure. Logged, never surfaced as an error
    /// page.
    Error { message: String },
}

impl ServerFrame {
    /// Converts a `Message` frame into the domain type; other frames
    /// yield `None`.
    pub fn into_message(self) -> Option<ChatMessage> {
        match self {
            ServerFrame::Message {
                id,
                room_id,
                sender_id,
                sender_role,
                content,
                attachments,
                read,
                created_at,
            } => Some(ChatMessage {
                id: MessageId::Confirmed { server_id: id },
                room_id,
                sender_id,
                sender_role,
                content,
                attachments,
                read,
                created_at,
            }),
            _ => None,
        }
    }
}
