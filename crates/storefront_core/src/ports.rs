//! crates/storefront_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the storefront core.
//! These traits form the boundary of the hexagonal architecture, allowing
//! the core to stay independent of the concrete backend transport (HTTP
//! client, WebSocket bus) that the `client` service provides.

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::{ChatMessage, ChatRoom, Page, Product};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services
/// (HTTP backend, message bus).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The underlying connection is not (yet) established. Callers that
    /// can wait are expected to retry; this is not a terminal failure.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetches one product with its full variant list.
    async fn fetch_product(&self, product_id: Uuid) -> PortResult<Product>;

    /// Fetches one page of the product listing.
    async fn list_products(&self, page: u32, per_page: u32) -> PortResult<Page<Product>>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Lists the rooms a buyer participates in.
    async fn rooms_for_buyer(&self, user_id: Uuid) -> PortResult<Vec<ChatRoom>>;

    /// Lists the rooms belonging to a seller's shop.
    async fn rooms_for_shop(&self, shop_id: Uuid) -> PortResult<Vec<ChatRoom>>;

    /// Fetches one page of a room's history, oldest message first.
    async fn message_history(
        &self,
        room_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> PortResult<Vec<ChatMessage>>;

    /// Returns the existing room for the pair, creating it if absent.
    async fn ensure_room(
        &self,
        buyer_id: Uuid,
        shop_id: Uuid,
        order_id: Option<Uuid>,
    ) -> PortResult<ChatRoom>;
}

/// A live subscription to one room's message feed. Dropping it releases
/// the route on the bus side.
pub struct BusSubscription {
    pub room_id: Uuid,
    pub events: mpsc::Receiver<ChatMessage>,
}

#[async_trait]
pub trait ChatBus: Send + Sync {
    /// Whether the underlying connection is currently established.
    fn is_ready(&self) -> bool;

    /// Opens a subscription for one room. Fails with
    /// [`PortError::Unavailable`] while the connection is down; the
    /// session store retries on an interval.
    async fn subscribe(&self, room_id: Uuid) -> PortResult<BusSubscription>;

    /// Publishes a send request for a message. Best-effort: the caller
    /// keeps its optimistic copy regardless of the outcome.
    async fn publish_message(&self, message: &ChatMessage) -> PortResult<()>;

    /// Publishes a read receipt for the user in a room. Fire-and-forget.
    async fn publish_read_receipt(&self, room_id: Uuid, user_id: Uuid) -> PortResult<()>;
}
