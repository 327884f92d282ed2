//! services/client/src/adapters/rest.rs
//!
//! This module contains the HTTP backend adapter, the concrete
//! implementation of the `CatalogService` and `ChatService` ports from
//! the `storefront_core` crate. It talks JSON over HTTPS to the remote
//! backend using `reqwest`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use storefront_core::domain::{
    AttributeValue, ChatMessage, ChatRoom, MessageId, Page, Product, SenderRole, Variant,
};
use storefront_core::ports::{CatalogService, ChatService, PortError, PortResult};
use uuid::Uuid;

use crate::auth::AuthClient;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An HTTP adapter that implements the backend-facing ports.
///
/// Every request carries the current bearer token. A 401 response
/// triggers exactly one token-refresh attempt followed by a retry of the
/// original request; a second 401 (or a failed refresh, which clears the
/// stored credentials) surfaces as [`PortError::Unauthorized`].
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    auth: AuthClient,
}

impl HttpBackend {
    pub fn new(http: reqwest::Client, base_url: String, auth: AuthClient) -> Self {
        Self {
            http,
            base_url,
            auth,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth.tokens().access_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> PortResult<T> {
        let response = self
            .authorized(build())
            .await
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            self.auth.refresh().await?;
            self.authorized(build())
                .await
                .send()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?
        } else {
            response
        };

        match response.status() {
            StatusCode::NOT_FOUND => Err(PortError::NotFound(response.url().path().to_string())),
            StatusCode::UNAUTHORIZED => Err(PortError::Unauthorized),
            status if status.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string())),
            status => Err(PortError::Unexpected(format!(
                "backend returned {status} for {}",
                response.url().path()
            ))),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> PortResult<T> {
        let url = self.url(path);
        self.execute(|| self.http.get(&url)).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> PortResult<T> {
        let url = self.url(path);
        self.execute(|| self.http.post(&url).json(body)).await
    }
}

//=========================================================================================
// "Impure" Backend Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct PaginatedResponse<T> {
    data: Vec<T>,
    total: u64,
    page: u32,
}

#[derive(Deserialize)]
struct AttributeRecord {
    key: String,
    value: String,
}

#[derive(Deserialize)]
struct VariantRecord {
    id: Uuid,
    attributes: Vec<AttributeRecord>,
    price: i64,
    stock: i32,
    available: bool,
}

impl VariantRecord {
    fn to_domain(self) -> Variant {
        Variant {
            id: self.id,
            attributes: self
                .attributes
                .into_iter()
                .map(|a| AttributeValue::new(a.key, a.value))
                .collect(),
            price: self.price,
            stock: self.stock,
            available: self.available,
        }
    }
}

#[derive(Deserialize)]
struct ProductRecord {
    id: Uuid,
    name: String,
    price: i64,
    stock: i32,
    has_variants: bool,
    #[serde(default)]
    variants: Vec<VariantRecord>,
}

impl ProductRecord {
    fn to_domain(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            price: self.price,
            stock: self.stock,
            has_variants: self.has_variants,
            variants: self.variants.into_iter().map(|v| v.to_domain()).collect(),
        }
    }
}

#[derive(Deserialize)]
struct RoomRecord {
    id: Uuid,
    buyer_id: Uuid,
    shop_id: Uuid,
    order_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl RoomRecord {
    fn to_domain(self) -> ChatRoom {
        ChatRoom {
            id: self.id,
            buyer_id: self.buyer_id,
            shop_id: self.shop_id,
            order_id: self.order_id,
            created_at: self.created_at,
        }
    }
}

#[derive(Deserialize)]
struct MessageRecord {
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
}

impl MessageRecord {
    fn to_domain(self) -> ChatMessage {
        ChatMessage {
            id: MessageId::Confirmed { server_id: self.id },
            room_id: self.room_id,
            sender_id: self.sender_id,
            sender_role: self.sender_role,
            content: self.content,
            attachments: self.attachments,
            read: self.read,
            created_at: self.created_at,
        }
    }
}

#[derive(Serialize)]
struct EnsureRoomRequest {
    buyer_id: Uuid,
    shop_id: Uuid,
    order_id: Option<Uuid>,
}

//=========================================================================================
// Port Trait Implementations
//=========================================================================================

#[async_trait]
impl CatalogService for HttpBackend {
    async fn fetch_product(&self, product_id: Uuid) -> PortResult<Product> {
        let record: ProductRecord = self.get_json(&format!("/products/{product_id}")).await?;
        Ok(record.to_domain())
    }

    async fn list_products(&self, page: u32, per_page: u32) -> PortResult<Page<Product>> {
        let response: PaginatedResponse<ProductRecord> = self
            .get_json(&format!("/products?page={page}&per_page={per_page}"))
            .await?;
        Ok(Page {
            items: response.data.into_iter().map(|p| p.to_domain()).collect(),
            total: response.total,
            page: response.page,
        })
    }
}

#[async_trait]
impl ChatService for HttpBackend {
    async fn rooms_for_buyer(&self, user_id: Uuid) -> PortResult<Vec<ChatRoom>> {
        let records: Vec<RoomRecord> = self
            .get_json(&format!("/chat/rooms/buyer/{user_id}"))
            .await?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn rooms_for_shop(&self, shop_id: Uuid) -> PortResult<Vec<ChatRoom>> {
        let records: Vec<RoomRecord> =
            self.get_json(&format!("/chat/rooms/shop/{shop_id}")).await?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn message_history(
        &self,
        room_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> PortResult<Vec<ChatMessage>> {
        // The backend returns the page oldest message first; the session
        // store keeps that order.
        let records: Vec<MessageRecord> = self
            .get_json(&format!(
                "/chat/rooms/{room_id}/messages?page={page}&per_page={per_page}"
            ))
            .await?;
        Ok(records.into_iter().map(|m| m.to_domain()).collect())
    }

    async fn ensure_room(
        &self,
        buyer_id: Uuid,
        shop_id: Uuid,
        order_id: Option<Uuid>,
    ) -> PortResult<ChatRoom> {
        let record: RoomRecord = self
            .post_json(
                "/chat/rooms",
                &EnsureRoomRequest {
                    buyer_id,
                    shop_id,
                    order_id,
                },
            )
            .await?;
        Ok(record.to_domain())
    }
}
