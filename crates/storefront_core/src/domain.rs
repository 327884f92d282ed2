//! crates/storefront_core/src/domain.rs
//!
//! Defines the pure, core data structures for the storefront client.
//! These structs are independent of any transport or wire format; the
//! adapters in the `client` service map backend payloads into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Catalog
//=========================================================================================

/// A product as presented on a detail page. Prices are minor currency
/// units (e.g. cents); `price` and `stock` are the base values used when
/// the product carries no variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub stock: i32,
    pub has_variants: bool,
    pub variants: Vec<Variant>,
}

/// One attribute of a variant, e.g. `color = red`.
///
/// Kept as a pair rather than a map entry so the order attributes appear
/// in on the wire is preserved; option groups are presented in first-seen
/// order, which a `HashMap` would scramble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub key: String,
    pub value: String,
}

impl AttributeValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A concrete purchasable combination of attribute values.
///
/// Within one product no two variants should share an identical attribute
/// mapping; the backend owns that invariant and the resolver degrades to
/// "no unique match" when it is violated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub attributes: Vec<AttributeValue>,
    pub price: i64,
    pub stock: i32,
    pub available: bool,
}

impl Variant {
    /// Looks up this variant's value for an attribute key, if present.
    pub fn value_for(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// The user's partial attribute selection on a product detail view.
///
/// Lives only for the duration of the view; never persisted. Entries are
/// inserted either explicitly (`choose`, which overwrites) or as a
/// convenience default (`fill_default`, which never overwrites), so
/// auto-population can never clobber an explicit user choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    choices: Vec<(String, String)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an explicit user choice, replacing any previous value for
    /// the key.
    pub fn choose(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.choices.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.choices.push((key, value));
        }
    }

    /// Inserts a value only if the key has no choice yet. Idempotent.
    pub fn fill_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.value_for(&key).is_none() {
            self.choices.push((key, value.into()));
        }
    }

    /// Removes the choice for a key, if any.
    pub fn clear(&mut self, key: &str) {
        self.choices.retain(|(k, _)| k != key);
    }

    pub fn value_for(&self, key: &str) -> Option<&str> {
        self.choices
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Iterates over the chosen `(key, value)` pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.choices.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

//=========================================================================================
// Chat
//=========================================================================================

/// Which side of the conversation a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Buyer,
    Seller,
}

/// The identity the chat session acts as. Sellers carry the shop they
/// operate, which decides which room-listing endpoint is used.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub role: SenderRole,
    pub shop_id: Option<Uuid>,
}

impl UserIdentity {
    pub fn buyer(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: SenderRole::Buyer,
            shop_id: None,
        }
    }

    pub fn seller(user_id: Uuid, shop_id: Uuid) -> Self {
        Self {
            user_id,
            role: SenderRole::Seller,
            shop_id: Some(shop_id),
        }
    }
}

/// A buyer-seller conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub shop_id: Uuid,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Message identity as a tagged state rather than an id-prefix
/// convention: a locally synthesized placeholder is `Pending` until the
/// server's echo arrives bearing a `Confirmed` id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MessageId {
    Pending { local_id: Uuid },
    Confirmed { server_id: Uuid },
}

impl MessageId {
    pub fn is_pending(&self) -> bool {
        matches!(self, MessageId::Pending { .. })
    }
}

/// A single chat message. Append-only: no edits or deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: SenderRole,
    pub content: String,
    pub attachments: Vec<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Pagination
//=========================================================================================

/// One page of a paginated backend listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
}
