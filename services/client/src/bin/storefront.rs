//! services/client/src/bin/storefront.rs
//!
//! The composition root: builds the adapters, wires them into the chat
//! session store, and runs a minimal interactive chat loop on stdin.
//! Also demonstrates the variant resolver when a product id is supplied.

use client_lib::{
    adapters::{HttpBackend, WsBus, WsBusConfig},
    auth::{AuthClient, TokenStore},
    config::Config,
    error::ClientError,
};
use std::sync::Arc;
use storefront_core::{
    chat::{ChatSessionStore, ChatStoreConfig},
    domain::{SenderRole, UserIdentity},
    ports::{CatalogService, ChatBus, ChatService},
    variant,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

fn env_uuid(name: &str) -> Result<Option<Uuid>, ClientError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<Uuid>()
            .map(Some)
            .map_err(|e| ClientError::Internal(format!("{name} is not a valid uuid: {e}"))),
        Err(_) => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting storefront client...");

    // --- 2. Authenticate ---
    let email = std::env::var("STOREFRONT_EMAIL")
        .map_err(|_| ClientError::Internal("STOREFRONT_EMAIL is required".to_string()))?;
    let password = std::env::var("STOREFRONT_PASSWORD")
        .map_err(|_| ClientError::Internal("STOREFRONT_PASSWORD is required".to_string()))?;
    let user_id = env_uuid("STOREFRONT_USER_ID")?
        .ok_or_else(|| ClientError::Internal("STOREFRONT_USER_ID is required".to_string()))?;
    let identity = match env_uuid("STOREFRONT_SHOP_ID")? {
        Some(shop_id) => UserIdentity::seller(user_id, shop_id),
        None => UserIdentity::buyer(user_id),
    };

    let http = reqwest::Client::new();
    let auth = AuthClient::new(http.clone(), config.api_base_url.clone(), TokenStore::new());
    auth.login(&email, &password).await?;

    // --- 3. Initialize the Adapters ---
    let backend = Arc::new(HttpBackend::new(
        http,
        config.api_base_url.clone(),
        auth.clone(),
    ));
    let bus = Arc::new(WsBus::connect(
        WsBusConfig {
            url: config.bus_url.clone(),
            max_reconnect_attempts: config.reconnect_max_attempts,
            base_delay: config.reconnect_base_delay,
        },
        auth.tokens().access_token().await,
    ));

    // --- 4. Build the Session Store ---
    let chat_port: Arc<dyn ChatService> = backend.clone();
    let bus_port: Arc<dyn ChatBus> = bus.clone();
    let store = ChatSessionStore::new(
        chat_port,
        bus_port,
        identity,
        ChatStoreConfig {
            subscribe_retry: config.subscribe_retry,
            history_page_size: config.history_page_size,
        },
    );

    // --- 5. Optional Catalog Demo ---
    if let Some(product_id) = env_uuid("STOREFRONT_PRODUCT_ID")? {
        let product = backend.fetch_product(product_id).await?;
        let mut selection = storefront_core::domain::Selection::new();
        variant::fill_single_value_options(&product, &mut selection);
        println!("Product: {} ({} minor units)", product.name, product.price);
        for group in variant::available_options(&product) {
            println!(
                "  {}: {:?} (reachable: {:?})",
                group.key,
                group.values,
                variant::available_values_for(&product, &selection, &group.key)
            );
        }
        println!(
            "  complete: {}, available: {}",
            variant::is_selection_complete(&product, &selection),
            variant::is_available(&product, &selection)
        );
    }

    // --- 6. Pick a Room and Chat ---
    store.load_rooms().await;
    let rooms = store.rooms().await;
    let Some(room) = rooms.first().cloned() else {
        warn!("No chat rooms for this user; nothing to do.");
        return Ok(());
    };
    println!("{} room(s); joining {}", rooms.len(), room.id);

    store.set_active_room(Some(room.id)).await;
    store.load_messages(room.id).await;
    store.mark_as_read(room.id).await;

    let mut changes = store.watch_changes();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seen = 0usize;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(text) if !text.trim().is_empty() => {
                    store.send_message(room.id, text.trim(), Vec::new()).await;
                }
                Some(_) => {}
                None => break,
            },
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let messages = store.messages(room.id).await;
                for message in messages.iter().skip(seen.min(messages.len())) {
                    let who = match message.sender_role {
                        SenderRole::Buyer => "buyer",
                        SenderRole::Seller => "seller",
                    };
                    println!("[{who}] {}", message.content);
                }
                seen = messages.len();
            }
        }
    }

    store.set_active_room(None).await;
    info!("Storefront client shut down.");
    Ok(())
}
