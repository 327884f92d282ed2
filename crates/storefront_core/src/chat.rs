//! crates/storefront_core/src/chat.rs
//!
//! The chat session store: a client-side state container that reconciles
//! REST-fetched room history with the live message-bus subscription for
//! the active room.
//!
//! The store guarantees the consuming view never sees a duplicate or a
//! lost message across the history/live boundary, keeps at most one live
//! subscription at any instant, and never lets an expected failure
//! (network error, bus outage) escape past its boundary — held state is
//! left stale-but-consistent and the failure is logged.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{ChatMessage, ChatRoom, MessageId, SenderRole, UserIdentity};
use crate::ports::{ChatBus, ChatService, PortError, PortResult};

//=========================================================================================
// Configuration
//=========================================================================================

/// Tuning knobs for the session store.
#[derive(Debug, Clone)]
pub struct ChatStoreConfig {
    /// Fixed interval between subscribe attempts while the bus connection
    /// is not yet established.
    pub subscribe_retry: Duration,
    /// Page size used by `load_messages`.
    pub history_page_size: u32,
}

impl Default for ChatStoreConfig {
    fn default() -> Self {
        Self {
            subscribe_retry: Duration::from_millis(500),
            history_page_size: 50,
        }
    }
}

//=========================================================================================
// Store State
//=========================================================================================

/// The one live room subscription. Cancelling the token stops both the
/// retry loop (while connecting) and the forwarding task (once live).
struct ActiveSubscription {
    room_id: Uuid,
    token: CancellationToken,
}

struct StoreInner {
    rooms: Vec<ChatRoom>,
    rooms_loading: bool,
    /// Room id -> oldest-first message list. Only this store's own
    /// operations write into it.
    messages: HashMap<Uuid, Vec<ChatMessage>>,
    history_loading: HashSet<Uuid>,
    active_room: Option<Uuid>,
    subscription: Option<ActiveSubscription>,
}

/// A cheaply cloneable handle to the per-session chat state. Clones share
/// the same inner state; one handle typically lives in the view layer and
/// others in spawned forwarding tasks.
#[derive(Clone)]
pub struct ChatSessionStore {
    chat: Arc<dyn ChatService>,
    bus: Arc<dyn ChatBus>,
    identity: UserIdentity,
    config: ChatStoreConfig,
    inner: Arc<Mutex<StoreInner>>,
    changed: Arc<watch::Sender<u64>>,
}

impl ChatSessionStore {
    /// Builds a store around injected port objects. The bus connection is
    /// owned by the composition root and passed in by reference, never
    /// reached through global state.
    pub fn new(
        chat: Arc<dyn ChatService>,
        bus: Arc<dyn ChatBus>,
        identity: UserIdentity,
        config: ChatStoreConfig,
    ) -> Self {
        let (changed, _) = watch::channel(0u64);
        Self {
            chat,
            bus,
            identity,
            config,
            inner: Arc::new(Mutex::new(StoreInner {
                rooms: Vec::new(),
                rooms_loading: false,
                messages: HashMap::new(),
                history_loading: HashSet::new(),
                active_room: None,
                subscription: None,
            })),
            changed: Arc::new(changed),
        }
    }

    fn mark_changed(&self) {
        self.changed.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// A receiver that observes a revision bump on every state change.
    /// Consumers re-read the projections when it fires.
    pub fn watch_changes(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    //=====================================================================================
    // Operations
    //=====================================================================================

    /// Fetches the room list for the current identity: buyers list by
    /// user id, sellers by shop id. On failure the previous list stays in
    /// place and the failure is only logged.
    pub async fn load_rooms(&self) {
        {
            let mut inner = self.inner.lock().await;
            if inner.rooms_loading {
                debug!("Room list refresh skipped, a fetch is already in flight");
                return;
            }
            inner.rooms_loading = true;
        }
        self.mark_changed();

        let result = match (self.identity.role, self.identity.shop_id) {
            (SenderRole::Buyer, _) => self.chat.rooms_for_buyer(self.identity.user_id).await,
            (SenderRole::Seller, Some(shop_id)) => self.chat.rooms_for_shop(shop_id).await,
            (SenderRole::Seller, None) => Err(PortError::Unexpected(
                "seller identity without a shop id".to_string(),
            )),
        };

        let mut inner = self.inner.lock().await;
        inner.rooms_loading = false;
        match result {
            Ok(rooms) => inner.rooms = rooms,
            Err(e) => warn!("Failed to load chat rooms: {e}"),
        }
        drop(inner);
        self.mark_changed();
    }

    /// Fetches one page of history for a room and stores it as the
    /// authoritative oldest-first list, replacing any cached entry.
    ///
    /// A late response for a room that is no longer active is still
    /// stored; it simply is not visible until the user switches back.
    pub async fn load_messages(&self, room_id: Uuid) {
        {
            let mut inner = self.inner.lock().await;
            inner.history_loading.insert(room_id);
        }
        self.mark_changed();

        let result = self
            .chat
            .message_history(room_id, 1, self.config.history_page_size)
            .await;

        let mut inner = self.inner.lock().await;
        inner.history_loading.remove(&room_id);
        match result {
            Ok(messages) => {
                inner.messages.insert(room_id, messages);
            }
            Err(e) => warn!("Failed to load history for room {room_id}: {e}"),
        }
        drop(inner);
        self.mark_changed();
    }

    /// Optimistic send: synthesizes a `Pending` placeholder, appends it
    /// immediately, then publishes the send request on the bus. Publish
    /// failure is logged only; the placeholder stays visible until the
    /// server echo reconciles it via [`add_message`].
    pub async fn send_message(
        &self,
        room_id: Uuid,
        content: impl Into<String>,
        attachments: Vec<String>,
    ) -> ChatMessage {
        let message = ChatMessage {
            id: MessageId::Pending {
                local_id: Uuid::new_v4(),
            },
            room_id,
            sender_id: self.identity.user_id,
            sender_role: self.identity.role,
            content: content.into(),
            attachments,
            read: false,
            created_at: Utc::now(),
        };

        {
            let mut inner = self.inner.lock().await;
            inner
                .messages
                .entry(room_id)
                .or_default()
                .push(message.clone());
        }
        self.mark_changed();

        if let Err(e) = self.bus.publish_message(&message).await {
            warn!("Failed to publish message for room {room_id}: {e}");
        }
        message
    }

    /// Ingests a message delivered over the bus (the user's own echoed
    /// send or a counterpart's message). Dedup rule, applied in order:
    ///
    /// 1. the exact id already exists in the room -> discard the incoming
    ///    message;
    /// 2. otherwise remove at most one `Pending` placeholder with equal
    ///    content and sender, then append.
    pub async fn add_message(&self, message: ChatMessage) {
        let mut inner = self.inner.lock().await;
        let list = inner.messages.entry(message.room_id).or_default();

        if list.iter().any(|m| m.id == message.id) {
            debug!("Dropping duplicate message for room {}", message.room_id);
            return;
        }

        if let Some(pos) = list.iter().position(|m| {
            m.id.is_pending() && m.sender_id == message.sender_id && m.content == message.content
        }) {
            list.remove(pos);
        }
        list.push(message);
        drop(inner);
        self.mark_changed();
    }

    /// Publishes a read receipt for the current user. Fire-and-forget: no
    /// local state changes, failures are logged.
    pub async fn mark_as_read(&self, room_id: Uuid) {
        if let Err(e) = self
            .bus
            .publish_read_receipt(room_id, self.identity.user_id)
            .await
        {
            warn!("Failed to publish read receipt for room {room_id}: {e}");
        }
    }

    /// Looks up or creates the buyer's room with a shop and registers it
    /// in the room list. The caller decides whether to activate it.
    pub async fn open_room(&self, shop_id: Uuid, order_id: Option<Uuid>) -> PortResult<ChatRoom> {
        let room = self
            .chat
            .ensure_room(self.identity.user_id, shop_id, order_id)
            .await?;
        let mut inner = self.inner.lock().await;
        if !inner.rooms.iter().any(|r| r.id == room.id) {
            inner.rooms.push(room.clone());
        }
        drop(inner);
        self.mark_changed();
        Ok(room)
    }

    /// Switches the active room. The previous room's subscription (or its
    /// still-retrying subscribe loop) is cancelled before anything else,
    /// so at most one subscription is ever live. `None` tears down
    /// without activating a replacement (view exit).
    pub async fn set_active_room(&self, room_id: Option<Uuid>) {
        {
            let mut inner = self.inner.lock().await;
            if inner.active_room == room_id && inner.subscription.is_some() == room_id.is_some() {
                return;
            }
            if let Some(previous) = inner.subscription.take() {
                info!("Unsubscribing from room {}", previous.room_id);
                previous.token.cancel();
            }
            inner.active_room = room_id;

            if let Some(room_id) = room_id {
                let token = CancellationToken::new();
                inner.subscription = Some(ActiveSubscription {
                    room_id,
                    token: token.clone(),
                });
                let store = self.clone();
                tokio::spawn(async move {
                    store.run_subscription(room_id, token).await;
                });
            }
        }
        self.mark_changed();
    }

    /// The subscription task: retries the subscribe on a fixed interval
    /// while the bus connection is down, then forwards bus events into
    /// [`add_message`] until cancelled. `biased` keeps cancellation wins
    /// deterministic: once the room is switched, no further event for the
    /// old room is delivered into the store.
    async fn run_subscription(self, room_id: Uuid, token: CancellationToken) {
        let mut subscription = loop {
            if token.is_cancelled() {
                return;
            }
            if self.bus.is_ready() {
                match self.bus.subscribe(room_id).await {
                    Ok(subscription) => break subscription,
                    Err(e) => debug!("Subscribe attempt for room {room_id} failed: {e}"),
                }
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(self.config.subscribe_retry) => {}
            }
        };
        info!("Subscribed to room {room_id}");

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("Subscription for room {room_id} cancelled");
                    return;
                }
                event = subscription.events.recv() => match event {
                    Some(message) => self.add_message(message).await,
                    None => {
                        // The bus dropped the feed (reconnect exhausted or
                        // server-side close). Stale view over error page.
                        warn!("Bus feed for room {room_id} closed");
                        let mut inner = self.inner.lock().await;
                        // Only this task's entry is cleared: a cancelled
                        // token means the slot already belongs to a newer
                        // subscription.
                        if !token.is_cancelled() {
                            inner.subscription = None;
                        }
                        drop(inner);
                        self.mark_changed();
                        return;
                    }
                },
            }
        }
    }

    //=====================================================================================
    // Read-only Projections
    //=====================================================================================

    pub async fn rooms(&self) -> Vec<ChatRoom> {
        self.inner.lock().await.rooms.clone()
    }

    pub async fn messages(&self, room_id: Uuid) -> Vec<ChatMessage> {
        self.inner
            .lock()
            .await
            .messages
            .get(&room_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn active_room(&self) -> Option<Uuid> {
        self.inner.lock().await.active_room
    }

    pub async fn is_loading_rooms(&self) -> bool {
        self.inner.lock().await.rooms_loading
    }

    pub async fn is_loading_history(&self, room_id: Uuid) -> bool {
        self.inner.lock().await.history_loading.contains(&room_id)
    }

    /// Whether the bus connection currently stands. Views show a stale
    /// transcript rather than an error while this is false.
    pub fn is_connected(&self) -> bool {
        self.bus.is_ready()
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::BusSubscription;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::mpsc;

    //=====================================================================================
    // Fake Ports
    //=====================================================================================

    #[derive(Default)]
    struct FakeChat {
        rooms: Vec<ChatRoom>,
        history: HashMap<Uuid, Vec<ChatMessage>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl ChatService for FakeChat {
        async fn rooms_for_buyer(&self, _user_id: Uuid) -> PortResult<Vec<ChatRoom>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PortError::Unexpected("backend down".to_string()));
            }
            Ok(self.rooms.clone())
        }

        async fn rooms_for_shop(&self, shop_id: Uuid) -> PortResult<Vec<ChatRoom>> {
            self.rooms_for_buyer(shop_id).await
        }

        async fn message_history(
            &self,
            room_id: Uuid,
            _page: u32,
            _per_page: u32,
        ) -> PortResult<Vec<ChatMessage>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PortError::Unexpected("backend down".to_string()));
            }
            Ok(self.history.get(&room_id).cloned().unwrap_or_default())
        }

        async fn ensure_room(
            &self,
            buyer_id: Uuid,
            shop_id: Uuid,
            order_id: Option<Uuid>,
        ) -> PortResult<ChatRoom> {
            Ok(ChatRoom {
                id: Uuid::new_v4(),
                buyer_id,
                shop_id,
                order_id,
                created_at: Utc::now(),
            })
        }
    }

    #[derive(Default)]
    struct FakeBus {
        ready: AtomicBool,
        feeds: StdMutex<HashMap<Uuid, mpsc::Sender<ChatMessage>>>,
        published: StdMutex<Vec<ChatMessage>>,
        receipts: StdMutex<Vec<(Uuid, Uuid)>>,
    }

    impl FakeBus {
        fn up() -> Self {
            let bus = Self::default();
            bus.ready.store(true, Ordering::SeqCst);
            bus
        }

        fn has_feed(&self, room_id: Uuid) -> bool {
            self.feeds.lock().unwrap().contains_key(&room_id)
        }

        /// Drops a room's feed sender, closing the subscriber's channel
        /// the way an exhausted reconnect does.
        fn close_feed(&self, room_id: Uuid) {
            self.feeds.lock().unwrap().remove(&room_id);
        }

        /// Pushes a message into a room's feed as if the backend had
        /// delivered it. Returns false when no subscription exists.
        async fn deliver(&self, message: ChatMessage) -> bool {
            let sender = {
                let feeds = self.feeds.lock().unwrap();
                feeds.get(&message.room_id).cloned()
            };
            match sender {
                Some(sender) => sender.send(message).await.is_ok(),
                None => false,
            }
        }
    }

    #[async_trait]
    impl ChatBus for FakeBus {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        async fn subscribe(&self, room_id: Uuid) -> PortResult<BusSubscription> {
            if !self.is_ready() {
                return Err(PortError::Unavailable("not connected".to_string()));
            }
            let (sender, events) = mpsc::channel(16);
            self.feeds.lock().unwrap().insert(room_id, sender);
            Ok(BusSubscription { room_id, events })
        }

        async fn publish_message(&self, message: &ChatMessage) -> PortResult<()> {
            if !self.is_ready() {
                return Err(PortError::Unavailable("not connected".to_string()));
            }
            self.published.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn publish_read_receipt(&self, room_id: Uuid, user_id: Uuid) -> PortResult<()> {
            self.receipts.lock().unwrap().push((room_id, user_id));
            Ok(())
        }
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    fn confirmed(room_id: Uuid, sender_id: Uuid, content: &str) -> ChatMessage {
        ChatMessage {
            id: MessageId::Confirmed {
                server_id: Uuid::new_v4(),
            },
            room_id,
            sender_id,
            sender_role: SenderRole::Buyer,
            content: content.to_string(),
            attachments: Vec::new(),
            read: false,
            created_at: Utc::now(),
        }
    }

    fn room(id: Uuid) -> ChatRoom {
        ChatRoom {
            id,
            buyer_id: Uuid::new_v4(),
            shop_id: Uuid::new_v4(),
            order_id: None,
            created_at: Utc::now(),
        }
    }

    fn store_with(chat: Arc<FakeChat>, bus: Arc<FakeBus>) -> (ChatSessionStore, UserIdentity) {
        let identity = UserIdentity::buyer(Uuid::new_v4());
        let config = ChatStoreConfig {
            subscribe_retry: Duration::from_millis(10),
            history_page_size: 50,
        };
        let store = ChatSessionStore::new(chat, bus, identity.clone(), config);
        (store, identity)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    //=====================================================================================
    // Tests
    //=====================================================================================

    #[tokio::test]
    async fn add_message_is_idempotent_per_server_id() {
        let bus = Arc::new(FakeBus::up());
        let (store, _) = store_with(Arc::new(FakeChat::default()), bus);
        let room_id = Uuid::new_v4();
        let message = confirmed(room_id, Uuid::new_v4(), "hi");

        store.add_message(message.clone()).await;
        store.add_message(message).await;

        assert_eq!(store.messages(room_id).await.len(), 1);
    }

    #[tokio::test]
    async fn optimistic_send_reconciles_with_server_echo() {
        let bus = Arc::new(FakeBus::up());
        let (store, identity) = store_with(Arc::new(FakeChat::default()), bus.clone());
        let room_id = Uuid::new_v4();

        store.send_message(room_id, "hello", Vec::new()).await;
        assert_eq!(bus.published.lock().unwrap().len(), 1);

        let echo = confirmed(room_id, identity.user_id, "hello");
        let server_id = echo.id;
        store.add_message(echo).await;

        let messages = store.messages(room_id).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, server_id);
        assert_eq!(messages[0].content, "hello");
    }

    #[tokio::test]
    async fn placeholder_survives_publish_failure() {
        let bus = Arc::new(FakeBus::default()); // not ready, publish fails
        let (store, _) = store_with(Arc::new(FakeChat::default()), bus);
        let room_id = Uuid::new_v4();

        store.send_message(room_id, "hello", Vec::new()).await;

        let messages = store.messages(room_id).await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].id.is_pending());
    }

    #[tokio::test]
    async fn counterpart_message_does_not_eat_placeholder() {
        let bus = Arc::new(FakeBus::up());
        let (store, _) = store_with(Arc::new(FakeChat::default()), bus);
        let room_id = Uuid::new_v4();

        store.send_message(room_id, "hello", Vec::new()).await;
        // Same text, other sender: must coexist with the placeholder.
        store
            .add_message(confirmed(room_id, Uuid::new_v4(), "hello"))
            .await;

        assert_eq!(store.messages(room_id).await.len(), 2);
    }

    #[tokio::test]
    async fn history_then_live_preserves_order() {
        let room_id = Uuid::new_v4();
        let sender = Uuid::new_v4();
        let m1 = confirmed(room_id, sender, "m1");
        let m2 = confirmed(room_id, sender, "m2");
        let chat = FakeChat {
            history: HashMap::from([(room_id, vec![m1.clone(), m2.clone()])]),
            ..Default::default()
        };
        let bus = Arc::new(FakeBus::up());
        let (store, _) = store_with(Arc::new(chat), bus);

        store.load_messages(room_id).await;
        store.add_message(confirmed(room_id, sender, "m3")).await;

        let contents: Vec<String> = store
            .messages(room_id)
            .await
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn load_rooms_failure_keeps_previous_list() {
        let chat = Arc::new(FakeChat {
            rooms: vec![room(Uuid::new_v4())],
            ..Default::default()
        });
        let bus = Arc::new(FakeBus::up());
        let (store, _) = store_with(chat.clone(), bus);

        store.load_rooms().await;
        assert_eq!(store.rooms().await.len(), 1);

        chat.fail.store(true, Ordering::SeqCst);
        store.load_rooms().await;

        assert_eq!(store.rooms().await.len(), 1);
        assert!(!store.is_loading_rooms().await);
    }

    #[tokio::test]
    async fn late_history_for_deactivated_room_is_stored() {
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();
        let chat = FakeChat {
            history: HashMap::from([(room_a, vec![confirmed(room_a, Uuid::new_v4(), "old")])]),
            ..Default::default()
        };
        let bus = Arc::new(FakeBus::up());
        let (store, _) = store_with(Arc::new(chat), bus);

        store.set_active_room(Some(room_b)).await;
        // The fetch for A resolves while B is active; it is stored anyway.
        store.load_messages(room_a).await;

        assert_eq!(store.active_room().await, Some(room_b));
        assert_eq!(store.messages(room_a).await.len(), 1);
    }

    #[tokio::test]
    async fn room_switch_stops_delivery_for_previous_room() {
        let bus = Arc::new(FakeBus::up());
        let (store, _) = store_with(Arc::new(FakeChat::default()), bus.clone());
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();

        store.set_active_room(Some(room_a)).await;
        wait_until(|| bus.has_feed(room_a)).await;

        store.set_active_room(Some(room_b)).await;
        wait_until(|| bus.has_feed(room_b)).await;

        // A's forwarding task is cancelled; a late event must not land.
        bus.deliver(confirmed(room_a, Uuid::new_v4(), "late")).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.messages(room_a).await.is_empty());

        // B's feed still flows.
        bus.deliver(confirmed(room_b, Uuid::new_v4(), "fresh"))
            .await;
        for _ in 0..200 {
            if !store.messages(room_b).await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(store.messages(room_b).await.len(), 1);
    }

    #[tokio::test]
    async fn subscribe_retries_until_bus_ready() {
        let bus = Arc::new(FakeBus::default()); // down
        let (store, _) = store_with(Arc::new(FakeChat::default()), bus.clone());
        let room_id = Uuid::new_v4();

        store.set_active_room(Some(room_id)).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!bus.has_feed(room_id));

        bus.ready.store(true, Ordering::SeqCst);
        wait_until(|| bus.has_feed(room_id)).await;
    }

    #[tokio::test]
    async fn reactivating_room_after_feed_close_resubscribes() {
        let bus = Arc::new(FakeBus::up());
        let (store, _) = store_with(Arc::new(FakeChat::default()), bus.clone());
        let room_a = Uuid::new_v4();

        store.set_active_room(Some(room_a)).await;
        wait_until(|| bus.has_feed(room_a)).await;

        // The bus drops the feed; the forwarding task must release its
        // subscription slot so a later activation is not a no-op.
        bus.close_feed(room_a);
        tokio::time::sleep(Duration::from_millis(50)).await;

        store.set_active_room(Some(room_a)).await;
        wait_until(|| bus.has_feed(room_a)).await;

        bus.deliver(confirmed(room_a, Uuid::new_v4(), "back"))
            .await;
        for _ in 0..200 {
            if !store.messages(room_a).await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(store.messages(room_a).await.len(), 1);
    }

    #[tokio::test]
    async fn retry_loop_terminates_on_room_switch() {
        let bus = Arc::new(FakeBus::default()); // down, subscribe will spin
        let (store, _) = store_with(Arc::new(FakeChat::default()), bus.clone());
        let room_a = Uuid::new_v4();

        store.set_active_room(Some(room_a)).await;
        store.set_active_room(None).await;

        // Bus coming up later must not resurrect the abandoned loop.
        bus.ready.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!bus.has_feed(room_a));
        assert_eq!(store.active_room().await, None);
    }

    #[tokio::test]
    async fn mark_as_read_publishes_receipt_without_state_change() {
        let bus = Arc::new(FakeBus::up());
        let (store, identity) = store_with(Arc::new(FakeChat::default()), bus.clone());
        let room_id = Uuid::new_v4();

        store.mark_as_read(room_id).await;

        assert_eq!(
            bus.receipts.lock().unwrap().as_slice(),
            &[(room_id, identity.user_id)]
        );
        assert!(store.messages(room_id).await.is_empty());
    }

    #[tokio::test]
    async fn open_room_registers_once() {
        let bus = Arc::new(FakeBus::up());
        let (store, _) = store_with(Arc::new(FakeChat::default()), bus);
        let shop_id = Uuid::new_v4();

        let created = store.open_room(shop_id, None).await.expect("room");
        assert_eq!(store.rooms().await.len(), 1);
        assert_eq!(store.rooms().await[0].id, created.id);
    }
}
