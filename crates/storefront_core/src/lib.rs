pub mod chat;
pub mod domain;
pub mod ports;
pub mod variant;

pub use chat::{ChatSessionStore, ChatStoreConfig};
pub use domain::{
    AttributeValue, ChatMessage, ChatRoom, MessageId, Page, Product, Selection, SenderRole,
    UserIdentity, Variant,
};
pub use ports::{BusSubscription, CatalogService, ChatBus, ChatService, PortError, PortResult};
pub use variant::{
    available_options, available_values_for, effective_price, effective_stock,
    fill_single_value_options, is_available, is_selection_complete, resolve_variant, OptionGroup,
};
