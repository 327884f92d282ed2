pub mod adapters;
pub mod auth;
pub mod config;
pub mod error;
pub mod protocol;

pub use adapters::{HttpBackend, WsBus, WsBusConfig};
pub use auth::{AuthClient, TokenPair, TokenStore};
pub use config::Config;
pub use error::ClientError;
