pub mod bus;
pub mod rest;

pub use bus::{WsBus, WsBusConfig};
pub use rest::HttpBackend;
