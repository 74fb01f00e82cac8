pub mod memory;
pub mod store;
pub mod valkey;

pub use memory::InMemoryTokenStore;
pub use store::{TokenStore, TokenStoreError};
pub use valkey::ValkeyTokenStore;
