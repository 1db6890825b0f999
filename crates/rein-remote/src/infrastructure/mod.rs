//! Infrastructure layer for rein-remote.

pub mod connection_manager;
pub mod token_store;

pub use connection_manager::{ConnectionError, ConnectionHandle, ConnectionManager};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreError};
