//! Domain layer for rein-remote: pure state, no I/O.

pub mod combo_buffer;
pub mod config;
pub mod connection_state;

pub use combo_buffer::{ComboBuffer, ModifierState};
pub use config::{endpoint_url, ConnectionTimings, RemoteConfig};
pub use connection_state::{ConnectionAction, ConnectionEvent, ConnectionMachine, ConnectionStatus};
