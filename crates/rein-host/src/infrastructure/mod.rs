//! Infrastructure layer for rein-host.
//!
//! - `ws_server`     – WebSocket accept loop and per-session tasks.
//! - `input_backend` – `InputBackend` implementations.
//! - `clipboard`     – `ClipboardBridge` implementations.
//! - `storage`       – TOML config persistence.

pub mod clipboard;
pub mod input_backend;
pub mod storage;
pub mod ws_server;

pub use ws_server::HostServer;
