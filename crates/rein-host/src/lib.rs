//! rein-host library crate.
//!
//! The host half of Rein: it accepts one remote at a time over WebSocket and
//! replays the remote's pointer, keyboard and gesture messages as real OS
//! input.
//!
//! # Architecture
//!
//! ```text
//! Remote (JSON over WebSocket)
//!         ↕
//! [rein-host]
//!   ├── domain/            HostConfig (runtime settings)
//!   ├── application/       InputDispatcher, InputBackend and ClipboardBridge seams
//!   └── infrastructure/
//!         ├── ws_server/       Accept loop, handshake checks, per-session tasks
//!         ├── input_backend/   Recording backend and the enigo backend
//!         ├── clipboard/       OS and in-memory clipboard bridges
//!         └── storage/         TOML config persistence
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `rein-core` only; OS access goes
//!   through the [`application::InputBackend`] trait.
//! - `infrastructure` owns sockets, files and OS bindings.

/// Domain layer: runtime configuration.
pub mod domain;

/// Application layer: input dispatch.
pub mod application;

/// Infrastructure layer: WebSocket server, input backends, storage.
pub mod infrastructure;
