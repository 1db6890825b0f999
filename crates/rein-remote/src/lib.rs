//! rein-remote library crate.
//!
//! The remote half of Rein: it keeps one logical session to a host alive
//! across network drops, measures round-trip latency, and turns trackpad and
//! keyboard actions into protocol messages.
//!
//! # Architecture
//!
//! ```text
//! [rein-remote]
//!   ├── domain/
//!   │     ├── connection_state   Sans-IO session machine (status, backoff, heartbeat)
//!   │     ├── combo_buffer       Modifier staging for multi-key chords
//!   │     └── config             Timings and endpoint URL construction
//!   ├── application/
//!   │     └── trackpad           Callback surface for the touch UI
//!   └── infrastructure/
//!         ├── connection_manager tokio driver owning the socket and timers
//!         └── token_store        Persisted auth token
//!         ↕
//! Host (JSON over WebSocket)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no timers; time is passed in.
//! - `application` sends through the [`application::MessageSink`] trait.
//! - `infrastructure` owns the socket, the timers and the token file.

/// Domain layer: session machine, combo buffer, settings.
pub mod domain;

/// Application layer: trackpad facade.
pub mod application;

/// Infrastructure layer: connection driver and token storage.
pub mod infrastructure;
