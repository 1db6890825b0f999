//! # rein-core
//!
//! Shared library for Rein containing the control-channel message
//! vocabulary, the symbolic key table, and the platform gesture map.
//!
//! This crate is used by both the host (`rein-host`) and the remote
//! (`rein-remote`). It has no dependencies on OS input APIs, sockets, or an
//! async runtime.
//!
//! # Architecture overview
//!
//! Rein turns a phone or tablet into a trackpad and keyboard for a host
//! computer. The remote sends small JSON messages over a WebSocket; the host
//! replays them as real pointer and keyboard input.
//!
//! - **`protocol`** – The tagged JSON messages exchanged over the channel and
//!   the frame encode/decode helpers. Unknown message types decode to an
//!   explicit no-op variant so older hosts tolerate newer remotes.
//!
//! - **`keymap`** – The symbolic key names the remote UI emits (`"ctrl"`,
//!   `"pgdn"`, `"audiomute"`, ...) and the [`Key`] values they resolve to.
//!
//! - **`gesture`** – Pure lookup tables mapping a swipe direction and host
//!   platform to the window-management key chord that performs it.
//!
//! - **`platform`** – Compile-time detection of the host operating system.

pub mod gesture;
pub mod keymap;
pub mod platform;
pub mod protocol;

pub use gesture::{copy_chord, paste_chord, swipe_chord};
pub use keymap::Key;
pub use platform::HostPlatform;
pub use protocol::codec::{decode_client_frame, decode_server_frame, encode_frame, ProtocolError};
pub use protocol::messages::{
    ClientMessage, ClipboardAction, MouseButton, ServerMessage, SwipeDirection,
};
