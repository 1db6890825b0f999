//! Application layer for rein-remote.
//!
//! The trackpad facade the touch surface and on-screen keys drive, and the
//! [`MessageSink`] seam it sends through.

pub mod trackpad;

pub use trackpad::{MessageSink, Trackpad};
