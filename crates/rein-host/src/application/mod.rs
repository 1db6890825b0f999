//! Application layer for rein-host.
//!
//! Contains the input dispatch use case and the traits it needs from the
//! infrastructure layer.

pub mod dispatch_input;

pub use dispatch_input::{
    BackendError, ClipboardBridge, DispatchError, InputBackend, InputDispatcher,
};
