//! Input backends: the implementations of [`InputBackend`].
//!
//! - [`RecordingBackend`] keeps an in-memory call log. It backs the tests and
//!   the host's `--dry-run` mode.
//! - `EnigoBackend` (feature `native`, on by default) injects real OS input.
//!
//! [`InputBackend`]: crate::application::InputBackend

pub mod recording;

#[cfg(feature = "native")]
pub mod enigo;

pub use recording::{BackendCall, RecordingBackend};

#[cfg(feature = "native")]
pub use self::enigo::EnigoBackend;
