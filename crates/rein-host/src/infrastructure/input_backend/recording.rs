//! In-memory input backend.
//!
//! `RecordingBackend` performs no OS calls. Every successful call is appended
//! to an ordered log so callers can assert exactly what was emitted and in
//! which order, and the pointer position is simulated so relative moves
//! accumulate.
//!
//! # Usage in tests
//!
//! ```ignore
//! let backend = Arc::new(RecordingBackend::new().failing_key_down(Key::LeftShift));
//! let dispatcher = InputDispatcher::new(backend.clone(), HostPlatform::Linux, false);
//!
//! dispatcher.handle(&combo);
//!
//! assert_eq!(backend.calls()[0], BackendCall::KeyDown(Key::LeftControl));
//! ```
//!
//! # Failure injection
//!
//! - `should_fail` makes every call return `BackendError::Platform`.
//! - [`RecordingBackend::failing_key_down`] and
//!   [`RecordingBackend::failing_key_up`] fail only for one key, which is
//!   what the guaranteed-release tests need.
//!
//! Failed calls are not recorded.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rein_core::{Key, MouseButton};
use tracing::debug;

use crate::application::{BackendError, InputBackend};

/// One successful call on a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    MovePointer { x: i32, y: i32 },
    PressButton(MouseButton),
    ReleaseButton(MouseButton),
    ScrollVertical(i32),
    ScrollHorizontal(i32),
    KeyDown(Key),
    KeyUp(Key),
    TapKey(Key),
    TypeText(String),
}

/// A backend that records calls instead of injecting input.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<BackendCall>>,
    pointer: Mutex<(i32, i32)>,
    failing_key_down: Option<Key>,
    failing_key_up: Option<Key>,
    /// When `true`, every method returns `BackendError::Platform`.
    pub should_fail: bool,
}

impl RecordingBackend {
    /// Creates a backend with an empty log and the pointer at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend with the simulated pointer at `(x, y)`.
    pub fn with_pointer(x: i32, y: i32) -> Self {
        Self {
            pointer: Mutex::new((x, y)),
            ..Self::default()
        }
    }

    /// Makes `key_down(key)` fail.
    pub fn failing_key_down(mut self, key: Key) -> Self {
        self.failing_key_down = Some(key);
        self
    }

    /// Makes `key_up(key)` fail.
    pub fn failing_key_up(mut self, key: Key) -> Self {
        self.failing_key_up = Some(key);
        self
    }

    /// Returns a copy of the call log.
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    /// Drains and returns the call log.
    pub fn take_calls(&self) -> Vec<BackendCall> {
        std::mem::take(&mut *lock(&self.calls))
    }

    /// Returns the simulated pointer position.
    pub fn pointer(&self) -> (i32, i32) {
        *lock(&self.pointer)
    }

    fn record(&self, call: BackendCall) -> Result<(), BackendError> {
        if self.should_fail {
            return Err(BackendError::Platform("injected failure".to_string()));
        }
        debug!("input: {call:?}");
        lock(&self.calls).push(call);
        Ok(())
    }
}

impl InputBackend for RecordingBackend {
    fn pointer_position(&self) -> Result<(i32, i32), BackendError> {
        if self.should_fail {
            return Err(BackendError::Platform("injected failure".to_string()));
        }
        Ok(self.pointer())
    }

    fn move_pointer_to(&self, x: i32, y: i32) -> Result<(), BackendError> {
        self.record(BackendCall::MovePointer { x, y })?;
        *lock(&self.pointer) = (x, y);
        Ok(())
    }

    fn press_button(&self, button: MouseButton) -> Result<(), BackendError> {
        self.record(BackendCall::PressButton(button))
    }

    fn release_button(&self, button: MouseButton) -> Result<(), BackendError> {
        self.record(BackendCall::ReleaseButton(button))
    }

    fn scroll_vertical(&self, amount: i32) -> Result<(), BackendError> {
        self.record(BackendCall::ScrollVertical(amount))
    }

    fn scroll_horizontal(&self, amount: i32) -> Result<(), BackendError> {
        self.record(BackendCall::ScrollHorizontal(amount))
    }

    fn key_down(&self, key: Key) -> Result<(), BackendError> {
        if self.failing_key_down == Some(key) {
            return Err(BackendError::Platform(format!("injected key_down failure for {key:?}")));
        }
        self.record(BackendCall::KeyDown(key))
    }

    fn key_up(&self, key: Key) -> Result<(), BackendError> {
        if self.failing_key_up == Some(key) {
            return Err(BackendError::Platform(format!("injected key_up failure for {key:?}")));
        }
        self.record(BackendCall::KeyUp(key))
    }

    fn tap_key(&self, key: Key) -> Result<(), BackendError> {
        self.record(BackendCall::TapKey(key))
    }

    fn type_text(&self, text: &str) -> Result<(), BackendError> {
        self.record(BackendCall::TypeText(text.to_string()))
    }
}

/// Locks `mutex`, recovering the data if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_backend_has_empty_log_and_origin_pointer() {
        let backend = RecordingBackend::new();
        assert!(backend.calls().is_empty());
        assert_eq!(backend.pointer(), (0, 0));
    }

    #[test]
    fn test_calls_are_recorded_in_order() {
        // Arrange
        let backend = RecordingBackend::new();

        // Act
        backend.key_down(Key::LeftAlt).unwrap();
        backend.tap_key(Key::Tab).unwrap();
        backend.key_up(Key::LeftAlt).unwrap();

        // Assert
        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::KeyDown(Key::LeftAlt),
                BackendCall::TapKey(Key::Tab),
                BackendCall::KeyUp(Key::LeftAlt),
            ]
        );
    }

    #[test]
    fn test_move_updates_simulated_pointer() {
        let backend = RecordingBackend::with_pointer(10, 10);
        backend.move_pointer_to(42, 7).unwrap();
        assert_eq!(backend.pointer_position().unwrap(), (42, 7));
    }

    #[test]
    fn test_should_fail_rejects_every_call_without_recording() {
        let backend = RecordingBackend { should_fail: true, ..RecordingBackend::default() };

        assert!(backend.pointer_position().is_err());
        assert!(backend.type_text("x").is_err());
        assert!(backend.press_button(MouseButton::Left).is_err());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_failing_key_down_only_affects_that_key() {
        let backend = RecordingBackend::new().failing_key_down(Key::LeftShift);

        assert!(backend.key_down(Key::LeftShift).is_err());
        assert!(backend.key_down(Key::LeftControl).is_ok());
        assert!(backend.key_up(Key::LeftShift).is_ok());
    }

    #[test]
    fn test_take_calls_drains_the_log() {
        let backend = RecordingBackend::new();
        backend.scroll_vertical(3).unwrap();

        assert_eq!(backend.take_calls(), vec![BackendCall::ScrollVertical(3)]);
        assert!(backend.calls().is_empty());
    }
}
