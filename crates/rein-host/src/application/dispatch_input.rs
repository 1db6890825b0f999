//! InputDispatcher: turns decoded remote messages into OS input.
//!
//! This use case sits at the application layer and delegates every OS call
//! to an [`InputBackend`] trait object. The concrete backends live in the
//! infrastructure layer.
//!
//! Each message is handled on its own: the only state read between calls is
//! the live pointer position, fetched fresh for every `move`. Failures are
//! caught per message and logged, so one bad message never stalls the ones
//! behind it.
//!
//! # Guaranteed release
//!
//! Chords (`combo`, `swipe`, clipboard shortcuts) press every key in order
//! and then release them in the same order. If a press fails part way
//! through, the remaining presses are skipped but every key whose press was
//! attempted is still released, so the host never keeps a key held down.

use std::sync::Arc;
use std::time::Duration;

use rein_core::keymap::{self, Key};
use rein_core::{
    copy_chord, paste_chord, swipe_chord, ClientMessage, ClipboardAction, HostPlatform,
    MouseButton, ServerMessage, SwipeDirection,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Time the focused application gets to update the clipboard after the copy
/// chord before it is read back.
const COPY_SETTLE: Duration = Duration::from_millis(50);

/// Error type for OS-level input operations.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("key {0:?} is not supported by this backend")]
    UnsupportedKey(Key),
}

/// Reasons a single message was dropped.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("unmapped key name {0:?}")]
    UnmappedKey(String),
    #[error("combo contains unresolvable key name {0:?}")]
    UnresolvedComboKey(String),
    #[error("no {direction:?} swipe chord on {platform}")]
    UnsupportedGesture {
        direction: SwipeDirection,
        platform: HostPlatform,
    },
    #[error("no clipboard bridge configured")]
    NoClipboard,
}

/// Platform-agnostic input injection.
///
/// Every method may fail; the dispatcher logs the failure and moves on.
pub trait InputBackend: Send + Sync {
    /// Returns the current pointer position in screen pixels.
    fn pointer_position(&self) -> Result<(i32, i32), BackendError>;

    /// Moves the pointer to an absolute position in screen pixels.
    fn move_pointer_to(&self, x: i32, y: i32) -> Result<(), BackendError>;

    fn press_button(&self, button: MouseButton) -> Result<(), BackendError>;

    fn release_button(&self, button: MouseButton) -> Result<(), BackendError>;

    /// Scrolls vertically by `amount` notches. Positive scrolls down.
    fn scroll_vertical(&self, amount: i32) -> Result<(), BackendError>;

    /// Scrolls horizontally by `amount` notches. Positive scrolls right.
    fn scroll_horizontal(&self, amount: i32) -> Result<(), BackendError>;

    fn key_down(&self, key: Key) -> Result<(), BackendError>;

    fn key_up(&self, key: Key) -> Result<(), BackendError>;

    /// Presses and releases `key`.
    fn tap_key(&self, key: Key) -> Result<(), BackendError>;

    /// Types `text` verbatim, independent of the current keyboard layout.
    fn type_text(&self, text: &str) -> Result<(), BackendError>;
}

/// Access to the host clipboard.
#[cfg_attr(test, mockall::automock)]
pub trait ClipboardBridge: Send + Sync {
    fn read_text(&self) -> Result<String, BackendError>;

    fn write_text(&self, text: &str) -> Result<(), BackendError>;
}

/// The input dispatch use case.
pub struct InputDispatcher {
    backend: Arc<dyn InputBackend>,
    platform: HostPlatform,
    invert_scroll: bool,
    clipboard: Option<Arc<dyn ClipboardBridge>>,
}

impl InputDispatcher {
    /// Creates a dispatcher for `platform` with no clipboard bridge.
    pub fn new(backend: Arc<dyn InputBackend>, platform: HostPlatform, invert_scroll: bool) -> Self {
        Self {
            backend,
            platform,
            invert_scroll,
            clipboard: None,
        }
    }

    /// Enables `clipboard` messages.
    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardBridge>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    /// Handles one message and returns the reply to send back, if any.
    ///
    /// Never fails: errors are logged at `warn` and the message is dropped.
    pub fn handle(&self, msg: &ClientMessage) -> Option<ServerMessage> {
        match self.try_handle(msg) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("dropped {} message: {e}", msg.type_name());
                None
            }
        }
    }

    /// Handles one message, surfacing the reason it was dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the message cannot be mapped to OS input
    /// on this host or a backend call fails.
    pub fn try_handle(&self, msg: &ClientMessage) -> Result<Option<ServerMessage>, DispatchError> {
        match msg {
            ClientMessage::Move { dx, dy } => self.move_pointer(*dx, *dy)?,
            ClientMessage::Click { button, press: true } => self.backend.press_button(*button)?,
            ClientMessage::Click { button, press: false } => {
                self.backend.release_button(*button)?
            }
            ClientMessage::Scroll { dx, dy } => self.scroll(*dx, *dy)?,
            ClientMessage::Key { key } => self.key(key)?,
            ClientMessage::Text { text } => {
                if !text.is_empty() {
                    self.backend.type_text(text)?;
                }
            }
            ClientMessage::Combo { keys } => self.combo(keys)?,
            ClientMessage::Swipe { direction } => self.swipe(*direction)?,
            ClientMessage::Clipboard { action, text } => {
                return self.clipboard(*action, text.as_deref());
            }
            ClientMessage::Ping { timestamp } => {
                return Ok(Some(ServerMessage::Pong { timestamp: *timestamp }));
            }
            ClientMessage::Unknown => debug!("ignoring message of unknown type"),
        }
        Ok(None)
    }

    fn move_pointer(&self, dx: f64, dy: f64) -> Result<(), DispatchError> {
        let (x, y) = self.backend.pointer_position()?;
        let target_x = x.saturating_add(dx.round() as i32);
        let target_y = y.saturating_add(dy.round() as i32);
        self.backend.move_pointer_to(target_x, target_y)?;
        Ok(())
    }

    fn scroll(&self, dx: Option<f64>, dy: Option<f64>) -> Result<(), DispatchError> {
        let multiplier = if self.invert_scroll { -1.0 } else { 1.0 };

        if let Some(amount) = notches(dy.map(|dy| dy * multiplier)) {
            self.backend.scroll_vertical(amount)?;
        }
        // Horizontal deltas arrive with the opposite sign convention.
        if let Some(amount) = notches(dx.map(|dx| dx * -1.0 * multiplier)) {
            self.backend.scroll_horizontal(amount)?;
        }
        Ok(())
    }

    fn key(&self, name: &str) -> Result<(), DispatchError> {
        if let Some(key) = keymap::lookup(name) {
            self.backend.tap_key(key)?;
        } else if let Some(c) = keymap::single_char(name) {
            self.backend.type_text(c.encode_utf8(&mut [0; 4]))?;
        } else {
            return Err(DispatchError::UnmappedKey(name.to_string()));
        }
        Ok(())
    }

    fn combo(&self, names: &[String]) -> Result<(), DispatchError> {
        let keys = names
            .iter()
            .map(|name| {
                keymap::resolve(name).ok_or_else(|| DispatchError::UnresolvedComboKey(name.clone()))
            })
            .collect::<Result<Vec<Key>, _>>()?;

        if keys.is_empty() {
            debug!("ignoring empty combo");
            return Ok(());
        }
        self.press_chord(&keys)
    }

    fn swipe(&self, direction: SwipeDirection) -> Result<(), DispatchError> {
        let chord = swipe_chord(direction, self.platform).ok_or(DispatchError::UnsupportedGesture {
            direction,
            platform: self.platform,
        })?;
        self.press_chord(chord)
    }

    fn clipboard(
        &self,
        action: ClipboardAction,
        text: Option<&str>,
    ) -> Result<Option<ServerMessage>, DispatchError> {
        let bridge = self.clipboard.as_ref().ok_or(DispatchError::NoClipboard)?;

        match action {
            ClipboardAction::Copy => {
                self.press_chord(copy_chord(self.platform))?;
                std::thread::sleep(COPY_SETTLE);
                let text = bridge.read_text()?;
                Ok(Some(ServerMessage::ClipboardContent { text }))
            }
            ClipboardAction::Paste => {
                if let Some(text) = text {
                    bridge.write_text(text)?;
                }
                self.press_chord(paste_chord(self.platform))?;
                Ok(None)
            }
        }
    }

    /// Presses `keys` in order, then releases them in the same order.
    ///
    /// A failed press stops further presses. Every key whose press was
    /// attempted is released regardless, and release failures do not stop the
    /// remaining releases. The first error seen is returned.
    fn press_chord(&self, keys: &[Key]) -> Result<(), DispatchError> {
        let mut attempted = 0;
        let mut first_error: Option<BackendError> = None;

        for key in keys {
            attempted += 1;
            if let Err(e) = self.backend.key_down(*key) {
                first_error = Some(e);
                break;
            }
        }

        for key in &keys[..attempted] {
            if let Err(e) = self.backend.key_up(*key) {
                warn!("failed to release {key:?}: {e}");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// Rounds a scroll delta to whole notches; absent or zero means no call.
fn notches(delta: Option<f64>) -> Option<i32> {
    let amount = delta?.round() as i32;
    (amount != 0).then_some(amount)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
