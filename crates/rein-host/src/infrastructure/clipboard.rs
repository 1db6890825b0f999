//! Clipboard bridges.
//!
//! - `SystemClipboard` (feature `native`) reads and writes the OS clipboard
//!   through `copypasta`.
//! - [`MemoryClipboard`] stands in for it in tests and dry runs. Reads return
//!   the last written text, or an empty string before the first write.

use std::sync::{Mutex, PoisonError};

#[cfg(feature = "native")]
use copypasta::{ClipboardContext, ClipboardProvider};
#[cfg(feature = "native")]
use tracing::info;

use crate::application::{BackendError, ClipboardBridge};

/// The OS clipboard.
///
/// The context is kept for the life of the host: on X11 the selection is
/// only served while its owner is alive.
#[cfg(feature = "native")]
pub struct SystemClipboard {
    ctx: Mutex<ClipboardContext>,
}

#[cfg(feature = "native")]
impl SystemClipboard {
    /// Opens the platform clipboard.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Platform`] when no clipboard is reachable, for
    /// example on a headless Linux session.
    pub fn new() -> Result<Self, BackendError> {
        let ctx = ClipboardContext::new()
            .map_err(|e| BackendError::Platform(format!("failed to open clipboard: {e}")))?;
        info!("system clipboard ready");
        Ok(Self { ctx: Mutex::new(ctx) })
    }
}

#[cfg(feature = "native")]
impl ClipboardBridge for SystemClipboard {
    fn read_text(&self) -> Result<String, BackendError> {
        self.ctx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_contents()
            .map_err(|e| BackendError::Platform(format!("clipboard read failed: {e}")))
    }

    fn write_text(&self, text: &str) -> Result<(), BackendError> {
        self.ctx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_contents(text.to_string())
            .map_err(|e| BackendError::Platform(format!("clipboard write failed: {e}")))
    }
}

#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Mutex<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clipboard already holding `text`.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { text: Mutex::new(text.into()) }
    }
}

impl ClipboardBridge for MemoryClipboard {
    fn read_text(&self) -> Result<String, BackendError> {
        Ok(self.text.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn write_text(&self, text: &str) -> Result<(), BackendError> {
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = text.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_clipboard_reads_empty_string() {
        assert_eq!(MemoryClipboard::new().read_text().unwrap(), "");
    }

    #[test]
    fn test_write_then_read_returns_written_text() {
        let clipboard = MemoryClipboard::with_text("old");
        clipboard.write_text("new").unwrap();
        assert_eq!(clipboard.read_text().unwrap(), "new");
    }
}
