//! Client-side modifier staging.
//!
//! A user composes a chord like Ctrl+Shift+K on a virtual keyboard by
//! toggling into [`ModifierState::Active`], tapping the modifiers, toggling
//! into [`ModifierState::Hold`], and then tapping the final key. Every key
//! tapped while held fires one `combo` of everything staged plus that key.

use rein_core::ClientMessage;

/// Staging mode of the [`ComboBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModifierState {
    /// Keys pass straight through.
    #[default]
    Release,
    /// Keys are staged, nothing is sent.
    Active,
    /// Each key fires the staged keys plus itself as one combo.
    Hold,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComboBuffer {
    state: ModifierState,
    keys: Vec<String>,
}

impl ComboBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ModifierState {
        self.state
    }

    /// Staged keys in chord order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Advances `Release → Active → Hold → Release`.
    ///
    /// Moving from `Active` to `Hold` with nothing staged collapses to
    /// `Release` instead.
    pub fn toggle(&mut self) -> ModifierState {
        self.state = match self.state {
            ModifierState::Release => {
                self.keys.clear();
                ModifierState::Active
            }
            ModifierState::Active if !self.keys.is_empty() => ModifierState::Hold,
            ModifierState::Active | ModifierState::Hold => {
                self.keys.clear();
                ModifierState::Release
            }
        };
        self.state
    }

    /// Drops everything staged and returns to `Release`.
    pub fn cancel(&mut self) {
        self.state = ModifierState::Release;
        self.keys.clear();
    }

    /// Routes a named key press. Returns the message to send, if any.
    pub fn route_key(&mut self, key: &str) -> Option<ClientMessage> {
        if self.state != ModifierState::Release {
            let lowered = key.to_ascii_lowercase();
            if lowered == "escape" || lowered == "esc" {
                self.cancel();
                return None;
            }
            if lowered == "backspace" {
                self.keys.pop();
                // Hold with nothing staged would fire bare keys as combos.
                if self.state == ModifierState::Hold && self.keys.is_empty() {
                    self.state = ModifierState::Release;
                }
                return None;
            }
        }

        match self.state {
            ModifierState::Release => Some(ClientMessage::Key { key: key.to_string() }),
            _ => self.stage(key),
        }
    }

    /// Routes typed text. Empty text is ignored.
    pub fn route_text(&mut self, text: &str) -> Option<ClientMessage> {
        if text.is_empty() {
            return None;
        }
        match self.state {
            ModifierState::Release => Some(ClientMessage::Text { text: text.to_string() }),
            _ => self.stage(text),
        }
    }

    fn stage(&mut self, token: &str) -> Option<ClientMessage> {
        match self.state {
            ModifierState::Active => {
                self.keys.push(token.to_string());
                None
            }
            ModifierState::Hold => {
                let mut keys = self.keys.clone();
                keys.push(token.to_string());
                Some(ClientMessage::Combo { keys })
            }
            ModifierState::Release => None,
        }
    }
}
