//! Trackpad facade.
//!
//! The gesture recogniser and on-screen keys call into [`Trackpad`]; it
//! shapes their callbacks into protocol messages, routes keys and text
//! through the [`ComboBuffer`], and hands the results to a [`MessageSink`].

use std::sync::Arc;
use std::time::Duration;

use rein_core::{ClientMessage, ClipboardAction, MouseButton, SwipeDirection};
use tokio::task::JoinHandle;

use crate::domain::{ComboBuffer, ModifierState};

/// Delay between the press and release halves of a tap click.
pub const CLICK_RELEASE_DELAY: Duration = Duration::from_millis(50);

/// Fire-and-forget outbound message channel.
#[cfg_attr(test, mockall::automock)]
pub trait MessageSink: Send + Sync {
    fn send(&self, msg: ClientMessage);
}

pub struct Trackpad {
    sink: Arc<dyn MessageSink>,
    combo: ComboBuffer,
}

impl Trackpad {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            sink,
            combo: ComboBuffer::new(),
        }
    }

    pub fn modifier_state(&self) -> ModifierState {
        self.combo.state()
    }

    pub fn staged_keys(&self) -> &[String] {
        self.combo.keys()
    }

    /// Pointer delta from the touch surface. Zero deltas are not sent.
    pub fn on_move(&self, dx: f64, dy: f64) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.sink.send(ClientMessage::Move { dx, dy });
    }

    /// Two-finger scroll delta. A zero axis is left out of the message.
    pub fn on_scroll(&self, dx: f64, dy: f64) {
        let dx = (dx != 0.0).then_some(dx);
        let dy = (dy != 0.0).then_some(dy);
        if dx.is_none() && dy.is_none() {
            return;
        }
        self.sink.send(ClientMessage::Scroll { dx, dy });
    }

    /// Sends a press now and the matching release after
    /// [`CLICK_RELEASE_DELAY`]. Must be called inside a tokio runtime.
    pub fn click(&self, button: MouseButton) -> JoinHandle<()> {
        self.sink.send(ClientMessage::Click { button, press: true });
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            tokio::time::sleep(CLICK_RELEASE_DELAY).await;
            sink.send(ClientMessage::Click { button, press: false });
        })
    }

    /// Named key from the soft keyboard or key grid.
    pub fn send_key(&mut self, key: &str) {
        let key = key.to_lowercase();
        if key.is_empty() || key == "unidentified" {
            return;
        }
        if let Some(msg) = self.combo.route_key(&key) {
            self.sink.send(msg);
        }
    }

    /// Text from the input field. A multi-character value is a composition
    /// or autocomplete result and gets a trailing space.
    pub fn send_text(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        let text = if value.chars().count() > 1 {
            format!("{value} ")
        } else {
            value.to_string()
        };
        if let Some(msg) = self.combo.route_text(&text) {
            self.sink.send(msg);
        }
    }

    pub fn swipe(&self, direction: SwipeDirection) {
        self.sink.send(ClientMessage::Swipe { direction });
    }

    pub fn toggle_modifier(&mut self) -> ModifierState {
        self.combo.toggle()
    }

    pub fn cancel_modifier(&mut self) {
        self.combo.cancel();
    }

    /// Asks the host to copy its selection and send the text back.
    pub fn copy(&self) {
        self.sink.send(ClientMessage::Clipboard {
            action: ClipboardAction::Copy,
            text: None,
        });
    }

    /// Pastes on the host, first replacing its clipboard with `text` if given.
    pub fn paste(&self, text: Option<String>) {
        self.sink.send(ClientMessage::Clipboard {
            action: ClipboardAction::Paste,
            text,
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use mockall::predicate::eq;

    use super::*;

    #[derive(Default)]
    struct CollectingSink {
        sent: Mutex<Vec<ClientMessage>>,
    }

    impl CollectingSink {
        fn sent(&self) -> Vec<ClientMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl MessageSink for CollectingSink {
        fn send(&self, msg: ClientMessage) {
            self.sent.lock().unwrap().push(msg);
        }
    }

    fn collecting() -> (Arc<CollectingSink>, Trackpad) {
        let sink = Arc::new(CollectingSink::default());
        let pad = Trackpad::new(sink.clone());
        (sink, pad)
    }

    #[test]
    fn test_on_move_forwards_delta() {
        // Arrange
        let mut sink = MockMessageSink::new();
        sink.expect_send()
            .with(eq(ClientMessage::Move { dx: 3.5, dy: -2.0 }))
            .times(1)
            .return_const(());
        let pad = Trackpad::new(Arc::new(sink));

        // Act
        pad.on_move(3.5, -2.0);
    }

    #[test]
    fn test_zero_move_and_scroll_are_not_sent() {
        let mut sink = MockMessageSink::new();
        sink.expect_send().never();
        let pad = Trackpad::new(Arc::new(sink));

        pad.on_move(0.0, 0.0);
        pad.on_scroll(0.0, 0.0);
    }

    #[test]
    fn test_on_scroll_omits_zero_axis() {
        let (sink, pad) = collecting();

        pad.on_scroll(0.0, 5.0);
        pad.on_scroll(-1.0, 0.0);

        assert_eq!(
            sink.sent(),
            vec![
                ClientMessage::Scroll { dx: None, dy: Some(5.0) },
                ClientMessage::Scroll { dx: Some(-1.0), dy: None },
            ]
        );
    }

    #[tokio::test]
    async fn test_click_presses_then_releases() {
        // Arrange
        let (sink, pad) = collecting();

        // Act
        let release = pad.click(MouseButton::Left);
        assert_eq!(sink.sent(), vec![ClientMessage::Click { button: MouseButton::Left, press: true }]);
        release.await.unwrap();

        // Assert
        assert_eq!(
            sink.sent(),
            vec![
                ClientMessage::Click { button: MouseButton::Left, press: true },
                ClientMessage::Click { button: MouseButton::Left, press: false },
            ]
        );
    }

    #[test]
    fn test_send_key_lowercases_and_skips_unidentified() {
        let (sink, mut pad) = collecting();

        pad.send_key("ArrowUp");
        pad.send_key("Unidentified");
        pad.send_key("");

        assert_eq!(sink.sent(), vec![ClientMessage::Key { key: "arrowup".into() }]);
    }

    #[test]
    fn test_send_text_single_char_has_no_suffix() {
        let (sink, mut pad) = collecting();
        pad.send_text("a");
        assert_eq!(sink.sent(), vec![ClientMessage::Text { text: "a".into() }]);
    }

    #[test]
    fn test_send_text_composition_gets_trailing_space() {
        let (sink, mut pad) = collecting();

        pad.send_text("hello");
        pad.send_text("é");

        assert_eq!(
            sink.sent(),
            vec![ClientMessage::Text { text: "hello ".into() }, ClientMessage::Text { text: "é".into() }]
        );
    }

    #[test]
    fn test_staged_chord_fires_on_final_key() {
        // Arrange
        let (sink, mut pad) = collecting();

        // Act: stage ctrl+shift, hold, then tap k
        assert_eq!(pad.toggle_modifier(), ModifierState::Active);
        pad.send_key("Control");
        pad.send_key("Shift");
        assert!(sink.sent().is_empty());
        assert_eq!(pad.toggle_modifier(), ModifierState::Hold);
        pad.send_text("k");

        // Assert
        assert_eq!(
            sink.sent(),
            vec![ClientMessage::Combo { keys: vec!["control".into(), "shift".into(), "k".into()] }]
        );
        assert_eq!(pad.staged_keys(), ["control", "shift"]);
    }

    #[test]
    fn test_cancel_modifier_returns_to_pass_through() {
        let (sink, mut pad) = collecting();
        pad.toggle_modifier();
        pad.send_key("alt");

        pad.cancel_modifier();
        pad.send_key("tab");

        assert_eq!(pad.modifier_state(), ModifierState::Release);
        assert_eq!(sink.sent(), vec![ClientMessage::Key { key: "tab".into() }]);
    }

    #[test]
    fn test_swipe_and_clipboard_messages() {
        let (sink, pad) = collecting();

        pad.swipe(SwipeDirection::Up);
        pad.copy();
        pad.paste(Some("from phone".into()));

        assert_eq!(
            sink.sent(),
            vec![
                ClientMessage::Swipe { direction: SwipeDirection::Up },
                ClientMessage::Clipboard { action: ClipboardAction::Copy, text: None },
                ClientMessage::Clipboard { action: ClipboardAction::Paste, text: Some("from phone".into()) },
            ]
        );
    }
}
