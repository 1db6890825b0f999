//! JSON message types for the remote-input control channel.
//!
//! Every frame on the wire is one UTF-8 JSON object with a `"type"` field
//! that identifies the variant. All other fields are flattened into the same
//! object, for example:
//!
//! ```json
//! {"type":"move","dx":3.5,"dy":-1}
//! {"type":"combo","keys":["ctrl","shift","k"]}
//! {"type":"clipboard-content","text":"hello"}
//! ```
//!
//! Serde's `#[serde(tag = "type")]` attribute handles this automatically.
//!
//! # Two directions, two enums
//!
//! The remote sends input and heartbeat probes ([`ClientMessage`]); the host
//! only ever answers with heartbeat echoes and clipboard contents
//! ([`ServerMessage`]). Keeping the directions apart makes it a compile-time
//! error to send a host-only message from the remote, and vice versa.
//!
//! # Forward compatibility
//!
//! Both enums carry an `Unknown` variant marked `#[serde(other)]`. A frame
//! whose `type` is not recognised decodes to `Unknown` instead of failing, and
//! every consumer treats `Unknown` as a no-op.

use serde::{Deserialize, Serialize};

// ── Shared field enums ────────────────────────────────────────────────────────

/// Pointer button named in a `click` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Direction of an abstract swipe gesture.
///
/// The direction describes the finger movement on the remote; the host picks
/// the window-management chord for it (see [`crate::gesture`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl SwipeDirection {
    /// All four directions, in table order.
    pub const ALL: [SwipeDirection; 4] = [
        SwipeDirection::Left,
        SwipeDirection::Right,
        SwipeDirection::Up,
        SwipeDirection::Down,
    ];
}

/// Clipboard operation requested by the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardAction {
    Copy,
    Paste,
}

// ── Remote → Host ─────────────────────────────────────────────────────────────

/// All messages the remote can send to the host.
///
/// # Serde representation
///
/// ```json
/// {"type":"click","button":"left","press":true}
/// {"type":"scroll","dy":5}
/// {"type":"ping","timestamp":1718000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Relative pointer motion, in host pixels.
    Move { dx: f64, dy: f64 },

    /// Press (`press = true`) or release of a pointer button.
    ///
    /// A click is two messages: the remote sends the press and schedules the
    /// release itself. The host never pairs them.
    Click {
        button: MouseButton,
        #[serde(default)]
        press: bool,
    },

    /// Scroll deltas. Either axis may be absent.
    Scroll {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dx: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dy: Option<f64>,
    },

    /// A single symbolic key (`"enter"`, `"pgdn"`) or a literal character.
    Key { key: String },

    /// Literal text to type verbatim.
    Text { text: String },

    /// An ordered chord: every key is pressed in order, then all released.
    Combo { keys: Vec<String> },

    /// Window-management swipe gesture.
    Swipe { direction: SwipeDirection },

    /// Heartbeat probe. The host echoes `timestamp` back in a `pong`.
    ///
    /// The timestamp is the remote's wall clock in milliseconds since the
    /// Unix epoch; only the remote interprets it.
    Ping { timestamp: f64 },

    /// Clipboard copy, or paste of optional `text`.
    Clipboard {
        action: ClipboardAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },

    /// Any `type` this build does not know. Always a no-op.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Returns the wire `type` name of this message.
    ///
    /// Used in log lines so that typed text and clipboard contents are never
    /// written to the log.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::Move { .. } => "move",
            ClientMessage::Click { .. } => "click",
            ClientMessage::Scroll { .. } => "scroll",
            ClientMessage::Key { .. } => "key",
            ClientMessage::Text { .. } => "text",
            ClientMessage::Combo { .. } => "combo",
            ClientMessage::Swipe { .. } => "swipe",
            ClientMessage::Ping { .. } => "ping",
            ClientMessage::Clipboard { .. } => "clipboard",
            ClientMessage::Unknown => "unknown",
        }
    }
}

// ── Host → Remote ─────────────────────────────────────────────────────────────

/// All messages the host sends back to the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Echo of a `ping` timestamp, unchanged.
    Pong { timestamp: f64 },

    /// Text read from the host clipboard after a `clipboard{copy}`.
    ClipboardContent { text: String },

    /// Any `type` this build does not know. Always a no-op.
    #[serde(other)]
    Unknown,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
