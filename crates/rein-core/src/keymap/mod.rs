//! Symbolic key names and the keys they resolve to.
//!
//! The remote UI emits lowercase names such as `"ctrl"`, `"pgdn"` or
//! `"audiovolup"`. The host resolves those names to [`Key`] values and hands
//! the result to its input backend, which maps each [`Key`] to whatever the
//! operating system expects.
//!
//! Two resolution entry points exist because single keys and chords treat
//! characters differently:
//!
//! - [`lookup`] consults only the named-key table. A `key` message whose
//!   name is not in the table but is a single character gets *typed*
//!   (preserving case and layout), not tapped.
//! - [`resolve`] falls back to [`Key::Char`] for single characters, which is
//!   what a chord like `["ctrl", "c"]` needs.

/// A key the host can press, release or tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    // Modifiers
    LeftControl,
    LeftShift,
    LeftAlt,
    /// Command on macOS, the Windows key elsewhere.
    LeftSuper,

    // Editing
    Enter,
    Escape,
    Backspace,
    Tab,
    Space,
    Delete,
    Insert,
    CapsLock,

    // Navigation
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    PrintScreen,

    // Function row
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    // Media
    AudioMute,
    AudioVolumeDown,
    AudioVolumeUp,
    AudioPrev,
    AudioNext,
    AudioPlay,
    AudioPause,

    /// A printable character, always stored lowercase when produced by
    /// [`resolve`].
    Char(char),
}

impl Key {
    /// Returns `true` for Control, Shift, Alt and Super.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Key::LeftControl | Key::LeftShift | Key::LeftAlt | Key::LeftSuper
        )
    }
}

/// Every name the remote may send, lowercase, with its key.
///
/// Aliases are listed next to each other; the first entry for a key is its
/// canonical name.
pub const NAMED_KEYS: &[(&str, Key)] = &[
    ("ctrl", Key::LeftControl),
    ("control", Key::LeftControl),
    ("shift", Key::LeftShift),
    ("alt", Key::LeftAlt),
    ("option", Key::LeftAlt),
    ("meta", Key::LeftSuper),
    ("super", Key::LeftSuper),
    ("cmd", Key::LeftSuper),
    ("command", Key::LeftSuper),
    ("win", Key::LeftSuper),
    ("enter", Key::Enter),
    ("return", Key::Enter),
    ("esc", Key::Escape),
    ("escape", Key::Escape),
    ("backspace", Key::Backspace),
    ("tab", Key::Tab),
    ("space", Key::Space),
    ("del", Key::Delete),
    ("delete", Key::Delete),
    ("insert", Key::Insert),
    ("capslock", Key::CapsLock),
    ("home", Key::Home),
    ("end", Key::End),
    ("pgup", Key::PageUp),
    ("pageup", Key::PageUp),
    ("pgdn", Key::PageDown),
    ("pagedown", Key::PageDown),
    ("up", Key::Up),
    ("arrowup", Key::Up),
    ("down", Key::Down),
    ("arrowdown", Key::Down),
    ("left", Key::Left),
    ("arrowleft", Key::Left),
    ("right", Key::Right),
    ("arrowright", Key::Right),
    ("printscreen", Key::PrintScreen),
    ("f1", Key::F1),
    ("f2", Key::F2),
    ("f3", Key::F3),
    ("f4", Key::F4),
    ("f5", Key::F5),
    ("f6", Key::F6),
    ("f7", Key::F7),
    ("f8", Key::F8),
    ("f9", Key::F9),
    ("f10", Key::F10),
    ("f11", Key::F11),
    ("f12", Key::F12),
    ("audiomute", Key::AudioMute),
    ("audiovoldown", Key::AudioVolumeDown),
    ("audiovolup", Key::AudioVolumeUp),
    ("audioprev", Key::AudioPrev),
    ("audionext", Key::AudioNext),
    ("audioplay", Key::AudioPlay),
    ("audiopause", Key::AudioPause),
];

/// Looks up `name` in the named-key table, ignoring ASCII case.
///
/// Returns `None` for anything not in [`NAMED_KEYS`], including single
/// characters.
pub fn lookup(name: &str) -> Option<Key> {
    let lowered = name.to_ascii_lowercase();
    NAMED_KEYS
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, key)| *key)
}

/// Resolves `name` for use inside a chord.
///
/// Tries [`lookup`] first, then accepts any single character as
/// [`Key::Char`] (lowercased, so `"C"` and `"c"` press the same key).
pub fn resolve(name: &str) -> Option<Key> {
    lookup(name).or_else(|| single_char(name).map(|c| Key::Char(lowercase_char(c))))
}

/// Returns the only character of `s`, or `None` if `s` has zero or several.
pub fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn lowercase_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        // Characters whose lowercase form expands (e.g. 'İ') stay as sent.
        _ => c,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
