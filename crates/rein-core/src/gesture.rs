//! Platform gesture map.
//!
//! Translates abstract swipe directions into the window-management chord
//! that produces the matching effect on each host platform. The mapping
//! follows the natural-scrolling convention: swiping the fingers left moves
//! to the desktop on the right.
//!
//! | direction | macOS        | Windows          |
//! |-----------|--------------|------------------|
//! | left      | Ctrl+Right   | Ctrl+Super+Right |
//! | right     | Ctrl+Left    | Ctrl+Super+Left  |
//! | up        | Ctrl+Up      | Super+Tab        |
//! | down      | Ctrl+Down    | Super+D          |
//!
//! Linux desktops have no single convention, so no chords are defined there.

use crate::keymap::Key;
use crate::platform::HostPlatform;
use crate::protocol::messages::SwipeDirection;

const MAC_LEFT: &[Key] = &[Key::LeftControl, Key::Right];
const MAC_RIGHT: &[Key] = &[Key::LeftControl, Key::Left];
const MAC_UP: &[Key] = &[Key::LeftControl, Key::Up];
const MAC_DOWN: &[Key] = &[Key::LeftControl, Key::Down];

const WIN_LEFT: &[Key] = &[Key::LeftControl, Key::LeftSuper, Key::Right];
const WIN_RIGHT: &[Key] = &[Key::LeftControl, Key::LeftSuper, Key::Left];
const WIN_UP: &[Key] = &[Key::LeftSuper, Key::Tab];
const WIN_DOWN: &[Key] = &[Key::LeftSuper, Key::Char('d')];

const MAC_COPY: &[Key] = &[Key::LeftSuper, Key::Char('c')];
const MAC_PASTE: &[Key] = &[Key::LeftSuper, Key::Char('v')];
const CTRL_COPY: &[Key] = &[Key::LeftControl, Key::Char('c')];
const CTRL_PASTE: &[Key] = &[Key::LeftControl, Key::Char('v')];

/// Returns the chord for `direction` on `platform`, in press order.
///
/// Returns `None` on platforms without a swipe convention.
pub fn swipe_chord(direction: SwipeDirection, platform: HostPlatform) -> Option<&'static [Key]> {
    match (platform, direction) {
        (HostPlatform::MacOs, SwipeDirection::Left) => Some(MAC_LEFT),
        (HostPlatform::MacOs, SwipeDirection::Right) => Some(MAC_RIGHT),
        (HostPlatform::MacOs, SwipeDirection::Up) => Some(MAC_UP),
        (HostPlatform::MacOs, SwipeDirection::Down) => Some(MAC_DOWN),
        (HostPlatform::Windows, SwipeDirection::Left) => Some(WIN_LEFT),
        (HostPlatform::Windows, SwipeDirection::Right) => Some(WIN_RIGHT),
        (HostPlatform::Windows, SwipeDirection::Up) => Some(WIN_UP),
        (HostPlatform::Windows, SwipeDirection::Down) => Some(WIN_DOWN),
        (HostPlatform::Linux | HostPlatform::Other, _) => None,
    }
}

/// Returns the copy-to-clipboard chord for `platform`.
pub fn copy_chord(platform: HostPlatform) -> &'static [Key] {
    match platform {
        HostPlatform::MacOs => MAC_COPY,
        _ => CTRL_COPY,
    }
}

/// Returns the paste-from-clipboard chord for `platform`.
pub fn paste_chord(platform: HostPlatform) -> &'static [Key] {
    match platform {
        HostPlatform::MacOs => MAC_PASTE,
        _ => CTRL_PASTE,
    }
}
