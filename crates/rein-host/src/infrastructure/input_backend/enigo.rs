//! OS input injection through the `enigo` crate.
//!
//! `enigo` covers Windows (SendInput), macOS (CGEvent) and Linux (X11 or
//! libei). The `Enigo` handle is not reentrant, so every call goes through a
//! mutex; the session dispatch worker is serial anyway.

use std::sync::{Mutex, MutexGuard, PoisonError};

use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
use rein_core::{Key, MouseButton};
use tracing::info;

use crate::application::{BackendError, InputBackend};

/// Injects real pointer and keyboard input.
pub struct EnigoBackend {
    enigo: Mutex<Enigo>,
}

impl EnigoBackend {
    /// Connects to the platform input system.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Platform`] if the connection fails (for
    /// example no display server, or missing accessibility permission on
    /// macOS).
    pub fn new() -> Result<Self, BackendError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| BackendError::Platform(format!("failed to initialise enigo: {e}")))?;
        info!("enigo input backend ready");
        Ok(Self { enigo: Mutex::new(enigo) })
    }

    fn enigo(&self) -> MutexGuard<'_, Enigo> {
        self.enigo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(&self, key: Key, direction: Direction) -> Result<(), BackendError> {
        let mapped = to_enigo_key(key).ok_or(BackendError::UnsupportedKey(key))?;
        self.enigo().key(mapped, direction).map_err(platform)
    }
}

impl InputBackend for EnigoBackend {
    fn pointer_position(&self) -> Result<(i32, i32), BackendError> {
        self.enigo().location().map_err(platform)
    }

    fn move_pointer_to(&self, x: i32, y: i32) -> Result<(), BackendError> {
        self.enigo().move_mouse(x, y, Coordinate::Abs).map_err(platform)
    }

    fn press_button(&self, button: MouseButton) -> Result<(), BackendError> {
        self.enigo().button(to_enigo_button(button), Direction::Press).map_err(platform)
    }

    fn release_button(&self, button: MouseButton) -> Result<(), BackendError> {
        self.enigo().button(to_enigo_button(button), Direction::Release).map_err(platform)
    }

    fn scroll_vertical(&self, amount: i32) -> Result<(), BackendError> {
        self.enigo().scroll(amount, Axis::Vertical).map_err(platform)
    }

    fn scroll_horizontal(&self, amount: i32) -> Result<(), BackendError> {
        self.enigo().scroll(amount, Axis::Horizontal).map_err(platform)
    }

    fn key_down(&self, key: Key) -> Result<(), BackendError> {
        self.key(key, Direction::Press)
    }

    fn key_up(&self, key: Key) -> Result<(), BackendError> {
        self.key(key, Direction::Release)
    }

    fn tap_key(&self, key: Key) -> Result<(), BackendError> {
        self.key(key, Direction::Click)
    }

    fn type_text(&self, text: &str) -> Result<(), BackendError> {
        self.enigo().text(text).map_err(platform)
    }
}

fn platform(e: enigo::InputError) -> BackendError {
    BackendError::Platform(e.to_string())
}

fn to_enigo_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
        MouseButton::Middle => Button::Middle,
    }
}

fn to_enigo_key(key: Key) -> Option<enigo::Key> {
    use enigo::Key as E;

    let mapped = match key {
        Key::LeftControl => E::Control,
        Key::LeftShift => E::Shift,
        Key::LeftAlt => E::Alt,
        Key::LeftSuper => E::Meta,
        Key::Enter => E::Return,
        Key::Escape => E::Escape,
        Key::Backspace => E::Backspace,
        Key::Tab => E::Tab,
        Key::Space => E::Space,
        Key::Delete => E::Delete,
        Key::CapsLock => E::CapsLock,
        Key::Home => E::Home,
        Key::End => E::End,
        Key::PageUp => E::PageUp,
        Key::PageDown => E::PageDown,
        Key::Up => E::UpArrow,
        Key::Down => E::DownArrow,
        Key::Left => E::LeftArrow,
        Key::Right => E::RightArrow,
        Key::F1 => E::F1,
        Key::F2 => E::F2,
        Key::F3 => E::F3,
        Key::F4 => E::F4,
        Key::F5 => E::F5,
        Key::F6 => E::F6,
        Key::F7 => E::F7,
        Key::F8 => E::F8,
        Key::F9 => E::F9,
        Key::F10 => E::F10,
        Key::F11 => E::F11,
        Key::F12 => E::F12,
        Key::AudioMute => E::VolumeMute,
        Key::AudioVolumeDown => E::VolumeDown,
        Key::AudioVolumeUp => E::VolumeUp,
        Key::AudioPrev => E::MediaPrevTrack,
        Key::AudioNext => E::MediaNextTrack,
        Key::AudioPlay | Key::AudioPause => E::MediaPlayPause,
        #[cfg(not(target_os = "macos"))]
        Key::Insert => E::Insert,
        #[cfg(not(target_os = "macos"))]
        Key::PrintScreen => E::Print,
        #[cfg(target_os = "macos")]
        Key::Insert | Key::PrintScreen => return None,
        Key::Char(c) => E::Unicode(c),
    };
    Some(mapped)
}
