//! Integration tests for the rein-core public API.
//!
//! These tests decode frames exactly as the remote UI writes them and check
//! that the key table and gesture map agree with the decoded values.

use rein_core::{
    decode_client_frame, decode_server_frame, encode_frame, keymap, swipe_chord, ClientMessage,
    ClipboardAction, HostPlatform, Key, MouseButton, ServerMessage, SwipeDirection,
};

#[test]
fn test_browser_frames_decode_to_expected_messages() {
    let cases = [
        (r#"{"type":"move","dx":1.5,"dy":-2}"#, ClientMessage::Move { dx: 1.5, dy: -2.0 }),
        (
            r#"{"type":"click","button":"middle","press":true}"#,
            ClientMessage::Click { button: MouseButton::Middle, press: true },
        ),
        (r#"{"type":"key","key":"pgdn"}"#, ClientMessage::Key { key: "pgdn".into() }),
        (r#"{"type":"text","text":"hello "}"#, ClientMessage::Text { text: "hello ".into() }),
        (
            r#"{"type":"clipboard","action":"copy"}"#,
            ClientMessage::Clipboard { action: ClipboardAction::Copy, text: None },
        ),
    ];

    for (frame, expected) in cases {
        assert_eq!(decode_client_frame(frame).unwrap(), expected, "frame {frame}");
    }
}

#[test]
fn test_decoded_combo_keys_all_resolve() {
    let msg = decode_client_frame(r#"{"type":"combo","keys":["ctrl","alt","Delete"]}"#).unwrap();

    let keys = match msg {
        ClientMessage::Combo { keys } => keys,
        other => panic!("expected Combo, got {:?}", other),
    };
    let resolved: Vec<Key> = keys.iter().filter_map(|k| keymap::resolve(k)).collect();

    assert_eq!(resolved, vec![Key::LeftControl, Key::LeftAlt, Key::Delete]);
}

#[test]
fn test_decoded_swipe_maps_to_windows_chord() {
    let msg = decode_client_frame(r#"{"type":"swipe","direction":"up"}"#).unwrap();

    let direction = match msg {
        ClientMessage::Swipe { direction } => direction,
        other => panic!("expected Swipe, got {:?}", other),
    };

    assert_eq!(direction, SwipeDirection::Up);
    assert_eq!(
        swipe_chord(direction, HostPlatform::Windows),
        Some(&[Key::LeftSuper, Key::Tab][..])
    );
}

#[test]
fn test_pong_frame_written_by_host_is_read_by_remote() {
    let frame = encode_frame(&ServerMessage::Pong { timestamp: 1234.0 }).unwrap();
    assert_eq!(
        decode_server_frame(&frame).unwrap(),
        ServerMessage::Pong { timestamp: 1234.0 }
    );
}

#[test]
fn test_garbage_frames_are_errors_not_panics() {
    for frame in ["", "{", "null", "42", r#"{"type":"move"}"#] {
        assert!(decode_client_frame(frame).is_err(), "frame {frame:?} should fail");
    }
}
