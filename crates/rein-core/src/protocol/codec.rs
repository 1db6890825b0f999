//! Frame encoding and decoding for the control channel.
//!
//! A frame is exactly one WebSocket text message holding one JSON object.
//! There is no length prefix or envelope; the WebSocket layer already
//! delimits messages.

use serde::Serialize;
use thiserror::Error;

use super::messages::{ClientMessage, ServerMessage};

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload is not valid JSON, lacks a `type` field, or a known
    /// message type has fields of the wrong shape.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Serializes a message into a text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if serialization fails. The message
/// types in this crate always serialize; the error exists for caller-supplied
/// `Serialize` impls.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

/// Decodes a text frame sent by the remote.
///
/// Unknown message types decode successfully to [`ClientMessage::Unknown`].
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] for anything that is not a
/// well-formed message. Callers drop such frames without replying.
pub fn decode_client_frame(text: &str) -> Result<ClientMessage, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Decodes a text frame sent by the host.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] for anything that is not a
/// well-formed message.
pub fn decode_server_frame(text: &str) -> Result<ServerMessage, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::SwipeDirection;

    #[test]
    fn test_encode_then_decode_client_frame_preserves_message() {
        // Arrange
        let msg = ClientMessage::Swipe { direction: SwipeDirection::Down };

        // Act
        let frame = encode_frame(&msg).unwrap();
        let decoded = decode_client_frame(&frame).unwrap();

        // Assert
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_client_frame_rejects_non_json() {
        let result = decode_client_frame("not json at all");
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_decode_client_frame_rejects_json_array() {
        assert!(decode_client_frame(r#"[{"type":"ping","timestamp":1}]"#).is_err());
    }

    #[test]
    fn test_decode_client_frame_rejects_empty_string() {
        assert!(decode_client_frame("").is_err());
    }

    #[test]
    fn test_decode_server_frame_accepts_pong() {
        let msg = decode_server_frame(r#"{"type":"pong","timestamp":42}"#).unwrap();
        assert_eq!(msg, ServerMessage::Pong { timestamp: 42.0 });
    }

    #[test]
    fn test_decode_server_frame_tolerates_unknown_type() {
        let msg = decode_server_frame(r#"{"type":"future-feature"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }

    #[test]
    fn test_non_finite_timestamp_does_not_survive_the_wire() {
        // serde_json writes NaN as `null`, which the peer then rejects.
        let frame = encode_frame(&ClientMessage::Ping { timestamp: f64::NAN }).unwrap();
        assert!(decode_client_frame(&frame).is_err());
    }

    #[test]
    fn test_malformed_error_message_mentions_frame() {
        let err = decode_client_frame("{").unwrap_err();
        assert!(err.to_string().starts_with("malformed frame"));
    }
}
