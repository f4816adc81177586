use super::errors::{ProtocolError, Result};
use super::messages::WsMessage;

/// Maximum allowed frame size (64 KiB). Larger frames are rejected before
/// they reach the JSON parser.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

fn check_size(len: usize) -> Result<()> {
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            actual: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(())
}

/// Serializes a message into a text frame.
///
/// # Errors
///
/// Fails if serialization fails or the frame would exceed
/// [`MAX_MESSAGE_SIZE`].
pub fn encode(message: &WsMessage) -> Result<String> {
    let text = serde_json::to_string(message).map_err(ProtocolError::Encode)?;
    check_size(text.len())?;
    Ok(text)
}

/// Parses a text frame.
///
/// # Errors
///
/// Fails on oversized frames, malformed JSON and unknown message or command
/// types.
pub fn decode(text: &str) -> Result<WsMessage> {
    check_size(text.len())?;
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::{Command, RoundState};

    #[test]
    fn test_encode_decode() {
        let message = WsMessage::state(RoundState::idle(7));
        let text = encode(&message).unwrap();
        assert_eq!(decode(&text).unwrap(), message);

        let message = WsMessage::command(Command::BuyIn { amount: 100 });
        let text = encode(&message).unwrap();
        assert!(text.contains(r#""type":"buyin""#));
        assert_eq!(decode(&text).unwrap(), message);
    }

    #[test]
    fn test_oversized_frame_is_rejected() {
        let padding = " ".repeat(MAX_MESSAGE_SIZE);
        let text = format!(r#"{{"type":"cmd","cmd":{{"type":"reset"}}}}{padding}"#);
        assert!(matches!(
            decode(&text),
            Err(ProtocolError::MessageTooLarge { max: MAX_MESSAGE_SIZE, .. })
        ));
    }

    #[test]
    fn test_malformed_frame_is_rejected() {
        assert!(matches!(decode("not json"), Err(ProtocolError::Decode(_))));
        assert!(matches!(decode(r#"{"cmd":{}}"#), Err(ProtocolError::Decode(_))));
    }
}
