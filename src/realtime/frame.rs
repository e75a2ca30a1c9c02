//! Socket frames and the inbound chat message format

use serde::Deserialize;

/// One transport frame. The text/binary distinction is preserved end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// `{"type":"error","message":...}` notice sent back to a client whose
    /// frame was dropped
    pub fn error_notice(message: &str) -> Self {
        Frame::Text(serde_json::json!({ "type": "error", "message": message }).to_string())
    }
}

/// Chat message as sent by clients over the socket
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    #[serde(alias = "chatID")]
    pub chat_id: i64,
    /// Ignored in favour of the authenticated principal unless it disagrees
    #[serde(default, alias = "senderID")]
    pub sender_id: Option<i64>,
    pub content: String,
}

impl InboundMessage {
    pub fn parse(frame: &Frame) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(frame.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snake_and_legacy_keys() {
        let snake = Frame::Text(r#"{"chat_id":4,"sender_id":2,"content":"hi"}"#.to_string());
        let legacy = Frame::Binary(br#"{"chatID":4,"senderID":2,"content":"hi"}"#.to_vec());

        let expected = InboundMessage {
            chat_id: 4,
            sender_id: Some(2),
            content: "hi".to_string(),
        };
        assert_eq!(InboundMessage::parse(&snake).unwrap(), expected);
        assert_eq!(InboundMessage::parse(&legacy).unwrap(), expected);
    }

    #[test]
    fn test_sender_is_optional() {
        let frame = Frame::Text(r#"{"chat_id":1,"content":"x"}"#.to_string());
        assert_eq!(InboundMessage::parse(&frame).unwrap().sender_id, None);
    }

    #[test]
    fn test_rejects_malformed() {
        for raw in ["", "hello", r#"{"chat_id":"one","content":"x"}"#, r#"{"content":"x"}"#] {
            assert!(InboundMessage::parse(&Frame::Text(raw.to_string())).is_err(), "{raw}");
        }
    }

    #[test]
    fn test_error_notice_shape() {
        let Frame::Text(text) = Frame::error_notice("nope") else {
            panic!("notice must be a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["message"], "nope");
    }
}
