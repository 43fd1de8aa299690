use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Author of a chat message.
///
/// The wire values match the document format stored remotely and the roles
/// sent to the generation endpoint, so a single enum covers both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Ai,
}

/// Per-message user feedback. The only mutable field of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFeedback {
    ThumbsUp,
    ThumbsDown,
}

/// A single message inside a chat document.
///
/// Messages are append-only: once written, everything except `feedback` is
/// immutable. `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<MessageFeedback>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: now_millis(),
            feedback: None,
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            text: text.into(),
            timestamp: now_millis(),
            feedback: None,
        }
    }
}

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_values() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Ai).unwrap(), "\"ai\"");
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
    }

    #[test]
    fn feedback_field_is_optional_on_the_wire() {
        let msg = ChatMessage::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("feedback").is_none());

        // Documents written before feedback existed still deserialize
        let old: ChatMessage =
            serde_json::from_str(r#"{"role":"ai","text":"hi","timestamp":1}"#).unwrap();
        assert_eq!(old.feedback, None);
    }

    #[test]
    fn feedback_round_trips() {
        let mut msg = ChatMessage::ai("answer");
        msg.feedback = Some(MessageFeedback::ThumbsUp);
        let json = serde_json::to_string(&msg).unwrap();
        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.feedback, Some(MessageFeedback::ThumbsUp));
    }
}
