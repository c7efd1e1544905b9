//! Conversation messages consumed by the topic-flow pipeline.

use serde::{Deserialize, Serialize};

/// Role of the message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// User input
    User,
    /// Assistant response
    Assistant,
    /// System message
    System,
    /// Tool invocation or result
    Tool,
}

impl MessageRole {
    /// Whether messages with this role carry conversational content.
    pub fn is_conversational(&self) -> bool {
        matches!(self, MessageRole::User | MessageRole::Assistant)
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            "tool" => Ok(MessageRole::Tool),
            other => Err(format!("unknown message role: {}", other)),
        }
    }
}

/// A single conversation message.
///
/// Ids are assigned by the message source and strictly increase within
/// one owner's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Source-assigned id
    pub id: u64,
    /// Author role
    pub role: MessageRole,
    /// Message content
    pub text: String,
}

impl Message {
    /// Create a new message.
    pub fn new(id: u64, role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
        }
    }

    /// Shorthand for a user message.
    pub fn user(id: u64, text: impl Into<String>) -> Self {
        Self::new(id, MessageRole::User, text)
    }

    /// Shorthand for an assistant message.
    pub fn assistant(id: u64, text: impl Into<String>) -> Self {
        Self::new(id, MessageRole::Assistant, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!("User".parse::<MessageRole>().unwrap(), MessageRole::User);
        assert_eq!(" tool ".parse::<MessageRole>().unwrap(), MessageRole::Tool);
        assert!("robot".parse::<MessageRole>().is_err());
        assert_eq!(MessageRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_conversational_roles() {
        assert!(MessageRole::User.is_conversational());
        assert!(MessageRole::Assistant.is_conversational());
        assert!(!MessageRole::System.is_conversational());
        assert!(!MessageRole::Tool.is_conversational());
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::user(7, "How do I pin a node?");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        let decoded: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, msg);
    }
}
