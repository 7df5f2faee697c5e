//! Conversation and message types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a persisted message.
///
/// Role alternation is not enforced; a client may append two user messages
/// in a row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// An ordered sequence of messages belonging to one owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Messages in non-decreasing creation-time order
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Title derived from the first message when none was given
    pub fn derive_title(initial_message: &str) -> String {
        let trimmed = initial_message.trim();
        let mut title: String = trimmed.chars().take(60).collect();
        if title.len() < trimmed.len() {
            title.push('…');
        }
        if title.is_empty() {
            title = "New conversation".to_string();
        }
        title
    }
}

/// One turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    /// Free-form metadata supplied by the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Outcome of a send. The user message is always persisted; the assistant
/// reply is best-effort, and a failed reply is reported rather than swallowed
/// so the caller can decide to retry the completion.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    /// Both turns persisted
    Sent {
        user_message: Message,
        reply: Message,
    },
    /// User message persisted, completion failed; the conversation shows an
    /// unanswered turn
    SentButReplyFailed {
        user_message: Message,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_title_truncates_long_messages() {
        let long = "a".repeat(100);
        let title = Conversation::derive_title(&long);
        assert!(title.chars().count() <= 61);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn derive_title_keeps_short_messages() {
        assert_eq!(
            Conversation::derive_title("What is photosynthesis?"),
            "What is photosynthesis?"
        );
        assert_eq!(Conversation::derive_title("   "), "New conversation");
    }

    #[test]
    fn send_outcome_serializes_tagged() {
        let msg = Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            role: ChatRole::User,
            content: "hi".into(),
            meta: None,
            created_at: chrono::Utc::now(),
        };
        let outcome = SendOutcome::SentButReplyFailed {
            user_message: msg,
            reason: "completion error: timed out".into(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "sent_but_reply_failed");
        assert_eq!(value["reason"], "completion error: timed out");
    }
}
