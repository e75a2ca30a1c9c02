//! Chat (conversation) and message models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation between two or more users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    /// Participant user IDs, ascending
    pub participants: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participants.contains(&user_id)
    }
}

/// One unit of conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: i64,
    pub content: String,
    /// Assigned by the server when the message is stored
    pub created_at: DateTime<Utc>,
}

/// Message about to be stored
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: i64,
    pub sender_id: i64,
    pub content: String,
}

impl NewMessage {
    pub fn new(chat_id: i64, sender_id: i64, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            sender_id,
            content: content.into(),
        }
    }
}

/// Chat with its full history
#[derive(Debug, Clone, Serialize)]
pub struct ChatWithMessages {
    #[serde(flatten)]
    pub chat: Chat,
    pub messages: Vec<Message>,
}

/// Chat entry shown on a user's dashboard
#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    pub id: i64,
    pub participants: Vec<i64>,
    pub last_message: Option<String>,
}
