//! Chat service
//!
//! Conversations and their message history for the REST surface. The
//! real-time gateway writes through `MessageRepository` directly.

use crate::db::repositories::{ChatRepository, MessageRepository, UserRepository};
use crate::db::StoreError;
use crate::models::{Chat, ChatSummary, ChatWithMessages, Message, NewMessage};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ChatServiceError {
    #[error("Chat not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Sender is not a participant of the chat
    #[error("User {sender_id} is not a participant of chat {chat_id}")]
    NotParticipant { chat_id: i64, sender_id: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ChatService {
    chats: Arc<dyn ChatRepository>,
    messages: Arc<dyn MessageRepository>,
    users: Arc<dyn UserRepository>,
}

impl ChatService {
    pub fn new(
        chats: Arc<dyn ChatRepository>,
        messages: Arc<dyn MessageRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            chats,
            messages,
            users,
        }
    }

    pub async fn list(&self) -> Result<Vec<Chat>, ChatServiceError> {
        Ok(self.chats.list().await?)
    }

    /// Chat with participants and full message history
    pub async fn get(&self, id: i64) -> Result<ChatWithMessages, ChatServiceError> {
        let chat = self
            .chats
            .get_by_id(id)
            .await?
            .ok_or(ChatServiceError::NotFound(id))?;
        let messages = self.messages.list_by_chat(id).await?;
        Ok(ChatWithMessages { chat, messages })
    }

    /// Create a chat between at least two distinct existing users
    pub async fn create(&self, participants: Vec<i64>) -> Result<Chat, ChatServiceError> {
        let mut members = participants;
        members.sort_unstable();
        members.dedup();

        if members.len() < 2 {
            return Err(ChatServiceError::ValidationError(
                "At least two participants are required".to_string(),
            ));
        }

        if self.users.count_existing(&members).await? != members.len() {
            return Err(ChatServiceError::ValidationError(
                "One or more users not found".to_string(),
            ));
        }

        let chat = self.chats.create(&members).await?;
        tracing::info!(chat_id = chat.id, participants = ?chat.participants, "Chat created");
        Ok(chat)
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        sender_id: i64,
        content: String,
    ) -> Result<Message, ChatServiceError> {
        if self.chats.get_by_id(chat_id).await?.is_none() {
            return Err(ChatServiceError::NotFound(chat_id));
        }

        match self
            .messages
            .create(&NewMessage::new(chat_id, sender_id, content))
            .await
        {
            Ok(message) => Ok(message),
            Err(StoreError::Constraint(_)) => Err(ChatServiceError::NotParticipant {
                chat_id,
                sender_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Dashboard entries for every chat `user_id` takes part in
    pub async fn summaries_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<ChatSummary>, ChatServiceError> {
        let chats = self.chats.list_for_user(user_id).await?;
        let mut summaries = Vec::with_capacity(chats.len());
        for chat in chats {
            let last_message = self
                .messages
                .last_in_chat(chat.id)
                .await?
                .map(|m| m.content);
            summaries.push(ChatSummary {
                id: chat.id,
                participants: chat.participants,
                last_message,
            });
        }
        Ok(summaries)
    }
}
