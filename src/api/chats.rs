//! Chat API endpoints
//!
//! - GET /api/v1/chats - List chats
//! - POST /api/v1/chats - Create a chat between existing users
//! - GET /api/v1/chats/{id} - Chat with its message history
//! - POST /api/v1/chats/{id}/messages - Store a message
//! - GET /api/v1/chats/ws - Chat socket (see `ws`)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::ws;
use crate::models::{Chat, ChatWithMessages};

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub participants: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(alias = "senderID")]
    pub sender_id: i64,
    pub content: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_chats).post(create_chat))
        .route("/ws", get(ws::chat_socket))
        .route("/{id}", get(get_chat))
        .route("/{id}/messages", post(send_message))
}

async fn list_chats(State(state): State<AppState>) -> Result<Json<Vec<Chat>>, ApiError> {
    Ok(Json(state.chat_service.list().await?))
}

async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ChatWithMessages>, ApiError> {
    Ok(Json(state.chat_service.get(id).await?))
}

async fn create_chat(
    State(state): State<AppState>,
    Json(body): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state.chat_service.create(body.participants).await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.content.trim().is_empty() {
        return Err(ApiError::validation_error("Message content is required"));
    }

    let message = state
        .chat_service
        .send_message(id, body.sender_id, body.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
