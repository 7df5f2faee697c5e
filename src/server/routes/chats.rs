//! Chat endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::chat::{Conversation, SendOutcome};

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub title: Option<String>,
    pub initial_message: Option<String>,
}

/// POST /api/chats - create a conversation, optionally seeded with a first
/// user message
pub async fn create_chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateChatRequest>,
) -> Result<Json<Conversation>> {
    let conversation =
        state
            .db()
            .create_conversation(&user.id, request.title, request.initial_message)?;
    Ok(Json(conversation))
}

/// GET /api/chats - caller's conversations, newest first
pub async fn list_chats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Conversation>>> {
    Ok(Json(state.db().list_conversations(&user.id)?))
}

/// GET /api/chats/:id
pub async fn get_chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Conversation>> {
    state
        .db()
        .get_conversation(&user.id, &id)?
        .map(Json)
        .ok_or_else(|| Error::NotFound("conversation".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub meta: Option<serde_json::Value>,
}

/// POST /api/chats/:id/messages - append a user message and attempt a
/// grounded assistant reply. The response is a tagged outcome; a failed
/// reply still returns 200 with the unanswered turn preserved.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendOutcome>> {
    if request.content.trim().is_empty() {
        return Err(Error::InvalidInput("message content must not be empty".to_string()));
    }

    let outcome = state
        .chat_service()
        .send(&user.id, &id, &request.content, request.meta.as_ref())
        .await?;
    Ok(Json(outcome))
}

/// DELETE /api/chats/:id
pub async fn delete_chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    if !state.db().delete_conversation(&user.id, &id)? {
        return Err(Error::NotFound("conversation".to_string()));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}
