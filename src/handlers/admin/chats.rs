use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::{ChatMessage, ChatSession, ChatSessionSummary};

#[derive(Debug, Serialize)]
pub struct ChatSessionListResponse {
    pub sessions: Vec<ChatSessionSummary>,
}

#[derive(Debug, Serialize)]
pub struct ChatThreadResponse {
    pub session: ChatSession,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatReplyRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReplyResponse {
    pub success: bool,
    pub message: ChatMessage,
}

/// GET /admin/chats - Sessions with unread counts, most recent first
pub async fn list_chat_sessions(State(state): State<AppState>) -> Result<Json<ChatSessionListResponse>> {
    let conn = state.db.get()?;
    Ok(Json(ChatSessionListResponse {
        sessions: queries::list_chat_sessions(&conn)?,
    }))
}

/// GET /admin/chats/{session_id} - Full thread; marks visitor messages read
pub async fn get_chat_thread(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ChatThreadResponse>> {
    let conn = state.db.get()?;
    let session = queries::get_chat_session(&conn, &session_id)?
        .ok_or_else(|| AppError::NotFound("Chat session not found".into()))?;

    let messages = queries::list_chat_messages(&conn, &session_id)?;
    queries::mark_chat_read(&conn, &session_id)?;

    Ok(Json(ChatThreadResponse { session, messages }))
}

/// POST /admin/chats/{session_id}/reply - Support reply to a visitor
pub async fn reply_to_chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(input): Json<ChatReplyRequest>,
) -> Result<Json<ChatReplyResponse>> {
    let message = input.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Message is required".into()));
    }

    let conn = state.db.get()?;
    let message = queries::append_support_message(&conn, &session_id, message, false)?;
    queries::mark_chat_read(&conn, &session_id)?;

    Ok(Json(ChatReplyResponse {
        success: true,
        message,
    }))
}
