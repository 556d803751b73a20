use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::chat::auto_reply;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::models::ChatMessage;

/// Longest accepted visitor message, in characters.
const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct ChatHistoryQuery {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct SendChatRequest {
    pub session_id: String,
    pub email: Option<String>,
    pub message: String,
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendChatResponse {
    pub success: bool,
    pub message: ChatMessage,
    pub auto_reply: Option<ChatMessage>,
}

/// GET /chat?session_id= - Message history for a visitor session
pub async fn get_chat_history(
    State(state): State<AppState>,
    Query(query): Query<ChatHistoryQuery>,
) -> Result<Json<ChatHistoryResponse>> {
    let session_id = query.session_id.trim();
    if session_id.is_empty() {
        return Err(AppError::BadRequest("session_id is required".into()));
    }

    let conn = state.db.get()?;
    let messages = queries::list_chat_messages(&conn, session_id)?;

    Ok(Json(ChatHistoryResponse {
        session_id: session_id.to_string(),
        messages,
    }))
}

/// POST /chat - Visitor message, answered by an auto reply when one matches
pub async fn send_chat_message(
    State(state): State<AppState>,
    Json(input): Json<SendChatRequest>,
) -> Result<Json<SendChatResponse>> {
    let session_id = input.session_id.trim();
    let message = input.message.trim();
    if session_id.is_empty() || message.is_empty() {
        return Err(AppError::BadRequest("session_id and message are required".into()));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let email = input
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    let page = input.page.as_deref().filter(|p| !p.is_empty());

    let conn = state.db.get()?;
    let user_message = queries::append_user_message(&conn, session_id, email, page, message)?;

    let auto_reply = match auto_reply(message) {
        Some(reply) => Some(queries::append_support_message(&conn, session_id, &reply, true)?),
        None => None,
    };

    Ok(Json(SendChatResponse {
        success: true,
        message: user_message,
        auto_reply,
    }))
}
