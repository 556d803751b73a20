use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatSender {
    User,
    Support,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub sender: ChatSender,
    pub message: String,
    pub is_auto_reply: bool,
    pub read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub session_id: String,
    pub email: String,
    pub status: String,
    pub last_page: Option<String>,
    pub created_at: i64,
    pub last_message_at: i64,
}

/// Session listing row for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSessionSummary {
    #[serde(flatten)]
    pub session: ChatSession,
    pub message_count: i64,
    pub unread_count: i64,
}
