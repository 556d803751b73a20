use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::error::Result;
use crate::models::*;

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Option<T>> {
    Ok(conn.query_row(sql, params, T::from_row).optional()?)
}

pub fn query_all<T: FromRow>(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, T::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub const ACCOUNT_COLS: &str = "id, name, email, password_hash, plan, trial_expires_at, max_devices, \
     stripe_customer_id, subscription_id, is_admin, created_at, updated_at, plan_updated_at, \
     last_login_at, last_active_at";

pub const DEVICE_COLS: &str = "id, account_id, fingerprint, name, registered_at, last_used_at";

pub const CHAT_MESSAGE_COLS: &str =
    "id, session_id, sender, message, is_auto_reply, read, created_at";

pub const CHAT_SESSION_COLS: &str =
    "session_id, email, status, last_page, created_at, last_message_at";

pub const USER_NOTE_COLS: &str = "id, account_id, note, created_by, created_at";

pub const CAMPAIGN_COLS: &str =
    "id, subject, message, target_plan, recipient_count, sent_by, sent_at, status";

/// Devices are loaded separately; `devices` starts empty.
impl FromRow for Account {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let plan_name: String = row.get(4)?;
        Ok(Account {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            plan: plan_name.parse().ok(),
            plan_name,
            trial_expires_at: row.get(5)?,
            max_devices: row.get(6)?,
            devices: Vec::new(),
            stripe_customer_id: row.get(7)?,
            subscription_id: row.get(8)?,
            is_admin: row.get::<_, i32>(9)? != 0,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
            plan_updated_at: row.get(12)?,
            last_login_at: row.get(13)?,
            last_active_at: row.get(14)?,
        })
    }
}

impl FromRow for Device {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Device {
            id: row.get(0)?,
            account_id: row.get(1)?,
            fingerprint: row.get(2)?,
            name: row.get(3)?,
            registered_at: row.get(4)?,
            last_used_at: row.get(5)?,
        })
    }
}

impl FromRow for ChatMessage {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let sender: String = row.get(2)?;
        Ok(ChatMessage {
            id: row.get(0)?,
            session_id: row.get(1)?,
            sender: sender.parse().unwrap_or(ChatSender::User),
            message: row.get(3)?,
            is_auto_reply: row.get::<_, i32>(4)? != 0,
            read: row.get::<_, i32>(5)? != 0,
            created_at: row.get(6)?,
        })
    }
}

impl FromRow for ChatSession {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ChatSession {
            session_id: row.get(0)?,
            email: row.get(1)?,
            status: row.get(2)?,
            last_page: row.get(3)?,
            created_at: row.get(4)?,
            last_message_at: row.get(5)?,
        })
    }
}

/// Expects `CHAT_SESSION_COLS` followed by message and unread counts.
impl FromRow for ChatSessionSummary {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ChatSessionSummary {
            session: ChatSession::from_row(row)?,
            message_count: row.get(6)?,
            unread_count: row.get(7)?,
        })
    }
}

impl FromRow for UserNote {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(UserNote {
            id: row.get(0)?,
            account_id: row.get(1)?,
            note: row.get(2)?,
            created_by: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl FromRow for EmailCampaign {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(EmailCampaign {
            id: row.get(0)?,
            subject: row.get(1)?,
            message: row.get(2)?,
            target_plan: row.get(3)?,
            recipient_count: row.get(4)?,
            sent_by: row.get(5)?,
            sent_at: row.get(6)?,
            status: row.get(7)?,
        })
    }
}

impl FromRow for RecentPluginDownload {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(RecentPluginDownload {
            plugin_id: row.get(0)?,
            downloaded_at: row.get(1)?,
            user_email: row.get(2)?,
        })
    }
}

impl FromRow for PluginDownloadCount {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(PluginDownloadCount {
            plugin_id: row.get(0)?,
            count: row.get(1)?,
        })
    }
}
