use chrono::{Duration, NaiveDate, Utc};
use rusqlite::{Connection, ErrorCode, TransactionBehavior, params, types::Value};
use uuid::Uuid;

use crate::entitlements::{
    AccountSelector, BillingOutcome, PlanChange, RegistrationDecision, RegistrationOutcome,
    decide_registration, default_device_name, trial_expiry_from,
};
use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{
    ACCOUNT_COLS, CAMPAIGN_COLS, CHAT_MESSAGE_COLS, CHAT_SESSION_COLS, DEVICE_COLS, USER_NOTE_COLS,
    query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builder for dynamic UPDATE statements with optional fields.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a column to an explicit value, NULL for `None`.
    fn set_nullable<V: Into<Value>>(mut self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.fields.push((column, v.into())),
            None => self.fields.push((column, Value::Null)),
        }
        self
    }

    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

// ============ Accounts ============

/// Create a trial account. The email must already be normalized.
pub fn create_account(conn: &Connection, input: &CreateAccount) -> Result<Account> {
    let id = gen_id();
    let now = now();
    let plan = Plan::Trial;
    let trial_expires_at = trial_expiry_from(now);

    conn.execute(
        "INSERT INTO accounts (id, name, email, password_hash, plan, trial_expires_at, max_devices,
                               created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            &id,
            &input.name,
            &input.email,
            &input.password_hash,
            plan.as_ref(),
            trial_expires_at,
            plan.max_devices(),
            now,
            now
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::BadRequest("An account with this email already exists".into())
        } else {
            e.into()
        }
    })?;

    Ok(Account {
        id,
        name: input.name.clone(),
        email: input.email.clone(),
        password_hash: input.password_hash.clone(),
        plan: Some(plan),
        plan_name: plan.to_string(),
        trial_expires_at: Some(trial_expires_at),
        max_devices: plan.max_devices(),
        devices: Vec::new(),
        stripe_customer_id: None,
        subscription_id: None,
        is_admin: false,
        created_at: now,
        updated_at: now,
        plan_updated_at: None,
        last_login_at: None,
        last_active_at: None,
    })
}

fn with_devices(conn: &Connection, account: Option<Account>) -> Result<Option<Account>> {
    match account {
        Some(mut account) => {
            account.devices = list_devices(conn, &account.id)?;
            Ok(Some(account))
        }
        None => Ok(None),
    }
}

pub fn get_account_by_id(conn: &Connection, id: &str) -> Result<Option<Account>> {
    let account = query_one(
        conn,
        &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLS),
        &[&id],
    )?;
    with_devices(conn, account)
}

pub fn get_account_by_email(conn: &Connection, email: &str) -> Result<Option<Account>> {
    let account = query_one(
        conn,
        &format!("SELECT {} FROM accounts WHERE email = ?1", ACCOUNT_COLS),
        &[&email],
    )?;
    with_devices(conn, account)
}

pub fn get_account_by_customer_id(conn: &Connection, customer_id: &str) -> Result<Option<Account>> {
    let account = query_one(
        conn,
        &format!(
            "SELECT {} FROM accounts WHERE stripe_customer_id = ?1",
            ACCOUNT_COLS
        ),
        &[&customer_id],
    )?;
    with_devices(conn, account)
}

fn get_account_by_selector(conn: &Connection, selector: &AccountSelector) -> Result<Option<Account>> {
    match selector {
        AccountSelector::Email(email) => get_account_by_email(conn, email),
        AccountSelector::CustomerId(customer_id) => get_account_by_customer_id(conn, customer_id),
    }
}

/// All accounts, newest first. Device lists are not loaded.
pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    query_all(
        conn,
        &format!("SELECT {} FROM accounts ORDER BY created_at DESC", ACCOUNT_COLS),
        &[],
    )
}

/// Case-insensitive substring match on email, at most 50 results.
pub fn search_accounts(conn: &Connection, query: &str) -> Result<Vec<Account>> {
    let escaped = query
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("%{}%", escaped);
    query_all(
        conn,
        &format!(
            "SELECT {} FROM accounts WHERE email LIKE ?1 ESCAPE '\\'
             ORDER BY created_at DESC LIMIT 50",
            ACCOUNT_COLS
        ),
        &[&pattern],
    )
}

pub fn delete_account(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn set_admin_by_email(conn: &Connection, email: &str) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE accounts SET is_admin = 1, updated_at = ?1 WHERE email = ?2",
        params![now(), email],
    )?;
    Ok(updated > 0)
}

pub fn record_login(conn: &Connection, id: &str) -> Result<()> {
    let now = now();
    UpdateBuilder::new("accounts", id)
        .set("last_login_at", now)
        .set("last_active_at", now)
        .execute(conn)?;
    Ok(())
}

pub fn touch_last_active(conn: &Connection, id: &str, at: i64) -> Result<bool> {
    UpdateBuilder::new("accounts", id)
        .set("last_active_at", at)
        .execute(conn)
}

pub fn set_password_reset(
    conn: &Connection,
    id: &str,
    token_hash: &str,
    expires_at: i64,
) -> Result<()> {
    UpdateBuilder::new("accounts", id)
        .set("reset_token_hash", token_hash.to_string())
        .set("reset_token_expires_at", expires_at)
        .with_updated_at()
        .execute(conn)?;
    Ok(())
}

/// Replace the password if the reset token matches and has not expired.
/// Clears the token either way it is consumed. Returns false on mismatch.
pub fn reset_password(
    conn: &Connection,
    email: &str,
    token_hash: &str,
    new_password_hash: &str,
) -> Result<bool> {
    let now = now();
    let updated = conn.execute(
        "UPDATE accounts
         SET password_hash = ?1, reset_token_hash = NULL, reset_token_expires_at = NULL,
             updated_at = ?2
         WHERE email = ?3 AND reset_token_hash = ?4 AND reset_token_expires_at > ?2",
        params![new_password_hash, now, email, token_hash],
    )?;
    Ok(updated > 0)
}

pub fn record_cancellation(conn: &Connection, id: &str, reason: &str) -> Result<()> {
    UpdateBuilder::new("accounts", id)
        .set("cancelled_at", now())
        .set("cancel_reason", reason.to_string())
        .execute(conn)?;
    Ok(())
}

// ============ Devices ============

pub fn list_devices(conn: &Connection, account_id: &str) -> Result<Vec<Device>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM devices WHERE account_id = ?1 ORDER BY registered_at, rowid",
            DEVICE_COLS
        ),
        &[&account_id],
    )
}

/// Register a device against the account's quota.
///
/// Runs in an IMMEDIATE transaction: the write lock is taken before the
/// device list is read, so concurrent registrations for the same account
/// serialize and cannot both pass the quota check.
pub fn register_device_atomic(
    conn: &mut Connection,
    account_id: &str,
    fingerprint: &str,
    name: Option<&str>,
) -> Result<RegistrationOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let max_devices: i64 = match tx.query_row(
        "SELECT max_devices FROM accounts WHERE id = ?1",
        params![account_id],
        |row| row.get(0),
    ) {
        Ok(max) => max,
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            return Err(AppError::NotFound("Account not found".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let devices = list_devices(&tx, account_id)?;

    match decide_registration(&devices, max_devices, fingerprint) {
        RegistrationDecision::AlreadyRegistered(device) => {
            Ok(RegistrationOutcome::AlreadyRegistered {
                device,
                devices_used: devices.len() as i64,
                max_devices,
            })
        }
        RegistrationDecision::LimitReached { current, max } => {
            Ok(RegistrationOutcome::LimitReached { current, max })
        }
        RegistrationDecision::Insert => {
            let now = now();
            let device = Device {
                id: gen_id(),
                account_id: account_id.to_string(),
                fingerprint: fingerprint.to_string(),
                name: default_device_name(name, devices.len()),
                registered_at: now,
                last_used_at: now,
            };

            tx.execute(
                "INSERT INTO devices (id, account_id, fingerprint, name, registered_at, last_used_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &device.id,
                    &device.account_id,
                    &device.fingerprint,
                    &device.name,
                    device.registered_at,
                    device.last_used_at
                ],
            )?;
            tx.commit()?;

            Ok(RegistrationOutcome::Registered {
                device,
                devices_used: devices.len() as i64 + 1,
                max_devices,
            })
        }
    }
}

pub fn remove_device(conn: &Connection, account_id: &str, fingerprint: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM devices WHERE account_id = ?1 AND fingerprint = ?2",
        params![account_id, fingerprint],
    )?;
    Ok(deleted > 0)
}

// ============ Plan transitions ============

/// Apply a plan change to the selected account.
///
/// Read and write happen inside one IMMEDIATE transaction. Nothing is written
/// when the account already holds the target state, so redelivered events
/// leave `updated_at` alone.
pub fn apply_plan_change(
    conn: &mut Connection,
    selector: &AccountSelector,
    change: &PlanChange,
    at: i64,
) -> Result<BillingOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let Some(account) = get_account_by_selector(&tx, selector)? else {
        return Ok(BillingOutcome::AccountNotFound);
    };

    let update = change.apply(&account, at);
    if update.matches(&account) {
        return Ok(BillingOutcome::Unchanged);
    }

    UpdateBuilder::new("accounts", &account.id)
        .set("plan", update.plan.to_string())
        .set("max_devices", update.max_devices)
        .set_nullable("trial_expires_at", update.trial_expires_at)
        .set_nullable("subscription_id", update.subscription_id.clone())
        .set_nullable("stripe_customer_id", update.customer_id.clone())
        .set_opt(
            "plan_updated_at",
            (account.plan != Some(update.plan)).then_some(at),
        )
        .with_updated_at()
        .execute(&tx)?;

    tx.commit()?;
    Ok(BillingOutcome::Applied(update))
}

// ============ Webhook dedup ============

pub fn webhook_event_recorded(conn: &Connection, provider: &str, event_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM webhook_events WHERE provider = ?1 AND event_id = ?2",
        params![provider, event_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Returns false if the event was already recorded.
pub fn try_record_webhook_event(conn: &Connection, provider: &str, event_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO webhook_events (id, provider, event_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![gen_id(), provider, event_id, now()],
    )?;
    Ok(affected > 0)
}

// ============ Admin analytics ============

fn count(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<i64> {
    Ok(conn.query_row(sql, params, |row| row.get(0))?)
}

pub fn count_accounts_by_plan(conn: &Connection, plan: Plan) -> Result<i64> {
    count(
        conn,
        "SELECT COUNT(*) FROM accounts WHERE plan = ?1",
        &[&plan.as_ref()],
    )
}

pub fn plan_counts(conn: &Connection, registered_since: i64) -> Result<PlanCounts> {
    Ok(PlanCounts {
        total_users: count(conn, "SELECT COUNT(*) FROM accounts", &[])?,
        free_users: count_accounts_by_plan(conn, Plan::Free)?,
        trial_users: count_accounts_by_plan(conn, Plan::Trial)?,
        pro_users: count_accounts_by_plan(conn, Plan::Pro)?,
        business_users: count_accounts_by_plan(conn, Plan::Business)?,
        lifetime_users: count_accounts_by_plan(conn, Plan::Lifetime)?,
        recent_registrations: count(
            conn,
            "SELECT COUNT(*) FROM accounts WHERE created_at >= ?1",
            &[&registered_since],
        )?,
    })
}

/// Pro and business accounts with a stored subscription.
pub fn count_active_subscriptions(conn: &Connection) -> Result<i64> {
    count(
        conn,
        "SELECT COUNT(*) FROM accounts
         WHERE plan IN ('pro', 'business') AND subscription_id IS NOT NULL",
        &[],
    )
}

pub fn count_recent_trials(conn: &Connection, since: i64) -> Result<i64> {
    count(
        conn,
        "SELECT COUNT(*) FROM accounts WHERE plan = 'trial' AND created_at >= ?1",
        &[&since],
    )
}

pub fn count_recent_conversions(conn: &Connection, since: i64) -> Result<i64> {
    count(
        conn,
        "SELECT COUNT(*) FROM accounts
         WHERE plan IN ('pro', 'business') AND plan_updated_at >= ?1",
        &[&since],
    )
}

pub fn count_active_accounts(conn: &Connection, since: i64) -> Result<i64> {
    count(
        conn,
        "SELECT COUNT(*) FROM accounts WHERE last_active_at >= ?1",
        &[&since],
    )
}

/// Emails for a campaign audience; `None` targets every account.
pub fn list_emails_for_plan(conn: &Connection, plan: Option<Plan>) -> Result<Vec<String>> {
    let emails = match plan {
        Some(plan) => {
            let mut stmt = conn.prepare("SELECT email FROM accounts WHERE plan = ?1 ORDER BY email")?;
            let rows = stmt.query_map(params![plan.as_ref()], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<String>>>()?
        }
        None => {
            let mut stmt = conn.prepare("SELECT email FROM accounts ORDER BY email")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<String>>>()?
        }
    };
    Ok(emails)
}

pub fn ping(conn: &Connection) -> Result<()> {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
    Ok(())
}

// ============ User notes ============

pub fn create_user_note(
    conn: &Connection,
    account_id: &str,
    note: &str,
    created_by: &str,
) -> Result<UserNote> {
    let note = UserNote {
        id: gen_id(),
        account_id: account_id.to_string(),
        note: note.to_string(),
        created_by: created_by.to_string(),
        created_at: now(),
    };
    conn.execute(
        "INSERT INTO user_notes (id, account_id, note, created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &note.id,
            &note.account_id,
            &note.note,
            &note.created_by,
            note.created_at
        ],
    )?;
    Ok(note)
}

pub fn list_user_notes(conn: &Connection, account_id: &str) -> Result<Vec<UserNote>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM user_notes WHERE account_id = ?1 ORDER BY created_at DESC, rowid DESC",
            USER_NOTE_COLS
        ),
        &[&account_id],
    )
}

// ============ Email campaigns ============

pub fn create_campaign(
    conn: &Connection,
    subject: &str,
    message: &str,
    target_plan: &str,
    recipient_count: i64,
    sent_by: &str,
) -> Result<EmailCampaign> {
    let campaign = EmailCampaign {
        id: gen_id(),
        subject: subject.to_string(),
        message: message.to_string(),
        target_plan: target_plan.to_string(),
        recipient_count,
        sent_by: sent_by.to_string(),
        sent_at: now(),
        status: "sent".to_string(),
    };
    conn.execute(
        "INSERT INTO email_campaigns (id, subject, message, target_plan, recipient_count,
                                      sent_by, sent_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            &campaign.id,
            &campaign.subject,
            &campaign.message,
            &campaign.target_plan,
            campaign.recipient_count,
            &campaign.sent_by,
            campaign.sent_at,
            &campaign.status
        ],
    )?;
    Ok(campaign)
}

/// Most recent 20 campaigns.
pub fn list_campaigns(conn: &Connection) -> Result<Vec<EmailCampaign>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM email_campaigns ORDER BY sent_at DESC, rowid DESC LIMIT 20",
            CAMPAIGN_COLS
        ),
        &[],
    )
}

// ============ Plugin downloads ============

pub fn record_plugin_download(
    conn: &Connection,
    account_id: &str,
    plugin_id: &str,
) -> Result<PluginDownload> {
    let download = PluginDownload {
        id: gen_id(),
        account_id: account_id.to_string(),
        plugin_id: plugin_id.to_string(),
        downloaded_at: now(),
    };
    conn.execute(
        "INSERT INTO plugin_downloads (id, account_id, plugin_id, downloaded_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            &download.id,
            &download.account_id,
            &download.plugin_id,
            download.downloaded_at
        ],
    )?;
    Ok(download)
}

pub fn count_plugin_downloads(conn: &Connection, since: Option<i64>) -> Result<i64> {
    count(
        conn,
        "SELECT COUNT(*) FROM plugin_downloads WHERE downloaded_at >= ?1",
        &[&since.unwrap_or(i64::MIN)],
    )
}

/// Download counts per plugin, most downloaded first, top 30.
pub fn plugin_download_counts(conn: &Connection) -> Result<Vec<PluginDownloadCount>> {
    query_all(
        conn,
        "SELECT plugin_id, COUNT(*) AS n FROM plugin_downloads
         GROUP BY plugin_id ORDER BY n DESC, plugin_id LIMIT 30",
        &[],
    )
}

/// Last 20 downloads with the downloader's email.
pub fn recent_plugin_downloads(conn: &Connection) -> Result<Vec<RecentPluginDownload>> {
    query_all(
        conn,
        "SELECT d.plugin_id, d.downloaded_at, COALESCE(a.email, 'Unknown')
         FROM plugin_downloads d LEFT JOIN accounts a ON a.id = d.account_id
         ORDER BY d.downloaded_at DESC, d.rowid DESC LIMIT 20",
        &[],
    )
}

// ============ Site download counters ============

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Total, `today`'s and the 7 days ending `today`.
pub fn get_download_stats(conn: &Connection, today: NaiveDate) -> Result<DownloadStats> {
    let total = count(
        conn,
        "SELECT COALESCE((SELECT count FROM download_totals WHERE id = 1), 0)",
        &[],
    )?;
    let daily = count(
        conn,
        "SELECT COALESCE((SELECT count FROM daily_downloads WHERE day = ?1), 0)",
        &[&day_key(today)],
    )?;
    let week_start = day_key(today - Duration::days(6));
    let weekly = count(
        conn,
        "SELECT COALESCE(SUM(count), 0) FROM daily_downloads WHERE day >= ?1 AND day <= ?2",
        &[&week_start, &day_key(today)],
    )?;

    Ok(DownloadStats {
        total_downloads: total,
        daily_downloads: daily,
        weekly_downloads: weekly,
    })
}

pub fn increment_downloads(conn: &mut Connection, today: NaiveDate) -> Result<DownloadStats> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO download_totals (id, count, updated_at) VALUES (1, 1, ?1)
         ON CONFLICT(id) DO UPDATE SET count = count + 1, updated_at = excluded.updated_at",
        params![now()],
    )?;
    tx.execute(
        "INSERT INTO daily_downloads (day, count) VALUES (?1, 1)
         ON CONFLICT(day) DO UPDATE SET count = count + 1",
        params![day_key(today)],
    )?;
    let stats = get_download_stats(&tx, today)?;
    tx.commit()?;
    Ok(stats)
}

/// Overwrite the total and the given per-day counters.
pub fn seed_download_stats(conn: &Connection, total: i64, days: &[(NaiveDate, i64)]) -> Result<()> {
    conn.execute(
        "INSERT INTO download_totals (id, count, updated_at) VALUES (1, ?1, ?2)
         ON CONFLICT(id) DO UPDATE SET count = excluded.count, updated_at = excluded.updated_at",
        params![total, now()],
    )?;
    for (day, count) in days {
        conn.execute(
            "INSERT INTO daily_downloads (day, count) VALUES (?1, ?2)
             ON CONFLICT(day) DO UPDATE SET count = excluded.count",
            params![day_key(*day), count],
        )?;
    }
    Ok(())
}

// ============ Live chat ============

pub fn get_chat_session(conn: &Connection, session_id: &str) -> Result<Option<ChatSession>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM chat_sessions WHERE session_id = ?1",
            CHAT_SESSION_COLS
        ),
        &[&session_id],
    )
}

/// Append a visitor message, opening the session on first contact.
pub fn append_user_message(
    conn: &Connection,
    session_id: &str,
    email: Option<&str>,
    page: Option<&str>,
    message: &str,
) -> Result<ChatMessage> {
    let now = now();
    conn.execute(
        "INSERT INTO chat_sessions (session_id, email, status, last_page, created_at, last_message_at)
         VALUES (?1, ?2, 'active', ?3, ?4, ?4)
         ON CONFLICT(session_id) DO UPDATE SET
             status = 'active', last_page = excluded.last_page,
             last_message_at = excluded.last_message_at",
        params![session_id, email.unwrap_or("Anonymous"), page, now],
    )?;
    insert_chat_message(conn, session_id, ChatSender::User, message, false, now)
}

/// Append a support message to an existing session.
pub fn append_support_message(
    conn: &Connection,
    session_id: &str,
    message: &str,
    is_auto_reply: bool,
) -> Result<ChatMessage> {
    let now = now();
    let updated = conn.execute(
        "UPDATE chat_sessions SET last_message_at = ?1 WHERE session_id = ?2",
        params![now, session_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound("Chat session not found".into()));
    }
    insert_chat_message(conn, session_id, ChatSender::Support, message, is_auto_reply, now)
}

fn insert_chat_message(
    conn: &Connection,
    session_id: &str,
    sender: ChatSender,
    message: &str,
    is_auto_reply: bool,
    at: i64,
) -> Result<ChatMessage> {
    let msg = ChatMessage {
        id: gen_id(),
        session_id: session_id.to_string(),
        sender,
        message: message.to_string(),
        is_auto_reply,
        read: false,
        created_at: at,
    };
    conn.execute(
        "INSERT INTO chat_messages (id, session_id, sender, message, is_auto_reply, read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        params![
            &msg.id,
            &msg.session_id,
            msg.sender.as_ref(),
            &msg.message,
            msg.is_auto_reply as i32,
            msg.created_at
        ],
    )?;
    Ok(msg)
}

pub fn list_chat_messages(conn: &Connection, session_id: &str) -> Result<Vec<ChatMessage>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM chat_messages WHERE session_id = ?1 ORDER BY created_at, rowid",
            CHAT_MESSAGE_COLS
        ),
        &[&session_id],
    )
}

/// Mark the visitor's messages in a session as read by support.
pub fn mark_chat_read(conn: &Connection, session_id: &str) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE chat_messages SET read = 1 WHERE session_id = ?1 AND sender = 'user' AND read = 0",
        params![session_id],
    )?)
}

/// Sessions with their message and unread counts, most recent activity first.
pub fn list_chat_sessions(conn: &Connection) -> Result<Vec<ChatSessionSummary>> {
    query_all(
        conn,
        &format!(
            "SELECT {},
                (SELECT COUNT(*) FROM chat_messages m WHERE m.session_id = s.session_id),
                (SELECT COUNT(*) FROM chat_messages m
                 WHERE m.session_id = s.session_id AND m.sender = 'user' AND m.read = 0)
             FROM chat_sessions s ORDER BY last_message_at DESC",
            CHAT_SESSION_COLS
        ),
        &[],
    )
}
