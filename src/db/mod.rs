mod from_row;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::email::EmailService;
use crate::entitlements::PriceTable;
use crate::jwt::SessionSigner;
use crate::payments::StripeClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Shared handles passed to every handler. Owned by the process entry point.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub base_url: String,
    pub prices: Arc<PriceTable>,
    pub sessions: SessionSigner,
    /// Emails that are admins regardless of the account flag (normalized)
    pub admin_emails: Arc<Vec<String>>,
    /// `None` when `STRIPE_SECRET_KEY` is not configured
    pub stripe: Option<StripeClient>,
    pub stripe_webhook_secret: Option<String>,
    pub email: EmailService,
}

impl AppState {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|e| e == email)
    }
}

/// Build a connection pool for `path`. Every connection gets the busy timeout
/// and foreign key enforcement.
pub fn create_pool(path: &str, busy_timeout_ms: u64) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
    });

    Pool::builder()
        .max_size(8)
        .connection_timeout(Duration::from_millis(busy_timeout_ms.max(1000)))
        .build(manager)
}

pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            plan TEXT NOT NULL,
            trial_expires_at INTEGER,
            max_devices INTEGER NOT NULL DEFAULT 1,
            stripe_customer_id TEXT,
            subscription_id TEXT,
            is_admin INTEGER NOT NULL DEFAULT 0,
            reset_token_hash TEXT,
            reset_token_expires_at INTEGER,
            cancelled_at INTEGER,
            cancel_reason TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            plan_updated_at INTEGER,
            last_login_at INTEGER,
            last_active_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_accounts_customer ON accounts(stripe_customer_id);
        CREATE INDEX IF NOT EXISTS idx_accounts_plan ON accounts(plan);

        CREATE TABLE IF NOT EXISTS devices (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            fingerprint TEXT NOT NULL,
            name TEXT NOT NULL,
            registered_at INTEGER NOT NULL,
            last_used_at INTEGER NOT NULL,
            UNIQUE(account_id, fingerprint)
        );
        CREATE INDEX IF NOT EXISTS idx_devices_account ON devices(account_id);

        CREATE TABLE IF NOT EXISTS plugin_downloads (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            plugin_id TEXT NOT NULL,
            downloaded_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_plugin_downloads_time ON plugin_downloads(downloaded_at);

        CREATE TABLE IF NOT EXISTS download_totals (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            count INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS daily_downloads (
            day TEXT PRIMARY KEY,
            count INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS chat_sessions (
            session_id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            last_page TEXT,
            created_at INTEGER NOT NULL,
            last_message_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chat_messages (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES chat_sessions(session_id) ON DELETE CASCADE,
            sender TEXT NOT NULL,
            message TEXT NOT NULL,
            is_auto_reply INTEGER NOT NULL DEFAULT 0,
            read INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chat_messages_session ON chat_messages(session_id, created_at);

        CREATE TABLE IF NOT EXISTS user_notes (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            note TEXT NOT NULL,
            created_by TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS email_campaigns (
            id TEXT PRIMARY KEY,
            subject TEXT NOT NULL,
            message TEXT NOT NULL,
            target_plan TEXT NOT NULL,
            recipient_count INTEGER NOT NULL,
            sent_by TEXT NOT NULL,
            sent_at INTEGER NOT NULL,
            status TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS webhook_events (
            id TEXT PRIMARY KEY,
            provider TEXT NOT NULL,
            event_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(provider, event_id)
        );
        "#,
    )
}
