use std::env;

use crate::entitlements::PriceTable;

/// Secret used to sign session tokens when running in dev mode without `JWT_SECRET`.
const DEV_JWT_SECRET: &str = "omega-dev-secret-do-not-use-in-production";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub dev_mode: bool,
    jwt_secret: Option<String>,
    /// Emails that are always treated as admins (lowercased)
    pub admin_emails: Vec<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    /// SQLite busy timeout applied to every pooled connection
    pub db_busy_timeout_ms: u64,
    /// Timeout for outbound calls to Stripe and the email provider
    pub upstream_timeout_secs: u64,
    /// Requests per second allowed per client IP before rate limiting kicks in
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub prices: PriceTable,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("OMEGA_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url = env::var("BASE_URL")
            .or_else(|_| env::var("DOMAIN"))
            .unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let admin_emails = env::var("ADMIN_EMAILS")
            .map(|v| parse_email_list(&v))
            .unwrap_or_default();

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "omega.db".to_string()),
            base_url,
            dev_mode,
            jwt_secret: non_empty_var("JWT_SECRET"),
            admin_emails,
            stripe_secret_key: non_empty_var("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: non_empty_var("STRIPE_WEBHOOK_SECRET"),
            resend_api_key: non_empty_var("RESEND_API_KEY"),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "JARVIS Omega <noreply@jarvisassistant.online>".to_string()),
            db_busy_timeout_ms: parsed_var("DB_BUSY_TIMEOUT_MS", 5000),
            upstream_timeout_secs: parsed_var("UPSTREAM_TIMEOUT_SECS", 10),
            rate_limit_per_second: parsed_var("RATE_LIMIT_PER_SECOND", 1),
            rate_limit_burst: parsed_var("RATE_LIMIT_BURST", 30),
            prices: PriceTable::from_env(),
        }
    }

    /// Secret for signing session tokens. Only dev mode may run without one.
    pub fn jwt_secret(&self) -> Option<&str> {
        match &self.jwt_secret {
            Some(secret) => Some(secret),
            None if self.dev_mode => Some(DEV_JWT_SECRET),
            None => None,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Split a comma-separated list of emails, normalizing each one.
pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(crate::util::normalize_email)
        .filter(|e| !e.is_empty())
        .collect()
}
