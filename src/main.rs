use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::{Days, Utc};
use clap::{Parser, Subcommand};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use omega::config::Config;
use omega::db::{AppState, DbPool, create_pool, init_db, queries};
use omega::email::EmailService;
use omega::handlers;
use omega::jwt::SessionSigner;
use omega::payments::StripeClient;

#[derive(Parser, Debug)]
#[command(name = "omega")]
#[command(about = "JARVIS Omega account and licensing backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Grant admin to an existing account
    SetupAdmin {
        #[arg(long)]
        email: String,
    },
    /// Write starting values for the public download counters
    SeedStats {
        #[arg(long, default_value_t = 12847)]
        total: i64,
        #[arg(long, default_value_t = 234)]
        today: i64,
        /// Spread over the six days before today
        #[arg(long, default_value_t = 1856)]
        week: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "omega=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = open_database(&config)?;

    match Cli::parse().command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::SetupAdmin { email } => setup_admin(&pool, &email),
        Command::SeedStats { total, today, week } => seed_stats(&pool, total, today, week),
    }
}

fn open_database(config: &Config) -> anyhow::Result<DbPool> {
    let pool = create_pool(&config.database_path, config.db_busy_timeout_ms)
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;
    let conn = pool.get().context("Failed to get database connection")?;
    init_db(&conn).context("Failed to initialize database schema")?;
    Ok(pool)
}

async fn serve(config: Config, pool: DbPool) -> anyhow::Result<()> {
    let Some(jwt_secret) = config.jwt_secret() else {
        bail!("JWT_SECRET must be set (only OMEGA_ENV=dev may run without it)");
    };
    if config.dev_mode && std::env::var("JWT_SECRET").is_err() {
        tracing::warn!("Using the built-in development JWT secret");
    }

    let upstream_timeout = Duration::from_secs(config.upstream_timeout_secs);

    let stripe = config
        .stripe_secret_key
        .as_deref()
        .map(|key| StripeClient::new(key, upstream_timeout));
    if stripe.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY not set; checkout and billing admin are disabled");
    }
    if config.resend_api_key.is_none() {
        tracing::warn!("RESEND_API_KEY not set; password reset links will only be logged");
    }
    if config.prices.entries().is_empty() {
        tracing::warn!("No PRICE_* variables set; billing events will not change plans");
    }

    let state = AppState {
        db: pool,
        base_url: config.base_url.clone(),
        prices: Arc::new(config.prices.clone()),
        sessions: SessionSigner::new(jwt_secret),
        admin_emails: Arc::new(config.admin_emails.clone()),
        stripe,
        stripe_webhook_secret: config.stripe_webhook_secret.clone(),
        email: EmailService::new(
            config.resend_api_key.clone(),
            config.email_from.clone(),
            upstream_timeout,
        ),
    };

    let governor_config = GovernorConfigBuilder::default()
        .per_second(config.rate_limit_per_second)
        .burst_size(config.rate_limit_burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .context("Invalid rate limit configuration")?;

    // Per-IP limiter state grows with every new client; prune it periodically.
    let limiter = governor_config.limiter().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.retain_recent();
        }
    });

    let app = handlers::router(state)
        .layer(GovernorLayer::new(governor_config))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Omega server listening on {}", addr);
    tracing::info!("Public URL: {}", config.base_url);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

fn setup_admin(pool: &DbPool, email: &str) -> anyhow::Result<()> {
    let email = omega::util::normalize_email(email);
    let conn = pool.get()?;
    if !queries::set_admin_by_email(&conn, &email)? {
        bail!("No account found for {}. Register it first.", email);
    }
    tracing::info!("{} is now an admin", email);
    Ok(())
}

fn seed_stats(pool: &DbPool, total: i64, today: i64, week: i64) -> anyhow::Result<()> {
    let today_date = Utc::now().date_naive();
    let mut days = vec![(today_date, today)];

    // Spread the rest of the week evenly over the previous six days.
    let per_day = (week - today).max(0) / 6;
    for offset in 1..=6u64 {
        if let Some(day) = today_date.checked_sub_days(Days::new(offset)) {
            days.push((day, per_day));
        }
    }

    let conn = pool.get()?;
    queries::seed_download_stats(&conn, total, &days)?;
    tracing::info!(total, today, week, "Download stats seeded");
    Ok(())
}
