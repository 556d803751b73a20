mod auth;
mod chat;
mod checkout;
mod plugins;
mod stats;

pub use auth::*;
pub use chat::*;
pub use checkout::*;
pub use plugins::*;
pub use stats::*;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::db::AppState;
use crate::extractors::Json;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/plugins", get(list_plugins))
        .route(
            "/stats/downloads",
            get(get_download_stats).post(update_download_stats),
        )
        .route("/chat", get(get_chat_history).post(send_chat_message))
        .route("/checkout", post(create_checkout))
}
