mod analytics;
mod campaigns;
mod chats;
mod users;

pub use analytics::*;
pub use campaigns::*;
pub use chats::*;
pub use users::*;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::db::AppState;
use crate::middleware::require_admin;

/// Dashboard routes. Every request re-checks admin status in storage.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(get_stats))
        .route("/admin/health", get(get_health))
        .route("/admin/plugins", get(get_plugin_analytics))
        .route("/admin/revenue", get(get_revenue))
        .route("/admin/subscriptions", get(get_subscriptions))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", delete(delete_user))
        .route("/admin/users/{id}/plan", put(update_user_plan))
        .route(
            "/admin/users/{id}/notes",
            get(list_user_notes).post(create_user_note),
        )
        .route(
            "/admin/users/{id}/cancel-subscription",
            post(cancel_user_subscription),
        )
        .route("/admin/campaigns", get(list_campaigns).post(create_campaign))
        .route("/admin/chats", get(list_chat_sessions))
        .route("/admin/chats/{session_id}", get(get_chat_thread))
        .route("/admin/chats/{session_id}/reply", post(reply_to_chat))
        .layer(middleware::from_fn_with_state(state, require_admin))
}
