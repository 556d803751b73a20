pub mod account;
pub mod admin;
pub mod public;
pub mod webhooks;

use axum::Router;

use crate::db::AppState;

/// Every route of the service, with state applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(public::router())
        .merge(webhooks::router())
        .merge(account::router(state.clone()))
        .merge(admin::router(state.clone()))
        .with_state(state)
}
