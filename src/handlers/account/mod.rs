mod devices;
mod heartbeat;
mod license;
mod plugins;

pub use devices::*;
pub use heartbeat::*;
pub use license::*;
pub use plugins::*;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::db::AppState;
use crate::middleware::account_auth;

/// Routes for signed-in accounts.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/heartbeat", post(heartbeat))
        .route("/license/validate", post(validate_license))
        .route("/download/verify", post(verify_download))
        .route("/download/plugin", post(download_plugin))
        .route("/devices", get(list_devices))
        .route("/devices/{fingerprint}", delete(remove_device))
        .layer(middleware::from_fn_with_state(state, account_auth))
}
