//! Admin routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::admin;
use crate::state::AppState;

/// Create admin routes (ADMIN access token required)
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/challenges", get(admin::challenge_stats))
        .route("/admin/ledger/call", post(admin::ledger_call))
}
