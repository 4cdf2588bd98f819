//! Route definitions for the wallet auth API

mod admin;
mod auth;

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

pub use admin::admin_routes;
pub use auth::auth_routes;

/// Every API route, bound to shared state
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .merge(auth_routes())
        .merge(admin_routes())
        .with_state(state)
}

async fn root() -> &'static str {
    "Wallet Auth API Server"
}
