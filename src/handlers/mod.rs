//! API handlers for the wallet auth server

pub mod admin;
pub mod auth;
mod health;

pub use admin::*;
pub use auth::*;
pub use health::health_check;

// Re-export extractors from middleware for handler use
pub use crate::middleware::auth::{AdminUser, AuthenticatedUser};
