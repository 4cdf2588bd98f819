//! Wallet Auth Server Library
//!
//! Challenge/response authentication for secp256k1 wallets: a server issues
//! a single-use challenge, the wallet signs it with `personal_sign`, and a
//! valid signature is exchanged for short-lived JWT sessions.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod signer;
pub mod state;
