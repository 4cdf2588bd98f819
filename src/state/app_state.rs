//! Application state shared across handlers

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthService, WalletAddress};
use crate::ledger::LedgerGateway;

/// Wallets allowed to act as ADMIN; empty means nobody is
#[derive(Debug, Clone, Default)]
pub struct AdminWallets(Arc<HashSet<WalletAddress>>);

impl AdminWallets {
    pub fn new(wallets: impl IntoIterator<Item = WalletAddress>) -> Self {
        Self(Arc::new(wallets.into_iter().collect()))
    }

    pub fn contains(&self, wallet: &WalletAddress) -> bool {
        self.0.contains(wallet)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub admin_wallets: AdminWallets,
    /// Present when `LEDGER_RPC_URL` is configured
    pub ledger: Option<Arc<dyn LedgerGateway>>,
}

impl AppState {
    pub fn new(
        auth_service: Arc<AuthService>,
        admin_wallets: AdminWallets,
        ledger: Option<Arc<dyn LedgerGateway>>,
    ) -> Self {
        Self {
            auth_service,
            admin_wallets,
            ledger,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for AdminWallets {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.admin_wallets.clone()
    }
}
