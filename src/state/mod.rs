mod app_state;

pub use app_state::{AdminWallets, AppState};
