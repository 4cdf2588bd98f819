//! Data models for the wallet auth server

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod auth;
pub mod ledger;
pub use auth::*;
pub use ledger::*;

/// Authorization class granted to a verified wallet
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Investor,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::Investor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Investor => "INVESTOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected role string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown role: '{0}'. Expected one of: ADMIN, INVESTOR")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ADMIN" => Ok(Role::Admin),
            "INVESTOR" => Ok(Role::Investor),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
