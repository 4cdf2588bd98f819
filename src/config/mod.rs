//! Configuration management for the wallet auth server
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use thiserror::Error;

use crate::auth::WalletAddress;

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Rate limit: requests per second per IP
    pub rate_limit_rps: u32,

    /// CORS allowed origins
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// JWT secret for token signing
    pub jwt_secret: String,

    /// Access token TTL in seconds (default: 900 = 15 minutes)
    pub jwt_access_token_ttl_seconds: i64,

    /// Refresh token TTL in days (default: 7)
    pub jwt_refresh_token_ttl_days: i64,

    /// Auth nonce TTL in seconds (default: 300 = 5 minutes)
    pub auth_nonce_ttl_seconds: i64,

    /// How long expired challenges are kept before eviction (default: 3600)
    pub auth_nonce_retention_seconds: i64,

    /// Domain named in the challenge header line
    pub auth_domain: String,

    /// Interval between challenge sweeps in seconds (default: 60)
    pub challenge_sweep_seconds: u64,

    /// JSON-RPC endpoint of the ledger node, if any
    pub ledger_rpc_url: Option<String>,

    /// Wallets allowed to use ADMIN routes (`ADMIN_WALLETS`, comma-separated)
    pub admin_wallets: Vec<WalletAddress>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::from_str(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let rate_limit_rps = parse_or("RATE_LIMIT_RPS", 100u32);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").ok();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        // Production must never fall back to the development secret
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()))
            }
            _ => DEV_JWT_SECRET.to_string(),
        };

        let jwt_access_token_ttl_seconds = parse_or("JWT_ACCESS_TOKEN_TTL_SECONDS", 900i64);
        let jwt_refresh_token_ttl_days = parse_or("JWT_REFRESH_TOKEN_TTL_DAYS", 7i64);
        let auth_nonce_ttl_seconds = parse_or("AUTH_NONCE_TTL_SECONDS", 300i64);
        let auth_nonce_retention_seconds = parse_or("AUTH_NONCE_RETENTION_SECONDS", 3600i64);

        if auth_nonce_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "AUTH_NONCE_TTL_SECONDS must be positive".to_string(),
            ));
        }

        let auth_domain =
            env::var("AUTH_DOMAIN").unwrap_or_else(|_| "wallet-auth.local".to_string());
        if auth_domain.trim().is_empty() || auth_domain.contains('\n') {
            return Err(ConfigError::InvalidValue(format!(
                "Invalid AUTH_DOMAIN: '{}'",
                auth_domain
            )));
        }

        let challenge_sweep_seconds = parse_or("CHALLENGE_SWEEP_SECONDS", 60u64);

        let ledger_rpc_url = env::var("LEDGER_RPC_URL").ok().filter(|s| !s.is_empty());

        let admin_wallets = parse_admin_wallets(&env::var("ADMIN_WALLETS").unwrap_or_default())?;

        Ok(Config {
            environment,
            port,
            rate_limit_rps,
            cors_allowed_origins,
            log_level,
            jwt_secret,
            jwt_access_token_ttl_seconds,
            jwt_refresh_token_ttl_days,
            auth_nonce_ttl_seconds,
            auth_nonce_retention_seconds,
            auth_domain,
            challenge_sweep_seconds,
            ledger_rpc_url,
            admin_wallets,
        })
    }

    /// Whether the server is still running on the built-in development secret
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated list of wallet addresses, skipping blank entries
pub fn parse_admin_wallets(raw: &str) -> Result<Vec<WalletAddress>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            WalletAddress::parse(s).map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid ADMIN_WALLETS entry '{}': {}", s, e))
            })
        })
        .collect()
}
