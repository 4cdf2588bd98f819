//! Operator login client
//!
//! Signs in to a running wallet auth server with a locally held key and
//! prints the resulting tokens as JSON.
//!
//! Reads `AUTH_API_URL`, `WALLET_PRIVATE_KEY` and `AUTH_ROLE` from the
//! environment (or `.env`).

use anyhow::{bail, Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use wallet_auth_server::error::ErrorResponse;
use wallet_auth_server::models::{ChallengeResponse, LoginResponse, Role};
use wallet_auth_server::signer::WalletSigner;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let api_url = std::env::var("AUTH_API_URL")
        .unwrap_or_else(|_| "http://localhost:3001".to_string());
    let api_url = api_url.trim_end_matches('/');

    let private_key =
        std::env::var("WALLET_PRIVATE_KEY").context("WALLET_PRIVATE_KEY must be set")?;
    let role: Role = std::env::var("AUTH_ROLE")
        .unwrap_or_else(|_| Role::Admin.to_string())
        .parse()?;

    let signer = WalletSigner::from_hex(&private_key)?;
    let wallet = signer.address();
    tracing::info!(wallet = %wallet.to_checksum(), role = %role, "Requesting challenge");

    let client = Client::new();

    let challenge: ChallengeResponse = read_json(
        client
            .post(format!("{}/auth/challenge", api_url))
            .json(&json!({ "wallet_address": wallet.to_string(), "role": role }))
            .send()
            .await
            .context("challenge request failed")?,
    )
    .await?;

    tracing::info!(nonce = %challenge.nonce, expires_at = %challenge.expires_at, "Signing challenge");
    let signature = signer.sign_message(&challenge.message)?;

    let login: LoginResponse = read_json(
        client
            .post(format!("{}/auth/login", api_url))
            .json(&json!({
                "wallet_address": wallet.to_string(),
                "message": challenge.message,
                "signature": signature,
            }))
            .send()
            .await
            .context("login request failed")?,
    )
    .await?;

    tracing::info!(wallet = %login.identity.wallet_address, role = %login.identity.role, "Logged in");
    println!("{}", serde_json::to_string_pretty(&login)?);

    Ok(())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.context("unexpected response body");
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => bail!("{} {}: {}", status.as_u16(), err.error.code, err.error.message),
        Err(_) => bail!("{}: {}", status, body),
    }
}
