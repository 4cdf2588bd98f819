//! Wallet Auth Server
//!
//! HTTP front end for wallet challenge/response login, session refresh and
//! admin-gated ledger calls.

use axum::http::{header, HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use wallet_auth_server::auth::{AuthService, InMemoryNonceStore, SystemClock};
use wallet_auth_server::config::Config;
use wallet_auth_server::ledger::{JsonRpcLedger, LedgerGateway};
use wallet_auth_server::middleware::{self, RateLimiter};
use wallet_auth_server::routes;
use wallet_auth_server::state::{AdminWallets, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting wallet auth server");
    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set, using the development secret");
    }

    let store = Arc::new(InMemoryNonceStore::new());
    let auth_service = Arc::new(AuthService::new(
        store,
        Arc::new(SystemClock),
        config.auth_domain.clone(),
        &config.jwt_secret,
        config.auth_nonce_ttl_seconds,
        config.jwt_access_token_ttl_seconds,
        config.jwt_refresh_token_ttl_days,
    ));

    let ledger: Option<Arc<dyn LedgerGateway>> = match &config.ledger_rpc_url {
        Some(url) => {
            tracing::info!(rpc_url = %url, "Ledger gateway enabled");
            Some(Arc::new(JsonRpcLedger::new(url.clone())))
        }
        None => {
            tracing::info!("LEDGER_RPC_URL not set, ledger calls disabled");
            None
        }
    };

    let rate_limiter = RateLimiter::new(config.rate_limit_rps);

    // Start challenge sweeper in background
    let sweeper_service = auth_service.clone();
    let sweeper_limiter = rate_limiter.clone();
    let sweep_every = Duration::from_secs(config.challenge_sweep_seconds.max(1));
    let retention = chrono::Duration::seconds(config.auth_nonce_retention_seconds);
    tokio::spawn(async move {
        tracing::info!("Challenge sweeper task started");
        challenge_sweeper(sweeper_service, sweeper_limiter, sweep_every, retention).await;
    });

    let admin_wallets = AdminWallets::new(config.admin_wallets.iter().copied());
    if admin_wallets.is_empty() {
        tracing::warn!("ADMIN_WALLETS not set, admin routes will refuse every wallet");
    } else {
        tracing::info!(count = admin_wallets.len(), "Admin allowlist loaded");
    }

    let app_state = AppState::new(auth_service, admin_wallets, ledger);

    let mut app = routes::api_router(app_state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(axum::middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            middleware::rate_limit_layer(limiter)(req, next)
        }))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()));

    if config.environment.is_production() {
        app = app.layer(axum::middleware::from_fn(middleware::hsts_header));
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Periodically evict long-expired challenges and idle rate-limit buckets
async fn challenge_sweeper(
    auth_service: Arc<AuthService>,
    rate_limiter: RateLimiter,
    every: Duration,
    retention: chrono::Duration,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let purged = auth_service.purge_expired_challenges(retention);
        let idle = rate_limiter.cleanup(Duration::from_secs(300));

        if purged > 0 || idle > 0 {
            tracing::debug!(purged, idle_buckets = idle, "Sweep completed");
        }
    }
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
