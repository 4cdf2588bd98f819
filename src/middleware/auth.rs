//! Authentication middleware
//!
//! Extractors for bearer access tokens minted by [`AuthService`].

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::auth::{AuthError, AuthService, WalletAddress};
use crate::error::ApiError;
use crate::models::Role;
use crate::state::AdminWallets;

/// Wallet identity extracted from a valid access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub wallet_address: WalletAddress,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Extractor for authenticated wallets
///
/// Verifies the access token from the Authorization header. A missing
/// header and a refresh token presented here are both `INVALID_TOKEN`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, {}", user.wallet_address)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AuthError::InvalidToken(
                        "Authorization header with Bearer token required".to_string(),
                    )
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);
        let claims = auth_service.verify_access(bearer.token())?;
        let wallet_address = claims
            .subject()
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(AuthenticatedUser {
            wallet_address,
            role: claims.role,
            expires_at: claims.expires_at(),
        })
    }
}

/// Extractor that additionally requires the ADMIN role
///
/// The role claim alone is not enough: any wallet can request an ADMIN
/// challenge, so the wallet must also be listed in `ADMIN_WALLETS`.
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    AdminWallets: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if user.role != Role::Admin {
            tracing::warn!(wallet = %user.wallet_address, role = %user.role, "Admin access denied");
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }

        if !AdminWallets::from_ref(state).contains(&user.wallet_address) {
            tracing::warn!(wallet = %user.wallet_address, "Wallet not in admin allowlist");
            return Err(ApiError::Forbidden(
                "Wallet is not an administrator".to_string(),
            ));
        }

        Ok(AdminUser(user))
    }
}
