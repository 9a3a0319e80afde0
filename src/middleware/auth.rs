//! Authentication gate
//!
//! Request-boundary extractor that verifies the bearer access token and
//! resolves the account before any handler runs. Downstream handlers
//! only ever see the sanitized identity context; the gate never exposes
//! the password hash or the stored refresh token, and it never attempts
//! a refresh on the caller's behalf.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthService;
use crate::error::ApiError;

/// Identity context for an authenticated request
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedAccount
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    tracing::debug!("missing or malformed Authorization header");
                    ApiError::authentication_failed().into_response()
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        // Missing account, bad signature, expiry: all one response.
        let account = auth_service
            .authenticate(bearer.token())
            .await
            .map_err(|e| {
                tracing::debug!(kind = %e, "access token rejected at gate");
                ApiError::authentication_failed().into_response()
            })?;

        Ok(AuthenticatedAccount {
            id: account.id,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
        })
    }
}
