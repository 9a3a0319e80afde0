//! Authentication HTTP handlers
//!
//! Thin transport framing over the auth service; every failure arrives
//! here already classified and is mapped by `ApiError`.

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use super::AuthenticatedAccount;
use crate::error::ApiError;
use crate::models::{
    AccountResponse, AuthTokensResponse, ChangePasswordRequest, LoginRequest, RefreshTokenRequest,
    RefreshTokensResponse, RegisterRequest,
};
use crate::state::AppState;

/// POST /api/v1/auth/register - Create a new account
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let account = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// POST /api/v1/auth/login - Verify credentials and issue a token pair
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthTokensResponse>, ApiError> {
    let tokens = state
        .auth_service
        .login(&req.identifier, &req.password)
        .await?;
    Ok(Json(tokens))
}

/// POST /api/v1/auth/refresh - Rotate a refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshTokensResponse>, ApiError> {
    let tokens = state.auth_service.refresh(&req.refresh_token).await?;
    Ok(Json(tokens))
}

/// POST /api/v1/auth/logout - Invalidate the current refresh session
pub async fn logout(
    State(state): State<AppState>,
    account: AuthenticatedAccount,
) -> Result<StatusCode, ApiError> {
    state.auth_service.logout(account.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/change-password - Change the account password
pub async fn change_password(
    State(state): State<AppState>,
    account: AuthenticatedAccount,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    req.validate()?;
    state
        .auth_service
        .change_password(account.id, &req.old_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me - Current authenticated account
pub async fn get_current_account(
    State(state): State<AppState>,
    account: AuthenticatedAccount,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.auth_service.get_account(account.id).await?;
    Ok(Json(account))
}
