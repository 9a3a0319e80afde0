//! JWT token generation and validation
//!
//! Handles creation and verification of access and refresh tokens.
//! Access tokens carry the denormalized display fields; refresh tokens
//! carry the account id only.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Account;

/// JWT-related errors
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    Expired,

    #[error("Token signature is invalid")]
    BadSignature,

    #[error("Malformed token: {0}")]
    Malformed(String),
}

/// Token type marker embedded in every token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (account ID, string form)
    pub sub: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    /// JWT ID; makes every issued token unique
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    pub token_type: String,
}

/// Claims for refresh tokens: identity reference only
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: String,
}

/// Generate an access token for an account
pub fn issue_access_token(
    account: &Account,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = AccessClaims {
        sub: account.id.to_string(),
        username: account.username.clone(),
        email: account.email.clone(),
        full_name: account.full_name.clone(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        token_type: TokenType::Access.as_str().to_string(),
    };

    sign(&claims, secret)
}

/// Generate a refresh token for an account
pub fn issue_refresh_token(
    account: &Account,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = RefreshClaims {
        sub: account.id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        token_type: TokenType::Refresh.as_str().to_string(),
    };

    sign(&claims, secret)
}

fn sign<C: Serialize>(claims: &C, secret: &str) -> Result<String, TokenError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::EncodingFailed(e.to_string()))
}

/// Verify and decode an access token.
///
/// A cryptographically valid refresh token presented here is rejected as
/// malformed; the two classes are not interchangeable.
pub fn verify_access_token(token: &str, secret: &str) -> Result<AccessClaims, TokenError> {
    let claims: AccessClaims = verify(token, secret)?;
    check_not_expired(claims.exp)?;
    if claims.token_type != TokenType::Access.as_str() {
        return Err(TokenError::Malformed("expected access token".to_string()));
    }
    Ok(claims)
}

/// Verify and decode a refresh token.
pub fn verify_refresh_token(token: &str, secret: &str) -> Result<RefreshClaims, TokenError> {
    let claims: RefreshClaims = verify(token, secret)?;
    check_not_expired(claims.exp)?;
    if claims.token_type != TokenType::Refresh.as_str() {
        return Err(TokenError::Malformed("expected refresh token".to_string()));
    }
    Ok(claims)
}

/// Internal verification. The signature is checked before any claim;
/// expiry is checked by the callers, not here.
fn verify<C: DeserializeOwned>(token: &str, secret: &str) -> Result<C, TokenError> {
    let mut validation = Validation::default();
    // The crate's own exp validation keeps a token alive while
    // `exp == now`, so a zero-ttl token would survive its issuance
    // second. Expiry is enforced explicitly in check_not_expired.
    validation.validate_exp = false;

    decode::<C>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        _ => TokenError::Malformed(e.to_string()),
    })
}

/// A token is live strictly before its expiry instant: `exp <= now`
/// is expired, so `ttl = 0` is dead on the very next verification.
fn check_not_expired(exp: i64) -> Result<(), TokenError> {
    if exp <= Utc::now().timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(())
}

/// Extract the account ID from a token subject
pub fn account_id_from_sub(sub: &str) -> Result<Uuid, TokenError> {
    Uuid::parse_str(sub).map_err(|e| TokenError::Malformed(e.to_string()))
}
