//! Authentication service
//!
//! Orchestrates the credential and session lifecycle: registration,
//! login, refresh-token rotation, logout, and password changes. The
//! store is the only synchronization point; no lock is held while the
//! password hasher runs.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::config::AuthConfig;
use crate::models::{
    Account, AccountResponse, AuthTokensResponse, NewAccount, RefreshTokensResponse,
    RegisterRequest,
};

use super::jwt::{
    self, account_id_from_sub, issue_access_token, issue_refresh_token, verify_refresh_token,
    TokenError,
};
use super::password::{hash_password, verify_password, PasswordError};
use super::store::{CredentialStore, StoreError};

/// Auth service errors
///
/// The refresh-specific kinds (`InvalidToken`, `TokenExpired`,
/// `TokenReused`) stay distinguishable here for logging; the HTTP layer
/// collapses them into one uniform response.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Username or email already exists")]
    Conflict,

    #[error("Account not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Refresh token is no longer current")]
    TokenReused,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AuthError::Conflict,
            StoreError::Timeout(msg) => AuthError::Unavailable(msg),
            StoreError::Database(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::EncodingFailed(msg) => AuthError::Internal(msg),
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        // A hashing failure is a deployment problem, not a client one.
        AuthError::Internal(e.to_string())
    }
}

/// Authentication service
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    config: AuthConfig,
}

impl AuthService {
    /// Create a new AuthService. Secrets and TTLs arrive here explicitly;
    /// nothing below this point reads the process environment.
    pub fn new(store: Arc<dyn CredentialStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Register a new account.
    pub async fn register(&self, req: RegisterRequest) -> Result<AccountResponse, AuthError> {
        req.validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let username = normalize_identifier(&req.username);
        let email = normalize_identifier(&req.email);

        // Hashing is deliberately expensive; do it before touching the
        // store so the Conflict race is decided by the insert itself.
        let password_hash = hash_password(&req.password)?;

        let account = self
            .store
            .create_account(NewAccount {
                username,
                email,
                full_name: req.full_name.trim().to_string(),
                password_hash,
            })
            .await?;

        tracing::info!(account_id = %account.id, username = %account.username, "account registered");
        Ok(account.into())
    }

    /// Log in with a username or email plus password. Issues a token
    /// pair and persists the refresh token, superseding any previous
    /// session for the account.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<AuthTokensResponse, AuthError> {
        let identifier = normalize_identifier(identifier);
        let account = self
            .store
            .find_by_identifier(&identifier)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !verify_password(password, &account.password_hash) {
            tracing::debug!(account_id = %account.id, "password verification failed");
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, refresh_token) = self.issue_token_pair(&account).await?;

        tracing::info!(account_id = %account.id, "login succeeded");
        Ok(AuthTokensResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl_seconds,
            account: account.into(),
        })
    }

    /// Rotate a refresh token: verify it cryptographically, check it is
    /// still the current one for the account, then atomically replace it
    /// with a fresh pair. A token that lost a rotation race, or was
    /// already rotated away, fails with `TokenReused`.
    pub async fn refresh(&self, presented: &str) -> Result<RefreshTokensResponse, AuthError> {
        let claims = verify_refresh_token(presented, &self.config.jwt_secret)?;
        let account_id = account_id_from_sub(&claims.sub)?;

        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let presented_digest = token_digest(presented);
        if !self
            .store
            .verify_current_refresh_token(account.id, &presented_digest)
            .await?
        {
            // Cryptographically intact but no longer current: rotation
            // already happened, or this is a replay.
            tracing::warn!(account_id = %account.id, "stale refresh token presented");
            return Err(AuthError::TokenReused);
        }

        let access_token = issue_access_token(
            &account,
            &self.config.jwt_secret,
            self.config.access_token_ttl_seconds,
        )?;
        let new_refresh_token = issue_refresh_token(
            &account,
            &self.config.jwt_secret,
            self.config.refresh_token_ttl_seconds,
        )?;
        let new_digest = token_digest(&new_refresh_token);

        // CAS against the presented value: of two requests racing with
        // the same token, exactly one lands this write.
        let rotated = self
            .store
            .swap_refresh_token(account.id, Some(&presented_digest), Some(&new_digest))
            .await?;
        if !rotated {
            tracing::warn!(account_id = %account.id, "lost refresh rotation race");
            return Err(AuthError::TokenReused);
        }

        tracing::info!(account_id = %account.id, "refresh token rotated");
        Ok(RefreshTokensResponse {
            access_token,
            refresh_token: new_refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl_seconds,
        })
    }

    /// Log out: clear the persisted refresh token. Idempotent.
    pub async fn logout(&self, account_id: Uuid) -> Result<(), AuthError> {
        self.store.set_refresh_token(account_id, None).await?;
        tracing::info!(%account_id, "logged out");
        Ok(())
    }

    /// Change the account password after re-verifying the old one.
    /// Outstanding access tokens expire naturally; the refresh session
    /// is left untouched.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !verify_password(old_password, &account.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = hash_password(new_password)?;
        self.store.update_password_hash(account.id, &new_hash).await?;

        tracing::info!(%account_id, "password changed");
        Ok(())
    }

    /// Fetch an account by id, sanitized.
    pub async fn get_account(&self, account_id: Uuid) -> Result<AccountResponse, AuthError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        Ok(account.into())
    }

    /// Verify an access token and resolve its account. Used by the
    /// authentication gate.
    pub async fn authenticate(&self, token: &str) -> Result<Account, AuthError> {
        let claims = jwt::verify_access_token(token, &self.config.jwt_secret)?;
        let account_id = account_id_from_sub(&claims.sub)?;
        self.store
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::NotFound)
    }

    async fn issue_token_pair(&self, account: &Account) -> Result<(String, String), AuthError> {
        let access_token = issue_access_token(
            account,
            &self.config.jwt_secret,
            self.config.access_token_ttl_seconds,
        )?;
        let refresh_token = issue_refresh_token(
            account,
            &self.config.jwt_secret,
            self.config.refresh_token_ttl_seconds,
        )?;

        let digest = token_digest(&refresh_token);
        self.store
            .set_refresh_token(account.id, Some(&digest))
            .await?;

        Ok((access_token, refresh_token))
    }
}

/// Canonical identifier form: trimmed and lowercased. Applied uniformly
/// at registration and lookup so username/email uniqueness is
/// case-insensitive.
fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Digest of a refresh token for storage. The raw token never touches
/// the store; a leaked accounts table cannot be replayed.
fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-key".to_string(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_seconds: 7 * 24 * 60 * 60,
        }
    }

    fn test_service() -> AuthService {
        AuthService::new(Arc::new(MemoryCredentialStore::new()), test_config())
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            full_name: "Alice Example".to_string(),
            password: "Secret1!".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_sanitizes_response() {
        let service = test_service();
        let account = service.register(alice()).await.unwrap();
        assert_eq!(account.username, "alice");
        assert_eq!(account.email, "alice@x.com");
        // AccountResponse has no password or refresh token fields at all;
        // nothing further to strip.
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let service = test_service();
        let result = service
            .register(RegisterRequest {
                username: "al".to_string(),
                email: "not-an-email".to_string(),
                full_name: String::new(),
                password: "short".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_case_insensitive() {
        let service = test_service();
        service.register(alice()).await.unwrap();

        let result = service
            .register(RegisterRequest {
                username: "alice2".to_string(),
                email: "ALICE@X.COM".to_string(),
                full_name: "Alice Two".to_string(),
                password: "Secret1!".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::Conflict)));
    }

    #[tokio::test]
    async fn test_login_unknown_identifier() {
        let service = test_service();
        let result = service.login("nobody", "Secret1!").await;
        assert!(matches!(result, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let service = test_service();
        service.register(alice()).await.unwrap();
        let result = service.login("alice", "WrongPass1!").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_by_email_and_mixed_case() {
        let service = test_service();
        service.register(alice()).await.unwrap();

        assert!(service.login("alice@x.com", "Secret1!").await.is_ok());
        assert!(service.login("  ALICE  ", "Secret1!").await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rotation_invalidates_predecessor() {
        let service = test_service();
        service.register(alice()).await.unwrap();
        let tokens = service.login("alice", "Secret1!").await.unwrap();

        let rotated = service.refresh(&tokens.refresh_token).await.unwrap();
        assert_ne!(rotated.access_token, tokens.access_token);
        assert_ne!(rotated.refresh_token, tokens.refresh_token);

        // The first refresh token is signed and unexpired, but it is no
        // longer the current one.
        let replay = service.refresh(&tokens.refresh_token).await;
        assert!(matches!(replay, Err(AuthError::TokenReused)));

        // The rotated token still works.
        assert!(service.refresh(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let service = test_service();
        service.register(alice()).await.unwrap();
        let tokens = service.login("alice", "Secret1!").await.unwrap();

        let result = service.refresh(&tokens.access_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_refresh_rejects_garbage_and_bad_signature() {
        let service = test_service();
        service.register(alice()).await.unwrap();
        service.login("alice", "Secret1!").await.unwrap();

        assert!(matches!(
            service.refresh("not.a.token").await,
            Err(AuthError::InvalidToken(_))
        ));

        let other = AuthService::new(
            Arc::new(MemoryCredentialStore::new()),
            AuthConfig {
                jwt_secret: "a-different-secret".to_string(),
                ..test_config()
            },
        );
        other.register(alice()).await.unwrap();
        let foreign = other.login("alice", "Secret1!").await.unwrap();
        assert!(matches!(
            service.refresh(&foreign.refresh_token).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_single_winner() {
        let store = Arc::new(MemoryCredentialStore::new());
        let service = Arc::new(AuthService::new(store, test_config()));
        service.register(alice()).await.unwrap();
        let tokens = service.login("alice", "Secret1!").await.unwrap();

        let s1 = Arc::clone(&service);
        let s2 = Arc::clone(&service);
        let r1 = tokens.refresh_token.clone();
        let r2 = tokens.refresh_token.clone();
        let t1 = tokio::spawn(async move { s1.refresh(&r1).await });
        let t2 = tokio::spawn(async move { s2.refresh(&r2).await });

        let a = t1.await.unwrap();
        let b = t2.await.unwrap();
        assert_eq!(
            a.is_ok() as u8 + b.is_ok() as u8,
            1,
            "exactly one concurrent refresh must succeed"
        );
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(AuthError::TokenReused)));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent_and_kills_refresh() {
        let service = test_service();
        let account = service.register(alice()).await.unwrap();
        let tokens = service.login("alice", "Secret1!").await.unwrap();

        service.logout(account.id).await.unwrap();
        service.logout(account.id).await.unwrap();

        let result = service.refresh(&tokens.refresh_token).await;
        assert!(matches!(result, Err(AuthError::TokenReused)));
    }

    #[tokio::test]
    async fn test_change_password() {
        let service = test_service();
        let account = service.register(alice()).await.unwrap();
        service.login("alice", "Secret1!").await.unwrap();

        let wrong = service
            .change_password(account.id, "WrongOld1!", "NewSecret1!")
            .await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        service
            .change_password(account.id, "Secret1!", "NewSecret1!")
            .await
            .unwrap();

        assert!(matches!(
            service.login("alice", "Secret1!").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(service.login("alice", "NewSecret1!").await.is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_access_token() {
        let service = test_service();
        service.register(alice()).await.unwrap();
        let tokens = service.login("alice", "Secret1!").await.unwrap();

        let account = service.authenticate(&tokens.access_token).await.unwrap();
        assert_eq!(account.username, "alice");

        // A refresh token is not a valid credential at the gate.
        assert!(service.authenticate(&tokens.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_login_supersedes_previous_session() {
        let service = test_service();
        service.register(alice()).await.unwrap();
        let first = service.login("alice", "Secret1!").await.unwrap();
        let _second = service.login("alice", "Secret1!").await.unwrap();

        // One live session per account: the first refresh token died
        // when the second login replaced it.
        assert!(matches!(
            service.refresh(&first.refresh_token).await,
            Err(AuthError::TokenReused)
        ));
    }
}
