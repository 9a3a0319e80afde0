//! Credential store
//!
//! The store is the system of record and the only synchronization point
//! between concurrent request handlers. Refresh-token rotation goes
//! through a compare-and-set so two racing rotations resolve to exactly
//! one winner.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Account, NewAccount};

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Username or email already exists")]
    Conflict,

    #[error("Store timed out: {0}")]
    Timeout(String),

    #[error("Store error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
            sqlx::Error::PoolTimedOut => StoreError::Timeout(e.to_string()),
            _ => StoreError::Database(e.to_string()),
        }
    }
}

/// Durable account storage.
///
/// `set_refresh_token` and `swap_refresh_token` are the only mutators of
/// the revocation field. `swap_refresh_token` has compare-and-set
/// semantics; `set_refresh_token` is an unconditional single-record write
/// used by login (supersede) and logout (clear, idempotent).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an account by username or email. The identifier must
    /// already be case-normalized by the caller.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Create an account. A uniqueness violation raised by the storage
    /// layer itself maps to `Conflict`; that signal is authoritative
    /// under concurrent registration.
    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError>;

    /// Unconditionally replace (or clear, with `None`) the stored refresh
    /// token value for an account.
    async fn set_refresh_token(&self, id: Uuid, value: Option<&str>) -> Result<(), StoreError>;

    /// Compare-and-set the stored refresh token value. Returns `true`
    /// only if the stored value equaled `expected` at the moment of the
    /// write; under concurrent calls with the same `expected`, exactly
    /// one returns `true`.
    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: Option<&str>,
        new: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// True only if the stored value is non-null and equals `presented`.
    async fn verify_current_refresh_token(
        &self,
        id: Uuid,
        presented: &str,
    ) -> Result<bool, StoreError>;

    async fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError>;
}

// ============================================================================
// Postgres implementation
// ============================================================================

const ACCOUNT_COLUMNS: &str = "id, username, email, full_name, password_hash, current_refresh_token, created_at, updated_at";

/// Postgres-backed credential store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1 OR email = $1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        // Pre-check gives the common case a clean Conflict; the unique
        // constraint on the insert below is what actually guards races.
        if self.find_by_identifier(&new.username).await?.is_some()
            || self.find_by_identifier(&new.email).await?.is_some()
        {
            return Err(StoreError::Conflict);
        }

        let account = sqlx::query_as(&format!(
            r#"
            INSERT INTO accounts (id, username, email, full_name, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.full_name)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn set_refresh_token(&self, id: Uuid, value: Option<&str>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET current_refresh_token = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(value)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: Option<&str>,
        new: Option<&str>,
    ) -> Result<bool, StoreError> {
        // Single-statement CAS; the row update is atomic in Postgres.
        let rows_affected = sqlx::query(
            r#"
            UPDATE accounts
            SET current_refresh_token = $1, updated_at = NOW()
            WHERE id = $2 AND current_refresh_token IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(new)
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected == 1)
    }

    async fn verify_current_refresh_token(
        &self,
        id: Uuid,
        presented: &str,
    ) -> Result<bool, StoreError> {
        let stored: Option<Option<String>> =
            sqlx::query_scalar("SELECT current_refresh_token FROM accounts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(matches!(stored, Some(Some(ref s)) if s == presented))
    }

    async fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// In-memory credential store for tests and local development.
///
/// All mutations happen under one write lock, which gives the same
/// per-record atomicity the database provides.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.username == identifier || a.email == identifier)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        // Uniqueness check and insert under the same write lock, which is
        // what the unique constraint does for the Postgres store.
        let mut accounts = self.accounts.write().await;
        if accounts
            .values()
            .any(|a| a.username == new.username || a.email == new.email)
        {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            full_name: new.full_name,
            password_hash: new.password_hash,
            current_refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn set_refresh_token(&self, id: Uuid, value: Option<&str>) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.current_refresh_token = value.map(str::to_string);
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: Option<&str>,
        new: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&id) {
            Some(account) if account.current_refresh_token.as_deref() == expected => {
                account.current_refresh_token = new.map(str::to_string);
                account.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn verify_current_refresh_token(
        &self,
        id: Uuid,
        presented: &str,
    ) -> Result<bool, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .get(&id)
            .and_then(|a| a.current_refresh_token.as_deref())
            .map(|stored| stored == presented)
            .unwrap_or(false))
    }

    async fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.password_hash = hash.to_string();
            account.updated_at = Utc::now();
        }
        Ok(())
    }
}
