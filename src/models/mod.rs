//! Data models for the VideoTube backend

use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// Account model
///
/// Carries the password hash and the digest of the one live refresh
/// token. Never serialized directly; API responses go through
/// [`AccountResponse`].
#[derive(Debug, sqlx::FromRow, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub current_refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
            created_at: account.created_at,
        }
    }
}

/// Fields required to create a new account. The password arrives here
/// already hashed; the store never sees a plaintext.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
}
