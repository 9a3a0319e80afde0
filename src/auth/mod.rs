//! Authentication subsystem for VideoTube
//!
//! - Password hashing and verification (bcrypt)
//! - JWT access/refresh token generation and validation
//! - Credential storage with single-session refresh-token rotation

pub mod jwt;
mod password;
mod service;
pub mod store;

pub use jwt::{verify_access_token, AccessClaims, RefreshClaims, TokenError};
pub use password::{hash_password, verify_password, PasswordError};
pub use service::{AuthError, AuthService};
pub use store::{CredentialStore, MemoryCredentialStore, PgCredentialStore, StoreError};
