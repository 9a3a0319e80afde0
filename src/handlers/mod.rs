//! API handlers for the VideoTube backend

pub mod auth;
pub mod health;

pub use auth::*;
pub use health::health_check;

// Re-export the gate extractor for handler use
pub use crate::middleware::auth::AuthenticatedAccount;
