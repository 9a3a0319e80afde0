//! Middleware for the VideoTube API

pub mod auth;

pub use auth::AuthenticatedAccount;
