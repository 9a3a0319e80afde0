//! VideoTube Backend Library
//!
//! Credential and session-token lifecycle core for the VideoTube
//! video-sharing platform, plus the HTTP framing around it.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
