//! VideoTube Backend Server
//!
//! Boot sequence: load config, initialize tracing, connect the database
//! pool, run migrations, wire the auth service, serve.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use videotube_server::auth::{AuthService, PgCredentialStore};
use videotube_server::config::Config;
use videotube_server::db;
use videotube_server::routes::{auth_routes, health_routes};
use videotube_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing JWT secret or database URL is a deployment error; fail
    // the boot rather than limp along per-request.
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    let db_pool = db::create_pool(&config).await?;
    db::run_migrations(&db_pool).await?;

    let store = Arc::new(PgCredentialStore::new(db_pool.clone()));
    let auth_service = Arc::new(AuthService::new(store, config.auth.clone()));

    let state = AppState::new(auth_service, db_pool);

    let app = Router::new()
        .merge(health_routes())
        .merge(auth_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("VideoTube server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
