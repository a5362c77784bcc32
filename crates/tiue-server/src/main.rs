//! TIUE mobile backend server
//!
//! Serves the directory proxy and the local university resources.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiue_api::AppState;
use tiue_core::config::AppConfig;
use tiue_db::{Database, SessionRepository};
use tiue_directory::DirectoryClient;

mod health;

use health::{HealthChecker, HealthConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        AppConfig::default()
    });

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        directory = %config.directory.base_url,
        "Starting TIUE mobile backend"
    );

    let directory = DirectoryClient::new(config.directory.clone())
        .map_err(|e| anyhow::anyhow!("directory client: {}", e))?;

    let db = connect_database(&config).await;

    let mut health_checker = HealthChecker::new(HealthConfig::default());
    if let Some(ref db) = db {
        health_checker = health_checker.with_database(db.clone());
    }

    let state = AppState::new(config.clone(), directory, db.map(|d| d.pool().clone()));
    let app = build_router(state, Arc::new(health_checker));

    let addr = config.server_addr();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,tiue_server=debug,tiue_api=debug,tower_http=debug".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Connect, migrate and drop expired sessions. `None` keeps the proxy running
/// without local resources.
async fn connect_database(config: &AppConfig) -> Option<Database> {
    let db = match Database::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::warn!("Failed to connect to database: {}. Running without database.", e);
            return None;
        }
    };
    info!("Connected to database");

    if let Err(e) = db.migrate().await {
        tracing::error!("Failed to apply migrations: {}. Running without database.", e);
        db.close().await;
        return None;
    }

    match SessionRepository::new(db.pool().clone()).purge_expired().await {
        Ok(purged) => info!(purged, "Expired sessions removed"),
        Err(e) => tracing::warn!(error = %e, "Failed to purge expired sessions"),
    }

    Some(db)
}

fn build_router(state: AppState, health: Arc<HealthChecker>) -> Router {
    let max_body_size = state.config.server.max_body_size_bytes;

    let health_routes = Router::new()
        .route("/health", get(health::readiness))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(health);

    Router::new()
        .merge(health_routes)
        .merge(tiue_api::router().with_state(state))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = AppConfig::default();
        let directory = DirectoryClient::new(config.directory.clone()).unwrap();
        let state = AppState::new(config, directory, None);
        build_router(state, Arc::new(HealthChecker::new(HealthConfig::default())))
    }

    async fn status_of(uri: &str) -> StatusCode {
        test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        assert_eq!(status_of("/health").await, StatusCode::OK);
        assert_eq!(status_of("/health/live").await, StatusCode::OK);
        assert_eq!(status_of("/health/ready").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_is_mounted() {
        assert_eq!(status_of("/api/auth/test").await, StatusCode::OK);
        assert_eq!(status_of("/api/auth/me").await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        assert_eq!(status_of("/api/v3").await, StatusCode::NOT_FOUND);
    }
}
