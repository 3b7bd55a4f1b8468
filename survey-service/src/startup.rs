//! Application startup and lifecycle management.

use crate::config::SurveyConfig;
use crate::handlers;
use crate::services::{Database, GenerationClient};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::cors::cors_middleware;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::{request_id_middleware, REQUEST_ID_HEADER};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SurveyConfig>,
    pub db: Arc<Database>,
    pub generation: Arc<GenerationClient>,
}

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/submitSurvey", post(handlers::survey::submit_survey))
        .route(
            "/fire-alert",
            get(handlers::alert::fire_alert).post(handlers::alert::fire_alert),
        )
        .route(
            "/downloadAccess",
            get(handlers::download::download_database),
        )
        .route("/generate", post(handlers::generate::generate))
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Outermost, so the trace span sees the assigned id.
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Open the database, create the schema, and bind the listener.
    ///
    /// Port 0 binds a random port (used by tests).
    pub async fn build(config: SurveyConfig) -> Result<Self, AppError> {
        let db = Database::new(&config.database.path, config.database.max_connections)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to open SQLite database"))?;

        db.health_check()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Database did not answer ping"))?;

        db.create_schema()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to create schema"))?;

        let existing = db.count_surveys().await?;
        tracing::info!(surveys = existing, "Survey store opened");

        let generation = GenerationClient::new(&config.generation)?;
        tracing::info!(
            endpoint = %generation.endpoint(),
            model = %generation.model(),
            timeout_secs = config.generation.timeout.as_secs(),
            "Generation client configured"
        );

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Survey service listener bound");

        let state = AppState {
            config: Arc::new(config),
            db: Arc::new(db),
            generation: Arc::new(generation),
        };

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        tracing::info!(
            service = "survey-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
