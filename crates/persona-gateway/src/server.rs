// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use persona_agent::{HumanLoopCorrelator, ResponseEngine, SubjectDirectory};
use persona_core::PersonaError;
use persona_ingest::JobRunner;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{handlers, stream};

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: Instant,
    /// Whether replies run without a provider.
    pub mock_mode: bool,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub subjects: Arc<SubjectDirectory>,
    pub engine: Arc<ResponseEngine>,
    pub correlator: Arc<HumanLoopCorrelator>,
    pub jobs: Arc<JobRunner>,
    pub health: HealthState,
}

impl AppState {
    pub fn new(
        subjects: Arc<SubjectDirectory>,
        engine: Arc<ResponseEngine>,
        correlator: Arc<HumanLoopCorrelator>,
        jobs: Arc<JobRunner>,
    ) -> Self {
        let mock_mode = engine.is_mock();
        Self {
            subjects,
            engine,
            correlator,
            jobs,
            health: HealthState {
                start_time: Instant::now(),
                mock_mode,
            },
        }
    }
}

/// Gateway server configuration (mirrors `GatewayConfig` from persona-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the full route table.
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/v1/subjects", post(handlers::register_subject))
        .route("/v1/subjects/{id}", get(handlers::get_subject))
        .route("/v1/subjects/{id}/memory", get(handlers::search_memory))
        .route("/v1/ingest/{subject_id}", post(handlers::submit_ingestion))
        .route("/v1/ingest/status/{job_id}", get(handlers::job_status))
        .route("/v1/chat/session/start", post(handlers::start_session))
        .route("/v1/chat/session/end", post(handlers::end_session))
        .route("/v1/chat/history", post(handlers::log_turn))
        .route("/v1/chat/generate", post(handlers::generate))
        .route(
            "/v1/chat/generate_with_human",
            post(stream::generate_with_human),
        )
        .route("/v1/chat/human_response", post(stream::human_response));

    Router::new()
        .route("/health", get(handlers::get_health))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves the gateway until `shutdown` is cancelled.
///
/// In-flight requests are allowed to finish; waiting guided streams must be
/// ended separately through [`HumanLoopCorrelator::shutdown`].
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), PersonaError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PersonaError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| PersonaError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
        assert!(debug.contains("3000"));
    }
}
