// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `persona serve` command implementation.
//!
//! Builds the service graph, serves the HTTP API until SIGINT or SIGTERM,
//! then ends waiting guided streams and drains ingestion jobs before
//! closing storage.

use std::time::Duration;

use persona_agent::shutdown;
use persona_config::PersonaConfig;
use persona_core::PersonaError;
use persona_gateway::{AppState, ServerConfig, start_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::services::Services;

const STREAM_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);
const JOB_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the `persona serve` command.
pub async fn run_serve(config: PersonaConfig) -> Result<(), PersonaError> {
    info!(name = %config.agent.name, "starting persona serve");

    let services = Services::build(&config).await?;
    let cancel = shutdown::install_signal_handler();

    // Suspended guided streams keep their connections open, so they must be
    // ended before axum's graceful shutdown can complete.
    let correlator = services.correlator.clone();
    let stream_cancel = cancel.clone();
    let stream_shutdown = tokio::spawn(async move {
        stream_cancel.cancelled().await;
        correlator.shutdown().await;
    });

    let state = AppState::new(
        services.subjects.clone(),
        services.engine.clone(),
        services.correlator.clone(),
        services.jobs.clone(),
    );
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };

    let served = start_server(&server_config, state, cancel.clone()).await;
    cancel.cancel();

    shutdown::drain_within(
        "guided streams",
        async {
            if let Err(e) = stream_shutdown.await {
                warn!(error = %e, "guided stream shutdown task failed");
            }
        },
        STREAM_DRAIN_TIMEOUT,
    )
    .await;
    shutdown::drain_within("ingestion jobs", services.jobs.drain(), JOB_DRAIN_TIMEOUT).await;

    if let Err(e) = services.storage.close().await {
        warn!(error = %e, "failed to close storage cleanly");
    }

    served?;
    info!("persona serve stopped");
    Ok(())
}

/// Initialize the tracing subscriber with the configured log level.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("persona={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
