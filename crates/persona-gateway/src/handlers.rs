// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON request handlers for the gateway REST API.

use std::path::PathBuf;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use persona_core::{IngestionJob, MemoryEntry, Subject, TurnRole};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::AppState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub mock_mode: bool,
}

/// Request body for POST /v1/subjects.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub subject_id: Option<String>,
}

/// Query string for GET /v1/subjects/{id}/memory.
#[derive(Debug, Deserialize)]
pub struct MemoryQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// Request body for POST /v1/ingest/{subject_id}.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Server-local media file. Ingestion reads a copy; the file is kept.
    pub media_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct IngestAccepted {
    pub success: bool,
    pub message: String,
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub subject_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStarted {
    pub success: bool,
    pub session_id: String,
}

/// Generic acknowledgement.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

/// Request body for POST /v1/chat/history.
#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub subject_id: String,
    pub session_id: String,
    pub role: TurnRole,
    pub content: String,
}

/// Request body for POST /v1/chat/generate.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub subject_id: String,
    pub session_id: String,
    pub text: String,
    #[serde(default)]
    pub visual_context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub response: String,
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        mock_mode: state.health.mock_mode,
    })
}

/// POST /v1/subjects
pub async fn register_subject(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Subject>), ApiError> {
    let subject = state.subjects.register(body.owner, body.subject_id).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

/// GET /v1/subjects/{id}
pub async fn get_subject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Subject>, ApiError> {
    Ok(Json(state.subjects.get(&id).await?))
}

/// GET /v1/subjects/{id}/memory?q=
pub async fn search_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MemoryQuery>,
) -> Result<Json<Vec<MemoryEntry>>, ApiError> {
    let entries = state.subjects.search_memory(&id, query.q.as_deref()).await?;
    Ok(Json(entries))
}

/// POST /v1/ingest/{subject_id}
///
/// Records the job and returns immediately; progress is read from the
/// status endpoint.
pub async fn submit_ingestion(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Json(body): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestAccepted>), ApiError> {
    let job = state.jobs.submit(&subject_id, &body.media_path).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(IngestAccepted {
            success: true,
            message: "Processing started".to_string(),
            job_id: job.job_id,
        }),
    ))
}

/// GET /v1/ingest/status/{job_id}
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<IngestionJob>, ApiError> {
    Ok(Json(state.jobs.status(&job_id).await?))
}

/// POST /v1/chat/session/start
pub async fn start_session(
    State(state): State<AppState>,
    Json(body): Json<SessionRequest>,
) -> Result<Json<SessionStarted>, ApiError> {
    let session_id = state.engine.start_session(&body.subject_id).await?;
    Ok(Json(SessionStarted {
        success: true,
        session_id,
    }))
}

/// POST /v1/chat/session/end
pub async fn end_session(
    State(state): State<AppState>,
    Json(body): Json<SessionRequest>,
) -> Result<Json<Ack>, ApiError> {
    state.engine.end_session(&body.subject_id).await?;
    Ok(Json(Ack::with_message("Session ended")))
}

/// POST /v1/chat/history
pub async fn log_turn(
    State(state): State<AppState>,
    Json(body): Json<HistoryRequest>,
) -> Result<Json<Ack>, ApiError> {
    state
        .engine
        .log_turn(&body.subject_id, &body.session_id, body.role, &body.content)
        .await?;
    Ok(Json(Ack::ok()))
}

/// POST /v1/chat/generate
pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let response = state
        .engine
        .generate(
            &body.subject_id,
            &body.session_id,
            &body.text,
            body.visual_context.as_deref(),
        )
        .await?;
    Ok(Json(GenerateResponse {
        success: true,
        response,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_fields_are_optional() {
        let req: RegisterRequest = serde_json::from_str("{}").unwrap();
        assert!(req.owner.is_none());
        assert!(req.subject_id.is_none());
    }

    #[test]
    fn history_role_is_lowercase() {
        let req: HistoryRequest = serde_json::from_str(
            r#"{"subject_id": "a", "session_id": "s", "role": "avatar", "content": "hey"}"#,
        )
        .unwrap();
        assert_eq!(req.role, TurnRole::Avatar);
    }

    #[test]
    fn ack_omits_empty_message() {
        let json = serde_json::to_string(&Ack::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
        let json = serde_json::to_string(&Ack::with_message("done")).unwrap();
        assert!(json.contains(r#""message":"done""#));
    }
}
