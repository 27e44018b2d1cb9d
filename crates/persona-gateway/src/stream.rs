// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-in-the-loop endpoints.
//!
//! POST /v1/chat/generate_with_human answers with a chunked `text/plain`
//! body that stays open until an operator responds through
//! POST /v1/chat/human_response for the same session. A failure while
//! streaming is written into the body as:
//!
//! ```text
//! \n[ERROR]: <message>
//! ```

use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use persona_agent::{GuidedRequest, StreamFrame};
use persona_core::PersonaError;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::handlers::Ack;
use crate::server::AppState;

/// Request body for POST /v1/chat/generate_with_human.
#[derive(Debug, Deserialize)]
pub struct GuidedTurnRequest {
    pub subject_id: String,
    pub session_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub visual_context: Option<String>,
    /// Defaults to a full rewrite.
    #[serde(default)]
    pub intervention: Option<f64>,
}

/// Request body for POST /v1/chat/human_response.
#[derive(Debug, Deserialize)]
pub struct OperatorResponse {
    pub session_id: String,
    #[serde(alias = "human_response")]
    pub operator_input: String,
}

/// POST /v1/chat/generate_with_human
pub async fn generate_with_human(
    State(state): State<AppState>,
    Json(body): Json<GuidedTurnRequest>,
) -> Result<Response, ApiError> {
    if body.session_id.trim().is_empty() {
        return Err(PersonaError::InvalidInput("session_id is required".into()).into());
    }
    state.subjects.get(&body.subject_id).await?;

    let request = GuidedRequest::new(body.subject_id, body.session_id, body.text)
        .with_visual_context(body.visual_context)
        .with_intervention(body.intervention.unwrap_or(1.0));
    let reply = state.correlator.register(request);
    debug!(session_id = %reply.session_id(), "guided stream opened");

    let frames = reply.map(|frame| Ok::<_, Infallible>(render_frame(frame)));
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(frames),
    )
        .into_response())
}

/// POST /v1/chat/human_response
pub async fn human_response(
    State(state): State<AppState>,
    Json(body): Json<OperatorResponse>,
) -> Result<Json<Ack>, ApiError> {
    state
        .correlator
        .respond(&body.session_id, body.operator_input)?;
    Ok(Json(Ack::with_message("Response sent to user")))
}

/// Renders one stream frame as body text.
pub fn render_frame(frame: StreamFrame) -> String {
    match frame {
        StreamFrame::Chunk(text) => text,
        StreamFrame::Error(message) => format!("\n[ERROR]: {message}"),
    }
}
