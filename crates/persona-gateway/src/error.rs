// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`PersonaError`] onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use persona_core::PersonaError;
use serde::Serialize;
use tracing::error;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error: not-found variants are 404, caller mistakes 400, the rest 500.
#[derive(Debug)]
pub struct ApiError(pub PersonaError);

impl From<PersonaError> for ApiError {
    fn from(err: PersonaError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            PersonaError::SubjectNotFound(_)
            | PersonaError::JobNotFound(_)
            | PersonaError::NoPendingRequest(_) => StatusCode::NOT_FOUND,
            PersonaError::InvalidInput(_) | PersonaError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            PersonaError::SubjectNotFound(_) => "Subject not found".to_string(),
            PersonaError::JobNotFound(_) => "Job not found".to_string(),
            PersonaError::NoPendingRequest(_) => {
                "No pending request found for this session ID".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (status, Json(ErrorResponse { error: self.message() })).into_response()
    }
}
