// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface for the Persona service.
//!
//! Exposes subject management, ingestion jobs, single-shot chat, and the
//! human-in-the-loop guided stream over a JSON API built on axum.

pub mod error;
pub mod handlers;
pub mod server;
pub mod stream;

pub use error::{ApiError, ErrorResponse};
pub use server::{AppState, HealthState, ServerConfig, router, start_server};
