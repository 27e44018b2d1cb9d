// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Persona integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock LLM provider with pre-configured responses
//! - [`MockStage`] - Mock extraction stage with scripted observations
//! - [`TestHarness`] - Full service stack over a temp SQLite database

pub mod harness;
pub mod mock_provider;
pub mod mock_stage;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::MockProvider;
pub use mock_stage::MockStage;
