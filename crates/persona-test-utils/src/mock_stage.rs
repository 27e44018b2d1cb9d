// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock extraction stage with scripted observations.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use persona_core::{
    AdapterType, ExtractionStage, HealthStatus, MemoryKind, Observation, PersonaError,
    PluginAdapter,
};

/// An extraction stage that returns the same scripted result for every call.
pub struct MockStage {
    kind: MemoryKind,
    result: Result<Vec<String>, String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockStage {
    /// A stage of `kind` returning one observation per line.
    pub fn new<I, S>(kind: MemoryKind, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            result: Ok(lines.into_iter().map(Into::into).collect()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn audio<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MemoryKind::Audio, lines)
    }

    pub fn vision<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MemoryKind::Vision, lines)
    }

    /// A stage of `kind` that always fails with `message`.
    pub fn failing(kind: MemoryKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            result: Err(message.into()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `extract` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for MockStage {
    fn name(&self) -> &str {
        "mock-stage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extraction
    }

    async fn health_check(&self) -> Result<HealthStatus, PersonaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PersonaError> {
        Ok(())
    }
}

#[async_trait]
impl ExtractionStage for MockStage {
    fn kind(&self) -> MemoryKind {
        self.kind
    }

    async fn extract(&self, _media: &Path) -> Result<Vec<Observation>, PersonaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.result {
            Ok(lines) => Ok(lines
                .iter()
                .map(|line| Observation::new(self.kind, line.clone()))
                .collect()),
            Err(message) => Err(PersonaError::Extraction {
                stage: self.kind.to_string(),
                message: message.clone(),
            }),
        }
    }
}
