// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation side of the Persona service.
//!
//! - [`ResponseEngine`]: single-shot replies and guided reply streams
//! - [`HumanLoopCorrelator`]: pairs end-user turns with operator drafts
//! - [`SubjectDirectory`]: subject registration and memory lookup
//! - [`shutdown`]: signal handling and bounded draining

pub mod correlator;
pub mod engine;
pub mod shutdown;
pub mod subjects;

pub use correlator::{HumanLoopCorrelator, PendingReply};
pub use engine::{
    GuidedRequest, ResponseEngine, ResponseSettings, StreamFrame, clamp_intervention,
};
pub use subjects::SubjectDirectory;
