// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairing of end-user turns with operator drafts.
//!
//! An end-user turn registers a [`PendingReply`] under its session id and
//! waits on it. An operator response for the same session takes the entry
//! out of the map in one step and drives the reply stream. Dropping the
//! [`PendingReply`] before that happens frees the session.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use dashmap::DashMap;
use futures::Stream;
use persona_core::PersonaError;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::engine::{GuidedRequest, ResponseEngine, StreamFrame};

const FRAME_BUFFER: usize = 32;

struct Pending {
    /// Distinguishes this registration from later ones for the same session.
    ticket: u64,
    request: GuidedRequest,
    frames: mpsc::Sender<StreamFrame>,
}

type PendingMap = Arc<DashMap<String, Pending>>;

pub struct HumanLoopCorrelator {
    engine: Arc<ResponseEngine>,
    pending: PendingMap,
    next_ticket: AtomicU64,
    tasks: TaskTracker,
}

impl HumanLoopCorrelator {
    pub fn new(engine: Arc<ResponseEngine>) -> Self {
        Self {
            engine,
            pending: Arc::new(DashMap::new()),
            next_ticket: AtomicU64::new(0),
            tasks: TaskTracker::new(),
        }
    }

    /// Registers `request` as the pending turn of its session.
    ///
    /// An earlier request still waiting on the same session is displaced:
    /// its stream gets an error frame and closes.
    pub fn register(&self, request: GuidedRequest) -> PendingReply {
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let session_id = request.session_id.clone();

        let entry = Pending {
            ticket,
            request,
            frames: tx,
        };
        if let Some(displaced) = self.pending.insert(session_id.clone(), entry) {
            warn!(session_id = %session_id, "pending request displaced by a newer one");
            let _ = displaced.frames.try_send(StreamFrame::Error(
                "superseded by a newer request for this session".to_string(),
            ));
        }
        info!(session_id = %session_id, "waiting for operator response");

        PendingReply {
            session_id,
            ticket,
            frames: rx,
            pending: self.pending.clone(),
        }
    }

    /// Claims the pending request of `session_id` and starts its reply.
    ///
    /// Succeeds at most once per registration. Returns as soon as the
    /// reply is started.
    pub fn respond(&self, session_id: &str, operator_input: String) -> Result<(), PersonaError> {
        let missing = || PersonaError::NoPendingRequest(session_id.to_string());
        let (_, entry) = self.pending.remove(session_id).ok_or_else(missing)?;
        if entry.frames.is_closed() {
            return Err(missing());
        }

        info!(
            session_id,
            intervention = entry.request.intervention,
            "operator response received"
        );
        let engine = self.engine.clone();
        self.tasks.spawn(async move {
            engine
                .drive_guided(entry.request, operator_input, entry.frames)
                .await;
        });
        Ok(())
    }

    pub fn is_pending(&self, session_id: &str) -> bool {
        self.pending.contains_key(session_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Ends every waiting stream, then waits for replies in progress.
    pub async fn shutdown(&self) {
        self.pending.retain(|_, entry| {
            let _ = entry
                .frames
                .try_send(StreamFrame::Error("server shutting down".to_string()));
            false
        });
        self.tasks.close();
        self.tasks.wait().await;
    }
}

/// Receiving end of a registered turn.
///
/// Yields the reply frames once an operator responds, then ends.
pub struct PendingReply {
    session_id: String,
    ticket: u64,
    frames: mpsc::Receiver<StreamFrame>,
    pending: PendingMap,
}

impl PendingReply {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn next_frame(&mut self) -> Option<StreamFrame> {
        self.frames.recv().await
    }
}

impl Stream for PendingReply {
    type Item = StreamFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.frames.poll_recv(cx)
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        let ticket = self.ticket;
        if self
            .pending
            .remove_if(&self.session_id, |_, entry| entry.ticket == ticket)
            .is_some()
        {
            debug!(session_id = %self.session_id, "listener left before operator response");
        }
    }
}
