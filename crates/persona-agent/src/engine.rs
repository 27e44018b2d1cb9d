// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persona reply generation.
//!
//! Two modes share one engine:
//! - **Single-shot**: [`ResponseEngine::generate`] returns a complete reply
//! - **Guided**: [`ResponseEngine::drive_guided`] streams an operator's
//!   draft, rewritten in persona, into a [`StreamFrame`] channel
//!
//! Without a provider the engine runs in mock mode and produces
//! deterministic replies and token streams.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use persona_config::model::PersonaConfig;
use persona_context::{
    ContextAssembler, history_to_messages, persona_system_prompt, rewrite_system_prompt,
    rewrite_user_message,
};
use persona_core::{
    NewMemory, PersonaError, ProviderAdapter, ProviderMessage, ProviderRequest, StorageAdapter,
    StreamEventType, TurnRole,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const VISUAL_CONTEXT_TAG: &str = "[Visual Context]";
const GUIDED_PREFIX: &str = "Avatar (Guided)";
const DIRECT_ECHO_PREFIX: &str = "Avatar (Direct Echo)";

/// Substituted when the provider answers with nothing.
const EMPTY_REPLY: &str = "I'm listening.";

/// One unit written to a guided reply stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Chunk(String),
    /// Terminal; the stream closes after it.
    Error(String),
}

/// An end-user turn waiting for an operator draft.
#[derive(Debug, Clone)]
pub struct GuidedRequest {
    pub subject_id: String,
    pub session_id: String,
    pub user_text: String,
    pub visual_context: Option<String>,
    /// How far the draft may be rewritten, in `[0, 1]`.
    pub intervention: f64,
}

impl GuidedRequest {
    pub fn new(
        subject_id: impl Into<String>,
        session_id: impl Into<String>,
        user_text: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            session_id: session_id.into(),
            user_text: user_text.into(),
            visual_context: None,
            intervention: 1.0,
        }
    }

    pub fn with_visual_context(mut self, visual_context: Option<String>) -> Self {
        self.visual_context = visual_context.filter(|v| !v.trim().is_empty());
        self
    }

    pub fn with_intervention(mut self, level: f64) -> Self {
        self.intervention = clamp_intervention(level);
        self
    }
}

/// Clamps to `[0, 1]`. Non-finite levels mean a full rewrite.
pub fn clamp_intervention(level: f64) -> f64 {
    if level.is_finite() {
        level.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Model and budget settings for replies.
#[derive(Debug, Clone)]
pub struct ResponseSettings {
    pub model: String,
    pub reply_max_tokens: u32,
    pub rewrite_max_tokens: u32,
    /// Pause before each word of a mock guided stream.
    pub mock_token_delay: Duration,
}

impl ResponseSettings {
    pub fn from_config(config: &PersonaConfig) -> Self {
        Self {
            model: config.anthropic.default_model.clone(),
            reply_max_tokens: config.response.reply_max_tokens,
            rewrite_max_tokens: config.response.rewrite_max_tokens,
            mock_token_delay: Duration::from_millis(config.response.mock_token_delay_ms),
        }
    }
}

/// Outcome of writing a guided reply to its listener.
enum Delivery {
    Delivered(String),
    /// The listener went away before the reply finished.
    Abandoned,
}

pub struct ResponseEngine {
    storage: Arc<dyn StorageAdapter>,
    assembler: ContextAssembler,
    provider: Option<Arc<dyn ProviderAdapter>>,
    settings: ResponseSettings,
}

impl ResponseEngine {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        provider: Option<Arc<dyn ProviderAdapter>>,
        settings: ResponseSettings,
    ) -> Self {
        if provider.is_none() {
            info!("no provider configured, replies run in mock mode");
        }
        Self {
            assembler: ContextAssembler::new(storage.clone()),
            storage,
            provider,
            settings,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.provider.is_none()
    }

    /// Mints a session id and makes it the subject's active session.
    pub async fn start_session(&self, subject_id: &str) -> Result<String, PersonaError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.storage
            .set_active_session(subject_id, Some(&session_id))
            .await?;
        info!(subject_id, session_id = %session_id, "chat session started");
        Ok(session_id)
    }

    pub async fn end_session(&self, subject_id: &str) -> Result<(), PersonaError> {
        self.storage.set_active_session(subject_id, None).await?;
        info!(subject_id, "chat session ended");
        Ok(())
    }

    /// Records a turn without generating anything.
    pub async fn log_turn(
        &self,
        subject_id: &str,
        session_id: &str,
        role: TurnRole,
        content: &str,
    ) -> Result<(), PersonaError> {
        self.require_subject(subject_id).await?;
        let entry = NewMemory::turn(session_id, role.format(content));
        self.storage.append_memories(subject_id, &[entry]).await
    }

    /// Generates a single in-persona reply to `user_text`.
    ///
    /// The user turn is persisted before the provider is called, so it
    /// survives a generation failure. Provider errors propagate.
    pub async fn generate(
        &self,
        subject_id: &str,
        session_id: &str,
        user_text: &str,
        visual_context: Option<&str>,
    ) -> Result<String, PersonaError> {
        if user_text.trim().is_empty() {
            return Err(PersonaError::InvalidInput("text is required".into()));
        }
        let visual_context = visual_context.filter(|v| !v.trim().is_empty());

        let context = self
            .assembler
            .assemble(subject_id, session_id, user_text)
            .await?;
        self.append_user_turn(subject_id, session_id, user_text, visual_context)
            .await?;

        let reply = match &self.provider {
            None => mock_reply(subject_id),
            Some(provider) => {
                let request = ProviderRequest {
                    model: self.settings.model.clone(),
                    system_prompt: Some(persona_system_prompt(
                        &context.profile,
                        context.latest_activity.as_ref(),
                        &context.relevant_memories,
                    )),
                    messages: history_to_messages(
                        &context.recent_history,
                        user_text,
                        visual_context,
                    ),
                    max_tokens: self.settings.reply_max_tokens,
                    stream: false,
                };
                let response = provider.complete(request).await?;
                if response.content.trim().is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    response.content
                }
            }
        };

        let entry = NewMemory::turn(session_id, TurnRole::Avatar.format(&reply));
        self.storage.append_memories(subject_id, &[entry]).await?;
        debug!(subject_id, session_id, reply_len = reply.len(), "reply generated");
        Ok(reply)
    }

    /// Delivers an operator draft for `request` into `frames`.
    ///
    /// At intervention 0 the draft is sent verbatim. Otherwise it is
    /// rewritten in persona and streamed as it arrives. Failures end the
    /// stream with a [`StreamFrame::Error`]. A reply is persisted only
    /// when it was delivered in full.
    pub async fn drive_guided(
        &self,
        request: GuidedRequest,
        operator_input: String,
        frames: mpsc::Sender<StreamFrame>,
    ) {
        let subject_id = request.subject_id.as_str();
        let session_id = request.session_id.as_str();

        if !request.user_text.trim().is_empty() {
            if let Err(e) = self
                .append_user_turn(
                    subject_id,
                    session_id,
                    &request.user_text,
                    request.visual_context.as_deref(),
                )
                .await
            {
                warn!(subject_id, session_id, error = %e, "could not record guided user turn");
            }
        }

        let (prefix, outcome) = if request.intervention == 0.0 {
            (DIRECT_ECHO_PREFIX, Ok(echo(&operator_input, &frames).await))
        } else {
            (
                GUIDED_PREFIX,
                self.rewrite(&request, &operator_input, &frames).await,
            )
        };

        match outcome {
            Ok(Delivery::Delivered(reply)) => {
                let entry = NewMemory::turn(session_id, format!("{prefix}: {reply}"));
                if let Err(e) = self.storage.append_memories(subject_id, &[entry]).await {
                    warn!(subject_id, session_id, error = %e, "could not record guided reply");
                }
            }
            Ok(Delivery::Abandoned) => {
                debug!(subject_id, session_id, "listener disconnected, guided reply dropped");
            }
            Err(e) => {
                warn!(subject_id, session_id, error = %e, "guided reply failed");
                let _ = frames.send(StreamFrame::Error(e.to_string())).await;
            }
        }
    }

    async fn rewrite(
        &self,
        request: &GuidedRequest,
        operator_input: &str,
        frames: &mpsc::Sender<StreamFrame>,
    ) -> Result<Delivery, PersonaError> {
        let (profile, latest_activity) = self.assembler.persona_state(&request.subject_id).await?;

        let Some(provider) = &self.provider else {
            return Ok(self.mock_rewrite(operator_input, frames).await);
        };

        let provider_request = ProviderRequest {
            model: self.settings.model.clone(),
            system_prompt: Some(rewrite_system_prompt(
                &profile,
                request.intervention,
                &request.user_text,
                operator_input,
                latest_activity.as_ref(),
            )),
            messages: vec![ProviderMessage::user(rewrite_user_message(operator_input))],
            max_tokens: self.settings.rewrite_max_tokens,
            stream: true,
        };
        let mut stream = provider.stream(provider_request).await?;

        let mut reply = String::new();
        loop {
            let next = tokio::select! {
                _ = frames.closed() => return Ok(Delivery::Abandoned),
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk?;

            if chunk.event_type == StreamEventType::Error {
                return Err(PersonaError::Provider {
                    message: chunk.error.unwrap_or_else(|| "stream error".to_string()),
                    source: None,
                });
            }
            if let Some(text) = chunk.text.filter(|t| !t.is_empty()) {
                reply.push_str(&text);
                if frames.send(StreamFrame::Chunk(text)).await.is_err() {
                    return Ok(Delivery::Abandoned);
                }
            }
        }
        Ok(Delivery::Delivered(reply))
    }

    async fn mock_rewrite(
        &self,
        operator_input: &str,
        frames: &mpsc::Sender<StreamFrame>,
    ) -> Delivery {
        let reply = format!("[Mock Guided Response] {operator_input} (transformed)");
        for word in reply.split(' ') {
            tokio::time::sleep(self.settings.mock_token_delay).await;
            if frames.send(StreamFrame::Chunk(format!("{word} "))).await.is_err() {
                return Delivery::Abandoned;
            }
        }
        Delivery::Delivered(reply)
    }

    async fn append_user_turn(
        &self,
        subject_id: &str,
        session_id: &str,
        user_text: &str,
        visual_context: Option<&str>,
    ) -> Result<(), PersonaError> {
        let mut entries = vec![NewMemory::turn(session_id, TurnRole::User.format(user_text))];
        if let Some(visual) = visual_context {
            entries.push(NewMemory::turn(
                session_id,
                TurnRole::User.format(&format!("{VISUAL_CONTEXT_TAG}: {visual}")),
            ));
        }
        self.storage.append_memories(subject_id, &entries).await
    }

    async fn require_subject(&self, subject_id: &str) -> Result<(), PersonaError> {
        match self.storage.get_subject(subject_id).await? {
            Some(_) => Ok(()),
            None => Err(PersonaError::SubjectNotFound(subject_id.to_string())),
        }
    }
}

async fn echo(operator_input: &str, frames: &mpsc::Sender<StreamFrame>) -> Delivery {
    match frames
        .send(StreamFrame::Chunk(operator_input.to_string()))
        .await
    {
        Ok(()) => Delivery::Delivered(operator_input.to_string()),
        Err(_) => Delivery::Abandoned,
    }
}

fn mock_reply(subject_id: &str) -> String {
    format!("[Mock Response for {subject_id}] That sounds interesting! tell me more.")
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use persona_config::model::StorageConfig;
    use persona_core::{
        AdapterType, HealthStatus, PersonalityProfile, PluginAdapter, ProviderResponse,
        ProviderStream, ProviderStreamChunk, Subject, TokenUsage,
    };
    use persona_storage::SqliteStorage;
    use tempfile::TempDir;

    use super::*;

    /// Provider that answers every call from a fixed script.
    pub(crate) struct ScriptedProvider {
        reply: Result<String, String>,
        chunks: Vec<Result<String, String>>,
        pub(crate) requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        pub(crate) fn replying(reply: &str) -> Arc<Self> {
            Self::build(Ok(reply.to_string()), Vec::new())
        }

        pub(crate) fn failing(message: &str) -> Arc<Self> {
            Self::build(Err(message.to_string()), Vec::new())
        }

        pub(crate) fn streaming(chunks: Vec<Result<&str, &str>>) -> Arc<Self> {
            let chunks = chunks
                .into_iter()
                .map(|c| c.map(str::to_string).map_err(str::to_string))
                .collect();
            Self::build(Ok(String::new()), chunks)
        }

        fn build(reply: Result<String, String>, chunks: Vec<Result<String, String>>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                chunks,
                requests: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn last_request(&self) -> ProviderRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl PluginAdapter for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Provider
        }
        async fn health_check(&self) -> Result<HealthStatus, PersonaError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), PersonaError> {
            Ok(())
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedProvider {
        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, PersonaError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(content) => Ok(ProviderResponse {
                    id: "msg_1".into(),
                    content: content.clone(),
                    model: request.model,
                    stop_reason: Some("end_turn".into()),
                    usage: TokenUsage::default(),
                }),
                Err(message) => Err(PersonaError::Provider {
                    message: message.clone(),
                    source: None,
                }),
            }
        }

        async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, PersonaError> {
            self.requests.lock().unwrap().push(request);
            let items: Vec<Result<ProviderStreamChunk, PersonaError>> = self
                .chunks
                .iter()
                .map(|chunk| match chunk {
                    Ok(text) => Ok(ProviderStreamChunk::text(text.clone())),
                    Err(message) => Err(PersonaError::Provider {
                        message: message.clone(),
                        source: None,
                    }),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    pub(crate) async fn storage_with_subject(dir: &TempDir, id: &str) -> Arc<SqliteStorage> {
        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("agent.db").to_str().unwrap().to_string(),
            wal_mode: true,
        }));
        storage.initialize().await.unwrap();
        let now = Utc::now();
        storage
            .create_subject(&Subject {
                id: id.to_string(),
                owner: Some("tester".into()),
                profile: PersonalityProfile::default(),
                active_session_id: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        storage
    }

    pub(crate) fn settings() -> ResponseSettings {
        ResponseSettings {
            model: "claude-test".into(),
            reply_max_tokens: 150,
            rewrite_max_tokens: 300,
            mock_token_delay: Duration::ZERO,
        }
    }

    pub(crate) fn engine(
        storage: Arc<SqliteStorage>,
        provider: Option<Arc<ScriptedProvider>>,
    ) -> ResponseEngine {
        let provider = provider.map(|p| p as Arc<dyn ProviderAdapter>);
        ResponseEngine::new(storage, provider, settings())
    }

    pub(crate) async fn log_contents(storage: &SqliteStorage, subject_id: &str) -> Vec<String> {
        storage
            .search_memories(subject_id, None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect()
    }

    async fn run_guided(
        engine: &ResponseEngine,
        request: GuidedRequest,
        operator_input: &str,
    ) -> Vec<StreamFrame> {
        let (tx, mut rx) = mpsc::channel(64);
        engine
            .drive_guided(request, operator_input.to_string(), tx)
            .await;
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    fn concatenated(frames: &[StreamFrame]) -> String {
        frames
            .iter()
            .map(|f| match f {
                StreamFrame::Chunk(text) => text.as_str(),
                StreamFrame::Error(_) => panic!("unexpected error frame: {f:?}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn mock_reply_records_both_turns() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let engine = engine(storage.clone(), None);
        assert!(engine.is_mock());

        let reply = engine
            .generate("alice", "s1", "hello there", Some("waving"))
            .await
            .unwrap();
        assert_eq!(
            reply,
            "[Mock Response for alice] That sounds interesting! tell me more."
        );
        assert_eq!(
            log_contents(&storage, "alice").await,
            vec![
                "User: hello there".to_string(),
                "User: [Visual Context]: waving".to_string(),
                format!("Avatar: {reply}"),
            ]
        );
    }

    #[tokio::test]
    async fn provider_reply_sends_new_turn_once() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let provider = ScriptedProvider::replying("Oh nice, where to?");
        let engine = engine(storage.clone(), Some(provider.clone()));

        engine
            .log_turn("alice", "s1", TurnRole::User, "hi")
            .await
            .unwrap();
        engine
            .log_turn("alice", "s1", TurnRole::Avatar, "hey!")
            .await
            .unwrap();

        let reply = engine
            .generate("alice", "s1", "going out", Some("holding keys"))
            .await
            .unwrap();
        assert_eq!(reply, "Oh nice, where to?");

        let request = provider.last_request();
        assert_eq!(request.model, "claude-test");
        assert_eq!(request.max_tokens, 150);
        assert!(!request.stream);
        assert!(request.system_prompt.unwrap().contains("General American"));
        assert_eq!(
            request.messages,
            vec![
                ProviderMessage::user("hi"),
                ProviderMessage::assistant("hey!"),
                ProviderMessage::user("going out\n[Visual Context]: holding keys"),
            ]
        );
        assert_eq!(
            log_contents(&storage, "alice").await.last().unwrap(),
            "Avatar: Oh nice, where to?"
        );
    }

    #[tokio::test]
    async fn empty_provider_reply_is_substituted() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let engine = engine(storage, Some(ScriptedProvider::replying("  ")));
        let reply = engine.generate("alice", "s1", "hi", None).await.unwrap();
        assert_eq!(reply, "I'm listening.");
    }

    #[tokio::test]
    async fn generation_failure_propagates_and_keeps_user_turn() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let engine = engine(storage.clone(), Some(ScriptedProvider::failing("overloaded")));

        let err = engine
            .generate("alice", "s1", "are you there", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PersonaError::Provider { .. }));
        assert_eq!(
            log_contents(&storage, "alice").await,
            vec!["User: are you there".to_string()]
        );
    }

    #[tokio::test]
    async fn unknown_subject_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let engine = engine(storage.clone(), None);

        let err = engine.generate("bob", "s1", "hello", None).await.unwrap_err();
        assert!(matches!(err, PersonaError::SubjectNotFound(_)));
        assert!(storage.search_memories("bob", None).await.unwrap().is_empty());

        let err = engine
            .log_turn("bob", "s1", TurnRole::User, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, PersonaError::SubjectNotFound(_)));
    }

    #[tokio::test]
    async fn blank_text_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let engine = engine(storage, None);
        let err = engine.generate("alice", "s1", "   ", None).await.unwrap_err();
        assert!(matches!(err, PersonaError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn sessions_set_and_clear_active_id() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let engine = engine(storage.clone(), None);

        let session = engine.start_session("alice").await.unwrap();
        assert!(uuid::Uuid::parse_str(&session).is_ok());
        let subject = storage.get_subject("alice").await.unwrap().unwrap();
        assert_eq!(subject.active_session_id.as_deref(), Some(session.as_str()));

        engine.end_session("alice").await.unwrap();
        let subject = storage.get_subject("alice").await.unwrap().unwrap();
        assert!(subject.active_session_id.is_none());

        assert!(engine.start_session("bob").await.unwrap_err().is_not_found());
    }

    #[test]
    fn intervention_is_clamped() {
        assert_eq!(clamp_intervention(-0.5), 0.0);
        assert_eq!(clamp_intervention(0.3), 0.3);
        assert_eq!(clamp_intervention(7.0), 1.0);
        assert_eq!(clamp_intervention(f64::NAN), 1.0);
        assert_eq!(clamp_intervention(f64::INFINITY), 1.0);
        assert_eq!(GuidedRequest::new("a", "s", "t").intervention, 1.0);
    }

    #[tokio::test]
    async fn zero_intervention_echoes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let provider = ScriptedProvider::streaming(vec![Ok("never used")]);
        let engine = engine(storage.clone(), Some(provider.clone()));

        let request = GuidedRequest::new("alice", "s1", "what's up?").with_intervention(0.0);
        let frames = run_guided(&engine, request, "Not much, you?").await;

        assert_eq!(frames, vec![StreamFrame::Chunk("Not much, you?".into())]);
        assert!(provider.requests.lock().unwrap().is_empty());
        assert_eq!(
            log_contents(&storage, "alice").await,
            vec![
                "User: what's up?".to_string(),
                "Avatar (Direct Echo): Not much, you?".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn mock_rewrite_streams_words() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let engine = engine(storage.clone(), None);

        let frames = run_guided(&engine, GuidedRequest::new("alice", "s1", "hi"), "hello").await;
        assert_eq!(frames.len(), 5);
        assert_eq!(
            concatenated(&frames),
            "[Mock Guided Response] hello (transformed) "
        );
        assert_eq!(
            log_contents(&storage, "alice").await.last().unwrap(),
            "Avatar (Guided): [Mock Guided Response] hello (transformed)"
        );
    }

    #[tokio::test]
    async fn provider_rewrite_streams_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let provider = ScriptedProvider::streaming(vec![Ok("Yeah, "), Ok(""), Ok("totally!")]);
        let engine = engine(storage.clone(), Some(provider.clone()));

        let request = GuidedRequest::new("alice", "s1", "fun day?")
            .with_visual_context(Some("smiling".into()))
            .with_intervention(0.5);
        let frames = run_guided(&engine, request, "yes it was").await;

        assert_eq!(
            frames,
            vec![
                StreamFrame::Chunk("Yeah, ".into()),
                StreamFrame::Chunk("totally!".into()),
            ]
        );
        let sent = provider.last_request();
        assert!(sent.stream);
        assert_eq!(sent.max_tokens, 300);
        assert!(sent.system_prompt.unwrap().contains("Intervention Level: 0.50"));
        assert_eq!(sent.messages.len(), 1);
        assert!(sent.messages[0].content.contains("\"yes it was\""));

        assert_eq!(
            log_contents(&storage, "alice").await,
            vec![
                "User: fun day?".to_string(),
                "User: [Visual Context]: smiling".to_string(),
                "Avatar (Guided): Yeah, totally!".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn mid_stream_failure_ends_with_error_frame() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let provider = ScriptedProvider::streaming(vec![Ok("Hel"), Err("connection reset")]);
        let engine = engine(storage.clone(), Some(provider));

        let frames = run_guided(&engine, GuidedRequest::new("alice", "s1", "hi"), "hello").await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], StreamFrame::Chunk("Hel".into()));
        match &frames[1] {
            StreamFrame::Error(message) => assert!(message.contains("connection reset")),
            other => panic!("expected error frame, got {other:?}"),
        }
        assert!(
            !log_contents(&storage, "alice")
                .await
                .iter()
                .any(|c| c.starts_with("Avatar"))
        );
    }

    #[tokio::test]
    async fn unknown_subject_rewrite_reports_error_frame() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let engine = engine(storage, None);

        let frames = run_guided(&engine, GuidedRequest::new("bob", "s1", ""), "hello").await;
        assert!(matches!(frames.as_slice(), [StreamFrame::Error(_)]));
    }

    #[tokio::test]
    async fn disconnected_listener_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_with_subject(&dir, "alice").await;
        let engine = engine(storage.clone(), None);

        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        engine
            .drive_guided(GuidedRequest::new("alice", "s1", "hi"), "hello".into(), tx)
            .await;

        assert_eq!(
            log_contents(&storage, "alice").await,
            vec!["User: hi".to_string()]
        );
    }
}
