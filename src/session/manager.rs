//! ConversationSession — drives replies, assessments, and events for one
//! user; SessionRegistry — owns the per-user sessions.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, RwLock, broadcast, watch};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use super::model::{BusinessContext, Message, MessageRole, SessionEvent, SessionSnapshot};
use super::prompts::{consultant_system_prompt, welcome_message};
use super::state::{ConversationState, ReplyTicket};
use crate::assessment::{Assessment, AssessmentEngine};
use crate::config::ConsultConfig;
use crate::error::{ExportError, LlmError, SessionError};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::profile::{BusinessProfile, ProfileCollector};

const EVENT_CAPACITY: usize = 256;

/// Tunables shared by every session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub assessment_threshold: usize,
    pub max_tokens: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&ConsultConfig::default())
    }
}

impl From<&ConsultConfig> for SessionSettings {
    fn from(config: &ConsultConfig) -> Self {
        Self {
            assessment_threshold: config.assessment_threshold,
            max_tokens: config.max_tokens,
        }
    }
}

/// What a submitted message produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyOutcome {
    /// Assistant messages committed by this cycle: the reply, or any partial
    /// text followed by the apology.
    pub messages: Vec<Message>,
    pub progress: u8,
    pub failed: bool,
}

/// One user's consultation.
pub struct ConversationSession {
    user_id: String,
    profile: BusinessProfile,
    llm: Arc<dyn LlmProvider>,
    engine: Arc<AssessmentEngine>,
    settings: SessionSettings,
    state: Mutex<ConversationState>,
    events: broadcast::Sender<SessionEvent>,
    /// Flips to true once a newer session takes over for this user.
    retired: watch::Sender<bool>,
    export_lock: Mutex<()>,
}

impl ConversationSession {
    /// Create a session seeded with the personalised welcome message.
    pub fn new(
        user_id: impl Into<String>,
        profile: BusinessProfile,
        llm: Arc<dyn LlmProvider>,
        engine: Arc<AssessmentEngine>,
        settings: SessionSettings,
    ) -> Self {
        let welcome = Message::assistant(welcome_message(&profile));
        let context = BusinessContext::from_profile(&profile);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            user_id: user_id.into(),
            profile,
            llm,
            engine,
            settings,
            state: Mutex::new(ConversationState::new(welcome, context)),
            events,
            retired: watch::channel(false).0,
            export_lock: Mutex::new(()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn profile(&self) -> &BusinessProfile {
        &self.profile
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Resolves once the session has been replaced in the registry.
    pub async fn retired(&self) {
        let mut rx = self.retired.subscribe();
        // The sender lives as long as `self`, so this only ends on retirement.
        let _ = rx.wait_for(|retired| *retired).await;
    }

    pub fn is_retired(&self) -> bool {
        *self.retired.borrow()
    }

    fn retire(&self) {
        self.retired.send_replace(true);
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Send a user message and stream the consultant's reply.
    ///
    /// Rejected up front for blank input or while another reply is in
    /// flight. Generation failures are not errors to the caller: they end
    /// the cycle with an apology in the transcript.
    pub async fn submit_user_message(
        self: &Arc<Self>,
        content: &str,
    ) -> Result<ReplyOutcome, SessionError> {
        let ticket = self.state.lock().await.begin_reply(content)?;
        debug!(user_id = %self.user_id, prior_len = ticket.prior_len, "User message accepted");
        self.emit(SessionEvent::MessageAppended {
            message: ticket.user_message.clone(),
        });

        // The cycle owns the AwaitingReply phase, so it runs on its own task:
        // a caller that goes away mid-stream must not strand the session.
        let session = Arc::clone(self);
        let cycle = tokio::spawn(async move { session.run_reply(ticket).await });
        match cycle.await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Reply task aborted");
                Ok(self.fail_reply().await)
            }
        }
    }

    async fn run_reply(self: &Arc<Self>, ticket: ReplyTicket) -> ReplyOutcome {
        let mut messages = Vec::with_capacity(ticket.history.len() + 1);
        messages.push(ChatMessage::system(consultant_system_prompt(&self.profile)));
        messages.extend(ticket.history);
        let request = CompletionRequest::new(messages).with_max_tokens(self.settings.max_tokens);

        match self.stream_reply(request).await {
            Ok(()) => self.finish_reply(ticket.prior_len).await,
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Error generating response");
                self.fail_reply().await
            }
        }
    }

    /// Consume the chunk stream in order, mirroring the accumulated text
    /// into the pending slot. The state lock is never held across an await
    /// on the provider.
    async fn stream_reply(&self, request: CompletionRequest) -> Result<(), LlmError> {
        let mut stream = self.llm.complete_stream(request).await?;
        let mut accumulated = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            accumulated.push_str(&chunk);
            let pending = self.state.lock().await.apply_chunk(&accumulated).clone();
            self.emit(SessionEvent::StreamChunk {
                message_id: pending.id,
                content: pending.content,
            });
        }
        Ok(())
    }

    async fn finish_reply(self: &Arc<Self>, prior_len: usize) -> ReplyOutcome {
        let (committed, progress, trigger) = {
            let mut state = self.state.lock().await;
            let committed = state.finish(prior_len);
            let trigger = state
                .take_assessment_trigger(self.settings.assessment_threshold)
                .then(|| {
                    let transcript = state.transcript();
                    let history_len = transcript.len() - usize::from(committed.is_some());
                    (state.epoch(), transcript[..history_len].to_vec())
                });
            (committed, state.progress(), trigger)
        };

        if let Some(message) = &committed {
            self.emit(SessionEvent::MessageAppended {
                message: message.clone(),
            });
        }
        self.emit(SessionEvent::ReplyFinished { progress });
        info!(user_id = %self.user_id, progress, "Reply finished");

        if let Some((epoch, history)) = trigger {
            let latest = committed
                .as_ref()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.spawn_assessment(epoch, history, latest);
        }

        ReplyOutcome {
            messages: committed.into_iter().collect(),
            progress,
            failed: false,
        }
    }

    async fn fail_reply(&self) -> ReplyOutcome {
        let (committed, progress) = {
            let mut state = self.state.lock().await;
            (state.fail(), state.progress())
        };
        for message in &committed {
            self.emit(SessionEvent::MessageAppended {
                message: message.clone(),
            });
        }
        self.emit(SessionEvent::ReplyFinished { progress });

        ReplyOutcome {
            messages: committed,
            progress,
            failed: true,
        }
    }

    fn spawn_assessment(self: &Arc<Self>, epoch: u64, history: Vec<Message>, latest: String) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            match session.engine.generate(&history, &latest).await {
                Ok(assessments) => {
                    session.apply_assessments(epoch, assessments).await;
                }
                Err(e) => {
                    warn!(user_id = %session.user_id, error = %e, "Error generating assessment");
                }
            }
        });
    }

    /// Replace the assessment set unless a reset happened since `epoch`.
    async fn apply_assessments(&self, epoch: u64, assessments: Vec<Assessment>) -> bool {
        let applied = self
            .state
            .lock()
            .await
            .replace_assessments(epoch, assessments.clone());
        if applied {
            self.emit(SessionEvent::AssessmentsUpdated { assessments });
        } else {
            debug!(user_id = %self.user_id, epoch, "Discarding assessments from before reset");
        }
        applied
    }

    /// Generate assessments on demand from the whole transcript. On failure
    /// the previous set stays in place.
    pub async fn refresh_assessments(&self) -> Result<Vec<Assessment>, LlmError> {
        let (epoch, history, latest) = {
            let state = self.state.lock().await;
            let latest = state
                .transcript()
                .iter()
                .rev()
                .find(|m| m.role == MessageRole::Assistant)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            (state.epoch(), state.transcript().to_vec(), latest)
        };

        let assessments = self.engine.generate(&history, &latest).await?;
        self.apply_assessments(epoch, assessments).await;
        Ok(self.state.lock().await.assessments().to_vec())
    }

    /// Replace the business context record.
    pub async fn update_context(&self, context: BusinessContext) {
        self.state.lock().await.set_context(context.clone());
        self.emit(SessionEvent::ContextUpdated {
            business_context: context,
        });
    }

    /// Start over with a fresh welcome message.
    pub async fn reset(&self) -> Result<SessionSnapshot, SessionError> {
        let welcome = Message::assistant(welcome_message(&self.profile));
        let snapshot = {
            let mut state = self.state.lock().await;
            state.reset(welcome)?;
            state.snapshot()
        };
        info!(user_id = %self.user_id, "Session reset");
        self.emit(SessionEvent::SessionReset {
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    /// Record the completion milestone (progress 100).
    pub async fn mark_complete(&self) {
        let progress = {
            let mut state = self.state.lock().await;
            state.mark_complete();
            state.progress()
        };
        self.emit(SessionEvent::Progress { progress });
    }

    /// Claim the session's export slot. Fails while another export runs.
    pub fn try_begin_export(&self) -> Result<MutexGuard<'_, ()>, ExportError> {
        self.export_lock
            .try_lock()
            .map_err(|_| ExportError::InProgress)
    }
}

/// All live sessions, keyed by user id.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<ConversationSession>>>,
    profiles: Arc<ProfileCollector>,
    llm: Arc<dyn LlmProvider>,
    engine: Arc<AssessmentEngine>,
    settings: SessionSettings,
}

impl SessionRegistry {
    pub fn new(
        profiles: Arc<ProfileCollector>,
        llm: Arc<dyn LlmProvider>,
        settings: SessionSettings,
    ) -> Self {
        let engine = Arc::new(AssessmentEngine::new(Arc::clone(&llm)));
        Self {
            sessions: RwLock::new(HashMap::new()),
            profiles,
            llm,
            engine,
            settings,
        }
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// The user's live session, if one exists.
    pub async fn get(&self, user_id: &str) -> Option<Arc<ConversationSession>> {
        self.sessions.read().await.get(user_id).cloned()
    }

    /// Return the user's session, creating it from the stored profile.
    pub async fn open(&self, user_id: &str) -> Result<Arc<ConversationSession>, SessionError> {
        if let Some(session) = self.get(user_id).await {
            return Ok(session);
        }

        let profile =
            self.profiles
                .load(user_id)
                .await
                .ok_or_else(|| SessionError::ProfileRequired {
                    user_id: user_id.to_string(),
                })?;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| {
                info!(user_id, "Opening consultation session");
                Arc::new(self.build(user_id, profile))
            })
            .clone();
        Ok(session)
    }

    /// Start a fresh session for a newly submitted profile, replacing any
    /// existing one.
    ///
    /// The replaced session is retired after the swap, so subscribers that
    /// look the user up again find the new session.
    pub async fn start(&self, user_id: &str, profile: BusinessProfile) -> Arc<ConversationSession> {
        let session = Arc::new(self.build(user_id, profile));
        let previous = self
            .sessions
            .write()
            .await
            .insert(user_id.to_string(), Arc::clone(&session));
        if let Some(previous) = previous {
            previous.retire();
            info!(user_id, "Replaced session after profile resubmission");
        }
        session
    }

    fn build(&self, user_id: &str, profile: BusinessProfile) -> ConversationSession {
        ConversationSession::new(
            user_id,
            profile,
            Arc::clone(&self.llm),
            Arc::clone(&self.engine),
            self.settings,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::llm::{ChunkStream, CompletionResponse, FinishReason};
    use crate::profile::model::sample_profile;
    use crate::session::model::ReplyPhase;
    use crate::session::prompts::APOLOGY;
    use crate::session::state::PROGRESS_CEILING;
    use crate::store::LibSqlBackend;

    enum Script {
        Chunks(Vec<&'static str>),
        FailAfter(Vec<&'static str>),
        FailToStart,
        Gated(Arc<Notify>, &'static str),
    }

    /// Streams scripted replies; answers structured requests with a fixed
    /// assessment object.
    struct ScriptedLlm {
        scripts: std::sync::Mutex<VecDeque<Script>>,
        stream_calls: AtomicUsize,
        object_calls: AtomicUsize,
        last_request: std::sync::Mutex<Option<CompletionRequest>>,
    }

    impl ScriptedLlm {
        fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: std::sync::Mutex::new(scripts.into()),
                stream_calls: AtomicUsize::new(0),
                object_calls: AtomicUsize::new(0),
                last_request: std::sync::Mutex::new(None),
            })
        }
    }

    fn interrupted() -> LlmError {
        LlmError::StreamInterrupted {
            provider: "scripted".to_string(),
            reason: "connection reset".to_string(),
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.object_calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompletionResponse {
                content: r#"{"assessments":[{"category":"Brand Positioning","score":64,"insights":["Niche is clear"]}]}"#
                    .to_string(),
                input_tokens: 0,
                output_tokens: 0,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }

        async fn complete_stream(
            &self,
            request: CompletionRequest,
        ) -> Result<ChunkStream, LlmError> {
            self.stream_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Script::Chunks(vec!["ok"]));

            let stream: ChunkStream = match script {
                Script::Chunks(chunks) => Box::pin(tokio_stream::iter(
                    chunks.into_iter().map(|c| Ok::<_, LlmError>(c.to_string())),
                )),
                Script::FailAfter(chunks) => Box::pin(tokio_stream::iter(
                    chunks
                        .into_iter()
                        .map(|c| Ok::<_, LlmError>(c.to_string()))
                        .chain(std::iter::once(Err(interrupted()))),
                )),
                Script::FailToStart => return Err(interrupted()),
                Script::Gated(gate, text) => Box::pin(futures::stream::once(async move {
                    gate.notified().await;
                    Ok::<_, LlmError>(text.to_string())
                })),
            };
            Ok(stream)
        }
    }

    fn session_with(llm: Arc<ScriptedLlm>, threshold: usize) -> Arc<ConversationSession> {
        let engine = Arc::new(AssessmentEngine::new(llm.clone()));
        Arc::new(ConversationSession::new(
            "u1",
            sample_profile(),
            llm,
            engine,
            SessionSettings {
                assessment_threshold: threshold,
                max_tokens: 256,
            },
        ))
    }

    #[tokio::test]
    async fn streamed_reply_is_committed() {
        let llm = ScriptedLlm::new(vec![Script::Chunks(vec!["Hel", "lo", "!"])]);
        let session = session_with(llm.clone(), 10);
        let mut events = session.subscribe();

        let outcome = session.submit_user_message("Hi there").await.unwrap();
        assert!(!outcome.failed);
        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.messages[0].content, "Hello!");
        assert_eq!(outcome.progress, 16);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.messages.len(), 3);
        assert!(snapshot.pending.is_none());
        assert_eq!(snapshot.phase, ReplyPhase::Ready);

        // Chunks carry the full accumulated text each time.
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::StreamChunk { content, .. } = event {
                seen.push(content);
            }
        }
        assert_eq!(seen, vec!["Hel", "Hello", "Hello!"]);
    }

    #[tokio::test]
    async fn request_carries_system_prompt_and_transcript() {
        let llm = ScriptedLlm::new(vec![]);
        let session = session_with(llm.clone(), 10);
        session.submit_user_message("We roast coffee").await.unwrap();

        let request = llm.last_request.lock().unwrap().take().unwrap();
        let system = request.system_prompt().unwrap();
        assert!(system.contains("Company: Acme Coffee Roasters"));
        assert_eq!(request.messages.len(), 3);
        assert!(request.messages[1].content.starts_with("Welcome Dana Reyes!"));
        assert_eq!(request.messages[2], ChatMessage::user("We roast coffee"));
        assert_eq!(request.max_tokens, Some(256));
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_partial_and_apologizes_once() {
        let llm = ScriptedLlm::new(vec![Script::FailAfter(vec!["Part", "ial"])]);
        let session = session_with(llm, 10);

        let outcome = session.submit_user_message("Hi").await.unwrap();
        assert!(outcome.failed);
        let contents: Vec<&str> = outcome.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Partial", APOLOGY]);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.phase, ReplyPhase::Ready);
        assert_eq!(snapshot.messages.len(), 4);
        assert_eq!(
            snapshot.messages.iter().filter(|m| m.content == APOLOGY).count(),
            1
        );
    }

    #[tokio::test]
    async fn failure_before_stream_only_apologizes() {
        let llm = ScriptedLlm::new(vec![Script::FailToStart, Script::Chunks(vec!["Back"])]);
        let session = session_with(llm, 10);

        let outcome = session.submit_user_message("Hi").await.unwrap();
        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.messages[0].content, APOLOGY);

        // The session accepts input again afterwards.
        let outcome = session.submit_user_message("Again").await.unwrap();
        assert_eq!(outcome.messages[0].content, "Back");
    }

    #[tokio::test]
    async fn submission_while_in_flight_is_rejected_without_a_request() {
        let gate = Arc::new(Notify::new());
        let llm = ScriptedLlm::new(vec![Script::Gated(gate.clone(), "Done")]);
        let session = session_with(llm.clone(), 10);
        let mut events = session.subscribe();

        let first = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.submit_user_message("first").await }
        });
        // Wait until the first message is in the transcript.
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(SessionEvent::MessageAppended { .. }) = events.recv().await {
                    break;
                }
            }
        })
        .await
        .unwrap();

        assert!(matches!(
            session.submit_user_message("second").await,
            Err(SessionError::ReplyInFlight)
        ));
        assert!(matches!(session.reset().await, Err(SessionError::ReplyInFlight)));

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.messages[0].content, "Done");
        assert_eq!(llm.stream_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_caller_does_not_strand_the_reply() {
        let gate = Arc::new(Notify::new());
        let llm = ScriptedLlm::new(vec![
            Script::Gated(gate.clone(), "Finished anyway"),
            Script::Chunks(vec!["Second reply"]),
        ]);
        let session = session_with(llm.clone(), 10);
        let mut events = session.subscribe();

        let caller = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.submit_user_message("first").await }
        });
        while llm.stream_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(SessionEvent::ReplyFinished { .. }) = events.recv().await {
                    break;
                }
            }
        })
        .await
        .unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.phase, ReplyPhase::Ready);
        assert_eq!(snapshot.messages.last().unwrap().content, "Finished anyway");

        let outcome = session.submit_user_message("again").await.unwrap();
        assert_eq!(outcome.messages[0].content, "Second reply");
        assert!(session.reset().await.is_ok());
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let llm = ScriptedLlm::new(vec![]);
        let session = session_with(llm.clone(), 10);
        assert!(matches!(
            session.submit_user_message("  ").await,
            Err(SessionError::EmptyMessage)
        ));
        assert_eq!(llm.stream_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn assessment_fires_once_at_threshold() {
        let llm = ScriptedLlm::new(vec![]);
        // Welcome plus one reply reaches two assistant messages.
        let session = session_with(llm.clone(), 2);
        let mut events = session.subscribe();

        session.submit_user_message("one").await.unwrap();
        let assessments = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(SessionEvent::AssessmentsUpdated { assessments }) = events.recv().await {
                    break assessments;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(assessments[0].category, "Brand Positioning");
        assert_eq!(session.snapshot().await.assessments, assessments);

        session.submit_user_message("two").await.unwrap();
        session.submit_user_message("three").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(llm.object_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn manual_refresh_replaces_assessments() {
        let llm = ScriptedLlm::new(vec![]);
        let session = session_with(llm.clone(), 100);
        let assessments = session.refresh_assessments().await.unwrap();
        assert_eq!(assessments.len(), 1);
        assert_eq!(session.snapshot().await.assessments, assessments);
    }

    #[tokio::test]
    async fn reset_reseeds_welcome_and_clears_progress() {
        let llm = ScriptedLlm::new(vec![]);
        let session = session_with(llm, 100);
        session.submit_user_message("Hi").await.unwrap();
        session.refresh_assessments().await.unwrap();

        let snapshot = session.reset().await.unwrap();
        assert_eq!(snapshot.messages.len(), 1);
        assert!(snapshot.messages[0].content.starts_with("Welcome Dana Reyes!"));
        assert_eq!(snapshot.progress, 0);
        assert!(snapshot.assessments.is_empty());
        assert_eq!(snapshot.phase, ReplyPhase::Idle);
    }

    #[tokio::test]
    async fn progress_ceiling_until_marked_complete() {
        let llm = ScriptedLlm::new(vec![]);
        let session = session_with(llm, 100);
        for i in 0..8 {
            session.submit_user_message(&format!("m{i}")).await.unwrap();
        }
        assert_eq!(session.snapshot().await.progress, PROGRESS_CEILING);
        session.mark_complete().await;
        assert_eq!(session.snapshot().await.progress, 100);
    }

    #[tokio::test]
    async fn context_update_is_visible_in_snapshot() {
        let session = session_with(ScriptedLlm::new(vec![]), 100);
        assert_eq!(session.snapshot().await.business_context.industry, "Food & Beverage");

        let context = BusinessContext {
            goals: "Double wholesale accounts".to_string(),
            ..session.snapshot().await.business_context
        };
        session.update_context(context.clone()).await;
        assert_eq!(session.snapshot().await.business_context, context);
    }

    #[tokio::test]
    async fn export_slot_is_exclusive() {
        let session = session_with(ScriptedLlm::new(vec![]), 100);
        let guard = session.try_begin_export().unwrap();
        assert!(matches!(
            session.try_begin_export(),
            Err(ExportError::InProgress)
        ));
        drop(guard);
        assert!(session.try_begin_export().is_ok());
    }

    #[tokio::test]
    async fn registry_requires_a_profile() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let profiles = Arc::new(ProfileCollector::new(db));
        let registry =
            SessionRegistry::new(profiles.clone(), ScriptedLlm::new(vec![]), SessionSettings::default());

        assert!(matches!(
            registry.open("u1").await,
            Err(SessionError::ProfileRequired { .. })
        ));

        let draft = crate::profile::ProfileDraft::from(&sample_profile());
        profiles.submit("u1", &draft).await.unwrap();
        let first = registry.open("u1").await.unwrap();
        let second = registry.open("u1").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let replaced = registry.start("u1", sample_profile()).await;
        assert!(!Arc::ptr_eq(&first, &replaced));
        assert!(Arc::ptr_eq(&registry.get("u1").await.unwrap(), &replaced));
    }

    #[tokio::test]
    async fn resubmitted_profile_retires_the_old_session() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let profiles = Arc::new(ProfileCollector::new(db));
        let registry =
            SessionRegistry::new(profiles, ScriptedLlm::new(vec![]), SessionSettings::default());

        let first = registry.start("u1", sample_profile()).await;
        assert!(!first.is_retired());

        // A subscriber parked on the old session wakes once it is replaced.
        let waiter = {
            let first = Arc::clone(&first);
            tokio::spawn(async move { first.retired().await })
        };
        let second = registry.start("u1", sample_profile()).await;

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("old session was not retired")
            .unwrap();
        assert!(first.is_retired());
        assert!(!second.is_retired());
        assert!(Arc::ptr_eq(&registry.get("u1").await.unwrap(), &second));
    }
}
