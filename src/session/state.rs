//! Conversation state machine.
//!
//! Pure and synchronous; `ConversationSession` wraps it in a mutex and does
//! the I/O. Lifecycle of one reply:
//!
//! ```text
//! Idle/Ready --begin_reply--> AwaitingReply --apply_chunk*--> ... --finish|fail--> Ready
//! ```

use crate::assessment::Assessment;
use crate::error::SessionError;
use crate::llm::ChatMessage;

use super::model::{BusinessContext, Message, MessageRole, ReplyPhase, SessionSnapshot};
use super::prompts::APOLOGY;

/// Progress cap before the explicit completion milestone.
pub const PROGRESS_CEILING: u8 = 95;
const PROGRESS_PER_MESSAGE: usize = 8;

/// Returned by `begin_reply`; carries what the caller needs to drive the
/// stream and to finish the cycle.
#[derive(Debug, Clone)]
pub struct ReplyTicket {
    pub user_message: Message,
    /// Transcript length before the user message was appended.
    pub prior_len: usize,
    /// Completion history (transcript including the new user message).
    pub history: Vec<ChatMessage>,
}

/// In-memory state of one consultation.
#[derive(Debug, Clone)]
pub struct ConversationState {
    transcript: Vec<Message>,
    pending: Option<Message>,
    phase: ReplyPhase,
    progress: u8,
    assessments: Vec<Assessment>,
    context: BusinessContext,
    epoch: u64,
    assessment_fired: bool,
}

impl ConversationState {
    /// A fresh session whose transcript holds only the welcome message.
    pub fn new(welcome: Message, context: BusinessContext) -> Self {
        Self {
            transcript: vec![welcome],
            pending: None,
            phase: ReplyPhase::Idle,
            progress: 0,
            assessments: Vec::new(),
            context,
            epoch: 0,
            assessment_fired: false,
        }
    }

    pub fn phase(&self) -> ReplyPhase {
        self.phase
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn pending(&self) -> Option<&Message> {
        self.pending.as_ref()
    }

    pub fn assessments(&self) -> &[Assessment] {
        &self.assessments
    }

    pub fn context(&self) -> &BusinessContext {
        &self.context
    }

    /// Append the user's message and enter `AwaitingReply`.
    pub fn begin_reply(&mut self, content: &str) -> Result<ReplyTicket, SessionError> {
        if content.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if self.phase == ReplyPhase::AwaitingReply {
            return Err(SessionError::ReplyInFlight);
        }

        let prior_len = self.transcript.len();
        let user_message = Message::user(content);
        self.transcript.push(user_message.clone());
        self.phase = ReplyPhase::AwaitingReply;

        Ok(ReplyTicket {
            user_message,
            prior_len,
            history: self.completion_history(),
        })
    }

    /// Write the accumulated reply text into the pending slot, creating it
    /// on the first chunk. Returns the pending message.
    pub fn apply_chunk(&mut self, accumulated: &str) -> &Message {
        let pending = self
            .pending
            .get_or_insert_with(|| Message::assistant(String::new()));
        pending.content.clear();
        pending.content.push_str(accumulated);
        pending
    }

    /// Commit the pending reply and advance progress. A stream that produced
    /// no text commits nothing.
    pub fn finish(&mut self, prior_len: usize) -> Option<Message> {
        let committed = self.commit_pending();
        self.phase = ReplyPhase::Ready;

        let step = ((prior_len + 1) * PROGRESS_PER_MESSAGE).min(PROGRESS_CEILING as usize) as u8;
        self.progress = self.progress.max(step);
        committed
    }

    /// Commit whatever partial text was shown, then append one apology.
    /// Returns the messages committed by this call.
    pub fn fail(&mut self) -> Vec<Message> {
        let mut committed: Vec<Message> = self.commit_pending().into_iter().collect();
        let apology = Message::assistant(APOLOGY);
        self.transcript.push(apology.clone());
        committed.push(apology);
        self.phase = ReplyPhase::Ready;
        committed
    }

    fn commit_pending(&mut self) -> Option<Message> {
        let mut message = self.pending.take()?;
        if message.content.is_empty() {
            return None;
        }
        message.timestamp = chrono::Utc::now();
        self.transcript.push(message.clone());
        Some(message)
    }

    /// Number of assistant messages in the transcript (welcome included).
    pub fn assistant_count(&self) -> usize {
        self.transcript
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count()
    }

    /// True exactly once per threshold crossing; `reset` re-arms it.
    pub fn take_assessment_trigger(&mut self, threshold: usize) -> bool {
        if self.assessment_fired || self.assistant_count() < threshold {
            return false;
        }
        self.assessment_fired = true;
        true
    }

    /// Replace the assessment set if `epoch` is still current.
    pub fn replace_assessments(&mut self, epoch: u64, assessments: Vec<Assessment>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.assessments = assessments;
        true
    }

    pub fn set_context(&mut self, context: BusinessContext) {
        self.context = context;
    }

    pub fn mark_complete(&mut self) {
        self.progress = 100;
    }

    /// Clear the conversation and start over from `welcome`. The business
    /// context is kept.
    pub fn reset(&mut self, welcome: Message) -> Result<(), SessionError> {
        if self.phase == ReplyPhase::AwaitingReply {
            return Err(SessionError::ReplyInFlight);
        }
        self.transcript = vec![welcome];
        self.pending = None;
        self.assessments.clear();
        self.progress = 0;
        self.phase = ReplyPhase::Idle;
        self.epoch += 1;
        self.assessment_fired = false;
        Ok(())
    }

    /// Transcript as completion messages, in order.
    pub fn completion_history(&self) -> Vec<ChatMessage> {
        self.transcript
            .iter()
            .map(|m| match m.role {
                MessageRole::User => ChatMessage::user(&m.content),
                MessageRole::Assistant => ChatMessage::assistant(&m.content),
            })
            .collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.transcript.clone(),
            pending: self.pending.clone(),
            phase: self.phase,
            progress: self.progress,
            assessments: self.assessments.clone(),
            business_context: self.context.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> ConversationState {
        ConversationState::new(Message::assistant("Welcome!"), BusinessContext::default())
    }

    #[test]
    fn starts_idle_with_welcome() {
        let state = fresh();
        assert_eq!(state.phase(), ReplyPhase::Idle);
        assert_eq!(state.transcript().len(), 1);
        assert_eq!(state.progress(), 0);
        assert!(state.pending().is_none());
    }

    #[test]
    fn empty_message_is_rejected() {
        let mut state = fresh();
        assert!(matches!(
            state.begin_reply("   \n"),
            Err(SessionError::EmptyMessage)
        ));
        assert_eq!(state.transcript().len(), 1);
        assert_eq!(state.phase(), ReplyPhase::Idle);
    }

    #[test]
    fn second_submission_while_awaiting_is_rejected() {
        let mut state = fresh();
        state.begin_reply("first").unwrap();
        assert!(matches!(
            state.begin_reply("second"),
            Err(SessionError::ReplyInFlight)
        ));
        assert_eq!(state.transcript().len(), 2);
    }

    #[test]
    fn ticket_history_ends_with_user_message() {
        let mut state = fresh();
        let ticket = state.begin_reply("Hello").unwrap();
        assert_eq!(ticket.prior_len, 1);
        assert_eq!(ticket.history.len(), 2);
        assert_eq!(ticket.history[1], ChatMessage::user("Hello"));
        assert_eq!(ticket.history[0], ChatMessage::assistant("Welcome!"));
    }

    #[test]
    fn pending_tracks_accumulated_text() {
        let mut state = fresh();
        state.begin_reply("Hi").unwrap();
        let mut accumulated = String::new();
        let mut id = None;
        for chunk in ["Hel", "lo ", "there"] {
            accumulated.push_str(chunk);
            let pending = state.apply_chunk(&accumulated);
            assert_eq!(pending.content, accumulated);
            assert_eq!(*id.get_or_insert(pending.id), pending.id);
        }
        assert_eq!(state.transcript().len(), 2, "pending is not in the transcript");
    }

    #[test]
    fn finish_commits_and_updates_progress() {
        let mut state = fresh();
        let ticket = state.begin_reply("Hi").unwrap();
        state.apply_chunk("Hello");
        let committed = state.finish(ticket.prior_len).unwrap();

        assert_eq!(committed.content, "Hello");
        assert!(state.pending().is_none());
        assert_eq!(state.phase(), ReplyPhase::Ready);
        assert_eq!(state.transcript().len(), 3);
        assert_eq!(state.progress(), 16);
    }

    #[test]
    fn progress_caps_at_ceiling_and_never_decreases() {
        let mut state = fresh();
        let mut last = 0;
        for i in 0..20 {
            let ticket = state.begin_reply(&format!("msg {i}")).unwrap();
            state.apply_chunk("ok");
            state.finish(ticket.prior_len);
            assert!(state.progress() >= last);
            assert!(state.progress() <= PROGRESS_CEILING);
            last = state.progress();
        }
        assert_eq!(state.progress(), PROGRESS_CEILING);

        state.mark_complete();
        assert_eq!(state.progress(), 100);
    }

    #[test]
    fn fail_keeps_partial_and_appends_one_apology() {
        let mut state = fresh();
        state.begin_reply("Hi").unwrap();
        state.apply_chunk("Partial answ");
        let committed = state.fail();

        assert_eq!(committed.len(), 2);
        assert_eq!(committed[0].content, "Partial answ");
        assert_eq!(committed[1].content, APOLOGY);
        let apologies = state
            .transcript()
            .iter()
            .filter(|m| m.content == APOLOGY)
            .count();
        assert_eq!(apologies, 1);
        assert_eq!(state.phase(), ReplyPhase::Ready);
        assert_eq!(state.progress(), 0);
    }

    #[test]
    fn fail_before_any_chunk_only_apologizes() {
        let mut state = fresh();
        state.begin_reply("Hi").unwrap();
        let committed = state.fail();
        assert_eq!(committed.len(), 1);
        assert_eq!(state.transcript().last().unwrap().content, APOLOGY);
    }

    #[test]
    fn assessment_trigger_fires_once_per_crossing() {
        let mut state = fresh();
        let mut fired = Vec::new();
        for i in 0..6 {
            let ticket = state.begin_reply(&format!("msg {i}")).unwrap();
            state.apply_chunk("reply");
            state.finish(ticket.prior_len);
            fired.push(state.take_assessment_trigger(4));
        }
        // Welcome + 3 replies reaches 4 assistant messages.
        assert_eq!(fired, vec![false, false, true, false, false, false]);

        state.reset(Message::assistant("Welcome back")).unwrap();
        assert!(!state.take_assessment_trigger(4));
        for i in 0..3 {
            let ticket = state.begin_reply(&format!("again {i}")).unwrap();
            state.apply_chunk("reply");
            state.finish(ticket.prior_len);
        }
        assert!(state.take_assessment_trigger(4), "reset re-arms the trigger");
    }

    #[test]
    fn stale_epoch_assessments_are_discarded() {
        let mut state = fresh();
        let epoch = state.epoch();
        state.reset(Message::assistant("Welcome!")).unwrap();

        let set = vec![Assessment::new("Brand", 50, vec![])];
        assert!(!state.replace_assessments(epoch, set.clone()));
        assert!(state.assessments().is_empty());
        assert!(state.replace_assessments(state.epoch(), set.clone()));
        assert_eq!(state.assessments(), set.as_slice());
    }

    #[test]
    fn reset_clears_everything_but_context() {
        let mut state = fresh();
        state.set_context(BusinessContext {
            goals: "Grow wholesale".to_string(),
            ..Default::default()
        });
        let ticket = state.begin_reply("Hi").unwrap();
        state.apply_chunk("Hello");
        state.finish(ticket.prior_len);
        state.replace_assessments(state.epoch(), vec![Assessment::new("Brand", 50, vec![])]);

        state.reset(Message::assistant("Welcome again")).unwrap();
        assert_eq!(state.transcript().len(), 1);
        assert_eq!(state.transcript()[0].content, "Welcome again");
        assert_eq!(state.progress(), 0);
        assert!(state.assessments().is_empty());
        assert_eq!(state.phase(), ReplyPhase::Idle);
        assert_eq!(state.epoch(), 1);
        assert_eq!(state.context().goals, "Grow wholesale");
    }

    #[test]
    fn reset_is_rejected_while_awaiting() {
        let mut state = fresh();
        state.begin_reply("Hi").unwrap();
        assert!(matches!(
            state.reset(Message::assistant("x")),
            Err(SessionError::ReplyInFlight)
        ));
        assert_eq!(state.transcript().len(), 2);
    }
}
