//! Conversation data models: messages, business context, snapshots, and
//! the events pushed to WebSocket subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::Assessment;
use crate::profile::BusinessProfile;

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Free-form business context the user edits alongside the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessContext {
    pub industry: String,
    pub size: String,
    pub goals: String,
    pub challenges: String,
}

impl BusinessContext {
    /// Seed industry and size from the profile; goals and challenges start empty.
    pub fn from_profile(profile: &BusinessProfile) -> Self {
        Self {
            industry: profile.industry.clone(),
            size: profile.company_size.label().to_string(),
            goals: String::new(),
            challenges: String::new(),
        }
    }
}

/// Where the session is in its reply cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyPhase {
    /// No reply has completed yet.
    Idle,
    /// A reply is streaming; new submissions are rejected.
    AwaitingReply,
    /// At least one reply has finished.
    Ready,
}

/// A consistent copy of the session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub pending: Option<Message>,
    pub phase: ReplyPhase,
    pub progress: u8,
    pub assessments: Vec<Assessment>,
    pub business_context: BusinessContext,
}

/// Events broadcast to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Full state, sent on connect and after a lagged receiver.
    Snapshot { snapshot: SessionSnapshot },
    /// A message was committed to the transcript.
    MessageAppended { message: Message },
    /// The pending reply grew; `content` is the full text so far.
    StreamChunk { message_id: Uuid, content: String },
    /// The reply cycle ended (successfully or with an apology).
    ReplyFinished { progress: u8 },
    AssessmentsUpdated { assessments: Vec<Assessment> },
    Progress { progress: u8 },
    ContextUpdated { business_context: BusinessContext },
    SessionReset { snapshot: SessionSnapshot },
}
