//! Conversation sessions: transcript, reply streaming, assessments, and the
//! HTTP/WebSocket surface.

pub mod manager;
pub mod model;
pub mod prompts;
pub mod routes;
pub mod state;

pub use manager::{ConversationSession, ReplyOutcome, SessionRegistry, SessionSettings};
pub use model::{BusinessContext, Message, MessageRole, ReplyPhase, SessionEvent, SessionSnapshot};
