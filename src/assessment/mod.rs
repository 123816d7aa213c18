//! Assessment generation from consultation transcripts.

pub mod engine;
pub mod model;
pub mod prompts;

pub use engine::AssessmentEngine;
pub use model::Assessment;
