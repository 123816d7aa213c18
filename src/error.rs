//! Error types for AI Consult.

use std::collections::BTreeMap;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Stream from {provider} broke: {reason}")]
    StreamInterrupted { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-field validation messages, keyed by the field's wire name.
pub type FieldErrors = BTreeMap<&'static str, String>;

/// Business profile submission errors.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Profile validation failed for {} field(s)", .0.len())]
    Invalid(FieldErrors),

    #[error("Failed to save profile: {0}")]
    Persist(#[from] DatabaseError),
}

impl ProfileError {
    /// Field errors to show on the form. Persistence failures are reported
    /// against the email field so the form stays resubmittable.
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            Self::Invalid(errors) => errors.clone(),
            Self::Persist(_) => {
                let mut errors = FieldErrors::new();
                errors.insert(
                    "companyEmail",
                    "Failed to save profile. Please try again.".to_string(),
                );
                errors
            }
        }
    }
}

/// Conversation session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("A reply is already being generated")]
    ReplyInFlight,

    #[error("No business profile for user {user_id}")]
    ProfileRequired { user_id: String },
}

/// Proposal export errors.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Unknown export kind: {0}")]
    UnknownKind(String),

    #[error("An export is already running for this session")]
    InProgress,

    #[error("Report generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("Encoding {format} failed: {reason}")]
    Encoding { format: &'static str, reason: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_failure_maps_to_email_field() {
        let err = ProfileError::Persist(DatabaseError::Query("disk full".to_string()));
        let fields = err.field_errors();
        assert_eq!(fields.len(), 1);
        assert!(fields["companyEmail"].contains("Failed to save profile"));
    }

    #[test]
    fn invalid_reports_field_count() {
        let mut fields = FieldErrors::new();
        fields.insert("fullName", "Full name is required".to_string());
        fields.insert("industry", "Industry is required".to_string());
        let err = ProfileError::Invalid(fields);
        assert_eq!(err.to_string(), "Profile validation failed for 2 field(s)");
    }
}
