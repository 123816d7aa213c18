//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Default model used for every completion request.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Service configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct ConsultConfig {
    /// Model name passed to the LLM provider.
    pub model: String,
    /// HTTP/WebSocket listen port.
    pub port: u16,
    /// Path to the libSQL database file.
    pub db_path: PathBuf,
    /// Number of assistant messages after which assessments are generated.
    pub assessment_threshold: usize,
    /// Max tokens for chat replies and exports.
    pub max_tokens: u32,
    /// Directory for rolling log files (stderr only when unset).
    pub log_dir: Option<PathBuf>,
}

impl Default for ConsultConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            port: 8080,
            db_path: PathBuf::from("./data/ai-consult.db"),
            assessment_threshold: 4,
            max_tokens: 2048,
            log_dir: None,
        }
    }
}

impl ConsultConfig {
    /// Build from `AI_CONSULT_*` environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            model: lookup("AI_CONSULT_MODEL").unwrap_or(defaults.model),
            port: parse_or(&lookup, "AI_CONSULT_PORT", defaults.port),
            db_path: lookup("AI_CONSULT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            assessment_threshold: parse_or(
                &lookup,
                "AI_CONSULT_ASSESSMENT_THRESHOLD",
                defaults.assessment_threshold,
            )
            .max(1),
            max_tokens: parse_or(&lookup, "AI_CONSULT_MAX_TOKENS", defaults.max_tokens),
            log_dir: lookup("AI_CONSULT_LOG_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring invalid configuration value");
                default
            }
        },
        None => default,
    }
}

/// Read the Anthropic API key from the environment.
pub fn api_key_from_env() -> Result<secrecy::SecretString, ConfigError> {
    std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .map(secrecy::SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))
}
