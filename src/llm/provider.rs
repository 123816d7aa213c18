//! Provider-agnostic LLM types and the `LlmProvider` trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// All system messages joined into one instruction block.
    pub fn system_prompt(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        (!parts.is_empty()).then(|| parts.join("\n\n"))
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    Unknown,
}

/// A non-streamed completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: FinishReason,
    pub response_id: Option<String>,
}

/// Text chunks of a streamed completion, in arrival order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// A language-model backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Run a completion and return the whole text.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Run a completion and yield text chunks as they arrive.
    ///
    /// Providers without native streaming yield the whole reply as one chunk.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<ChunkStream, LlmError> {
        let response = self.complete(request).await?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok::<_, LlmError>(response.content)
        })))
    }

    /// Ask the model for a single JSON object matching `schema`.
    async fn generate_object(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError> {
        let instruction = format!(
            "You are a data extraction assistant. Output only valid JSON that matches this \
             JSON schema, with no explanation or markdown formatting:\n{schema}"
        );
        let request = CompletionRequest::new(vec![
            ChatMessage::system(instruction),
            ChatMessage::user(prompt),
        ])
        .with_temperature(0.0);

        let response = self.complete(request).await?;
        parse_json_object(&response.content).map_err(|reason| LlmError::InvalidResponse {
            provider: self.model_name().to_string(),
            reason,
        })
    }
}

/// Parse a JSON object out of model output, tolerating a surrounding
/// markdown code fence or leading prose.
pub fn parse_json_object(raw: &str) -> Result<serde_json::Value, String> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    if let Ok(value @ serde_json::Value::Object(_)) = serde_json::from_str(unfenced) {
        return Ok(value);
    }

    let start = unfenced.find('{');
    let end = unfenced.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if end > start => {
            match serde_json::from_str(&unfenced[start..=end]) {
                Ok(value @ serde_json::Value::Object(_)) => Ok(value),
                Ok(_) => Err("expected a JSON object".to_string()),
                Err(e) => Err(format!("invalid JSON: {e}")),
            }
        }
        _ => Err("no JSON object in response".to_string()),
    }
}
