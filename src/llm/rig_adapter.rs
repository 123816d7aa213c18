//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use futures::StreamExt;
use rig::completion::{CompletionError, CompletionModel};
use rig::message::{AssistantContent, Message};
use rig::streaming::StreamedAssistantContent;

use super::provider::{
    ChatMessage, ChunkStream, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    Role,
};
use crate::error::LlmError;

/// Wraps any rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: String,
    default_max_tokens: u32,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &str, default_max_tokens: u32) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider: provider.to_string(),
            default_max_tokens,
        }
    }

    fn builder(
        &self,
        request: &CompletionRequest,
    ) -> Result<rig::completion::CompletionRequestBuilder<M>, LlmError> {
        let parts = RequestParts::split(request).ok_or_else(|| LlmError::RequestFailed {
            provider: self.provider.clone(),
            reason: "request has no user or assistant messages".to_string(),
        })?;

        let max_tokens = request.max_tokens.unwrap_or(self.default_max_tokens);
        let mut builder = self
            .model
            .completion_request(to_rig_message(&parts.prompt))
            .messages(parts.history.iter().map(to_rig_message).collect())
            .max_tokens(u64::from(max_tokens));
        if let Some(preamble) = parts.preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        Ok(builder)
    }
}

/// A request reshaped for rig: system text becomes the preamble and the
/// final message becomes the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestParts {
    preamble: Option<String>,
    history: Vec<ChatMessage>,
    prompt: ChatMessage,
}

impl RequestParts {
    fn split(request: &CompletionRequest) -> Option<Self> {
        let mut history: Vec<ChatMessage> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect();
        let prompt = history.pop()?;
        Some(Self {
            preamble: request.system_prompt(),
            history,
            prompt,
        })
    }
}

fn to_rig_message(message: &ChatMessage) -> Message {
    match message.role {
        Role::Assistant => Message::assistant(message.content.clone()),
        Role::User | Role::System => Message::user(message.content.clone()),
    }
}

/// Sort rig errors into auth failures and everything else.
fn request_error(provider: &str, error: CompletionError) -> LlmError {
    classify(provider, error.to_string())
}

fn classify(provider: &str, reason: String) -> LlmError {
    let lower = reason.to_ascii_lowercase();
    if lower.contains("401") || lower.contains("authentication_error") {
        LlmError::AuthFailed {
            provider: provider.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
    M::StreamingResponse: Send + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let response = self
            .builder(&request)?
            .send()
            .await
            .map_err(|e| request_error(&self.provider, e))?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();

        Ok(CompletionResponse {
            content,
            input_tokens: u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX),
            output_tokens: u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX),
            finish_reason: FinishReason::Unknown,
            response_id: None,
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ChunkStream, LlmError> {
        let stream = self
            .builder(&request)?
            .stream()
            .await
            .map_err(|e| request_error(&self.provider, e))?;

        let provider = self.provider.clone();
        let chunks = stream.filter_map(move |item| {
            let provider = provider.clone();
            async move {
                match item {
                    Ok(StreamedAssistantContent::Text(text)) => Some(Ok(text.text)),
                    Ok(_) => None,
                    Err(e) => Some(Err(LlmError::StreamInterrupted {
                        provider,
                        reason: e.to_string(),
                    })),
                }
            }
        });
        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_become_the_preamble() {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("You are a consultant."),
            ChatMessage::assistant("Welcome!"),
            ChatMessage::user("We roast coffee."),
        ]);
        let parts = RequestParts::split(&request).unwrap();

        assert_eq!(parts.preamble.as_deref(), Some("You are a consultant."));
        assert_eq!(parts.history, vec![ChatMessage::assistant("Welcome!")]);
        assert_eq!(parts.prompt, ChatMessage::user("We roast coffee."));
    }

    #[test]
    fn system_only_request_has_no_prompt() {
        let request = CompletionRequest::new(vec![ChatMessage::system("rules")]);
        assert!(RequestParts::split(&request).is_none());
    }

    #[test]
    fn roles_map_onto_rig_messages() {
        assert!(matches!(
            to_rig_message(&ChatMessage::user("hi")),
            Message::User { .. }
        ));
        assert!(matches!(
            to_rig_message(&ChatMessage::assistant("hello")),
            Message::Assistant { .. }
        ));
    }

    #[test]
    fn auth_errors_are_recognised() {
        assert!(matches!(
            classify("anthropic", "HTTP 401: authentication_error".to_string()),
            LlmError::AuthFailed { .. }
        ));
        assert!(matches!(
            classify("anthropic", "overloaded".to_string()),
            LlmError::RequestFailed { .. }
        ));
    }
}
