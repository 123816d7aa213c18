//! AssessmentEngine — turns a conversation into scored assessments.

use std::sync::Arc;

use tracing::{debug, info};

use super::model::{Assessment, assessment_schema, parse_assessments};
use super::prompts::assessment_prompt;
use crate::error::LlmError;
use crate::llm::LlmProvider;
use crate::session::model::Message;

/// Requests structured assessments from the LLM.
pub struct AssessmentEngine {
    llm: Arc<dyn LlmProvider>,
    schema: serde_json::Value,
}

impl AssessmentEngine {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            schema: assessment_schema(),
        }
    }

    /// Generate a fresh assessment set. The caller decides whether to apply
    /// it; nothing here touches session state.
    pub async fn generate(
        &self,
        history: &[Message],
        latest_reply: &str,
    ) -> Result<Vec<Assessment>, LlmError> {
        let prompt = assessment_prompt(history, latest_reply);
        debug!(messages = history.len(), "Requesting assessments");

        let object = self.llm.generate_object(&prompt, &self.schema).await?;
        let assessments =
            parse_assessments(&object).ok_or_else(|| LlmError::InvalidResponse {
                provider: self.llm.model_name().to_string(),
                reason: "object has no assessments array".to_string(),
            })?;

        info!(count = assessments.len(), "Assessments generated");
        Ok(assessments)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::{CompletionRequest, CompletionResponse, FinishReason};

    /// Replies to every completion with a fixed body and records prompts.
    struct CannedLlm {
        body: String,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedLlm {
        fn new(body: &str) -> Arc<Self> {
            Arc::new(Self {
                body: body.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for CannedLlm {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.prompts.lock().unwrap().push(last);
            Ok(CompletionResponse {
                content: self.body.clone(),
                input_tokens: 0,
                output_tokens: 0,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
    }

    #[tokio::test]
    async fn generate_parses_fenced_json() {
        let llm = CannedLlm::new(
            "```json\n{\"assessments\":[{\"category\":\"Brand\",\"score\":81,\"insights\":[\"x\"]}]}\n```",
        );
        let engine = AssessmentEngine::new(llm.clone());
        let history = vec![Message::user("We roast coffee")];

        let assessments = engine.generate(&history, "Great.").await.unwrap();
        assert_eq!(assessments, vec![Assessment::new("Brand", 81, vec!["x".into()])]);

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("user: We roast coffee"));
    }

    #[tokio::test]
    async fn object_without_assessments_is_an_error() {
        let engine = AssessmentEngine::new(CannedLlm::new("{\"summary\": \"n/a\"}"));
        let err = engine.generate(&[], "latest").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn non_json_reply_is_an_error() {
        let engine = AssessmentEngine::new(CannedLlm::new("I cannot do that."));
        assert!(engine.generate(&[], "latest").await.is_err());
    }
}
