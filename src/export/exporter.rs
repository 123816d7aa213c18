//! ProposalExporter — turns a session into a downloadable artifact.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use super::model::{ExportArtifact, ExportKind, ExportOptions, ProposalData, export_filename};
use super::prompts::{RECOMMENDATIONS_FALLBACK, recommendations_prompt, report_prompt};
use super::template::{PROPOSAL_TITLE, proposal_deck, proposal_document};
use super::{docx, pptx};
use crate::error::ExportError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::session::ConversationSession;

pub struct ProposalExporter {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
}

impl ProposalExporter {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    async fn ask(&self, prompt: String) -> Result<String, ExportError> {
        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)])
            .with_max_tokens(self.max_tokens);
        Ok(self.llm.complete(request).await?.content)
    }

    /// Recommendation narrative. Never fails: falls back to a placeholder.
    pub async fn recommendations(&self, data: &ProposalData) -> String {
        match self.ask(recommendations_prompt(data)).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("Recommendation narrative came back empty, using placeholder");
                RECOMMENDATIONS_FALLBACK.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Recommendation narrative failed, using placeholder");
                RECOMMENDATIONS_FALLBACK.to_string()
            }
        }
    }

    /// Build the artifact for `kind`.
    ///
    /// Rejected while another export for the same session is running. On
    /// success the session is marked complete.
    pub async fn export(
        &self,
        session: &ConversationSession,
        kind: ExportKind,
        options: ExportOptions,
    ) -> Result<ExportArtifact, ExportError> {
        let _guard = session.try_begin_export()?;
        let today = Utc::now().date_naive();

        let snapshot = session.snapshot().await;
        let profile = session.profile();
        let data = ProposalData::new(
            snapshot.messages,
            snapshot.assessments,
            snapshot.business_context,
            options
                .company_name
                .as_deref()
                .unwrap_or(&profile.company_name),
            options
                .contact_name
                .as_deref()
                .unwrap_or(&profile.full_name),
        );

        info!(user_id = %session.user_id(), %kind, "Export started");
        let artifact = match self.render(kind, data, today).await {
            Ok(artifact) => artifact,
            Err(e) => {
                error!(user_id = %session.user_id(), %kind, error = %e, "Export failed");
                return Err(e);
            }
        };

        session.mark_complete().await;
        info!(
            user_id = %session.user_id(),
            filename = %artifact.filename,
            bytes = artifact.bytes.len(),
            "Export finished"
        );
        Ok(artifact)
    }

    async fn render(
        &self,
        kind: ExportKind,
        mut data: ProposalData,
        date: NaiveDate,
    ) -> Result<ExportArtifact, ExportError> {
        let bytes = match kind {
            ExportKind::Report => self.ask(report_prompt(&data)).await?.into_bytes(),
            ExportKind::Docx => {
                data.recommendations = self.recommendations(&data).await;
                docx::encode(&proposal_document(&data, date))?
            }
            ExportKind::Pptx => {
                data.recommendations = self.recommendations(&data).await;
                let title = format!("{PROPOSAL_TITLE} - {}", data.company_name);
                pptx::encode(&proposal_deck(&data, date), &title)?
            }
        };
        Ok(ExportArtifact {
            filename: export_filename(kind, &data.company_name, date),
            content_type: kind.content_type(),
            bytes,
        })
    }
}
