//! Prompts for the text report and the recommendation narrative.

use super::model::ProposalData;
use crate::assessment::Assessment;
use crate::assessment::prompts::transcript_text;

/// Used when the narrative request fails.
pub const RECOMMENDATIONS_FALLBACK: &str =
    "Detailed recommendations will be provided based on the consultation analysis.";

fn assessment_lines(assessments: &[Assessment]) -> String {
    assessments
        .iter()
        .map(|a| format!("{}: {}/100 - {}", a.category, a.score, a.insights.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn report_prompt(data: &ProposalData) -> String {
    format!(
        "Generate a comprehensive Marketing & PR Requirements Report based on this consultation \
         session:\n\n\
         Messages: {}\n\n\
         Assessments: {}\n\n\
         Create a professional report with:\n\
         1. Executive Summary\n\
         2. Business Context Analysis\n\
         3. Key Findings & Assessments\n\
         4. Strategic Recommendations\n\
         5. Next Steps & Action Items\n\
         6. Implementation Timeline\n\n\
         Format as a detailed business document.",
        transcript_text(&data.messages, "\n\n"),
        assessment_lines(&data.assessments),
    )
}

pub fn recommendations_prompt(data: &ProposalData) -> String {
    let context = &data.business_context;
    format!(
        "Based on this marketing consultation session, generate comprehensive strategic \
         recommendations:\n\n\
         Messages: {}\n\n\
         Assessments: {}\n\n\
         Business Context: Industry: {}, Size: {}, Goals: {}, Challenges: {}\n\n\
         Provide detailed, actionable recommendations that address the specific needs and \
         challenges identified during the consultation. Focus on practical strategies that can \
         drive business growth and improve marketing effectiveness.",
        transcript_text(&data.messages, "\n\n"),
        assessment_lines(&data.assessments),
        context.industry,
        context.size,
        context.goals,
        context.challenges,
    )
}
