//! Prompt for assessment generation.

use crate::session::model::Message;

/// Format a transcript as `role: content` lines.
pub fn transcript_text(messages: &[Message], separator: &str) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Build the structured-generation prompt from the conversation so far and
/// the reply that triggered it.
pub fn assessment_prompt(history: &[Message], latest_reply: &str) -> String {
    format!(
        "Based on the conversation history, generate a business assessment with categories, \
         scores (0-100), and key insights. Focus on marketing readiness, brand positioning, \
         target audience clarity, and strategic alignment.\n\n\
         Conversation context: {}\n\
         Latest response: {latest_reply}",
        transcript_text(history, "\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_history_and_latest_reply() {
        let history = vec![
            Message::assistant("Welcome!"),
            Message::user("We sell coffee"),
        ];
        let prompt = assessment_prompt(&history, "Tell me about your customers.");
        assert!(prompt.contains("assistant: Welcome!\nuser: We sell coffee"));
        assert!(prompt.ends_with("Latest response: Tell me about your customers."));
        assert!(prompt.contains("brand positioning"));
    }
}
