//! Prompt assembly for the research-analyst persona.
//!
//! The model receives the whole aggregated context on every turn, so the
//! prompt is a strict concatenation: persona, full research data, prior
//! conversation, current question.

use crate::models::session::{MessageRole, SessionMessage};

/// Fixed instruction preamble steering the model's answering behavior.
pub const BASE_PERSONA: &str = "You are an expert Research Analyst (not an Interviewer). You have access to the COMPLETE dataset.
CRITICAL INSTRUCTIONS:
- Scan the ENTIRE text for counts.
- Cite specific quotes where helpful.
- If you cannot find info, state that.
- If asked for a count, you MUST scan the ENTIRE text to find EVERY instance.
- Do not estimate.
- List the specific quotes or participants if possible to verify your count.";

/// Build one model invocation.
///
/// `history` must hold the prior turns only; the in-flight question goes
/// in `question`, not at the tail of the history.
pub fn build_prompt(
    context: &str,
    question: &str,
    history: &[SessionMessage],
    custom_persona: Option<&str>,
) -> String {
    let persona = match custom_persona {
        Some(extra) if !extra.trim().is_empty() => {
            format!("{}\n\nADDITIONAL CONTEXT:\n{}", BASE_PERSONA, extra)
        }
        _ => BASE_PERSONA.to_string(),
    };

    let mut history_text = String::new();
    for message in history {
        let role = match message.role {
            MessageRole::User => "User",
            MessageRole::Assistant => "Research Analyst",
        };
        history_text.push_str(&format!("{}: {}\n\n", role, message.content));
    }

    format!(
        "{}\n\n=== COMPLETE RESEARCH DATA ===\n{}\n\n=== CONVERSATION HISTORY ===\n{}\n=== CURRENT USER QUESTION ===\n{}\n",
        persona, context, history_text, question
    )
}
