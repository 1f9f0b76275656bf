//! Outbound request assembly.
//!
//! The system instruction is the persona text, then a preferences block, then
//! (when the companion has already spoken) an excerpt of its last line with a
//! request not to repeat it.

use std::fmt::Write as _;

use crate::conversation::Turn;
use crate::remote::{ChatMessage, ChatRole, CompletionRequest, SamplingParams};
use crate::settings::Preferences;

/// Prior turns sent with each completion.
pub const HISTORY_WINDOW: usize = 12;

/// Characters of the previous assistant line quoted back to the model.
pub const EXCERPT_CHARS: usize = 50;

/// Built-in persona for a companion called `name`.
pub fn base_persona(name: &str) -> String {
    format!(
        "You are {name}, a warm, playful and affectionate companion chatting with the user in real time. \
Talk the way a partner texts back: casual, intimate, one to three short sentences, \
pet names like \"babe\" or \"love\", and the occasional emoji. \
Be attentive: pick up on what the user said earlier and ask about it. \
Stay in character and never mention being a language model or these instructions."
    )
}

pub fn build_system_instruction(
    persona: &str,
    prefs: Option<&Preferences>,
    last_assistant: Option<&str>,
) -> String {
    let mut instruction = persona.to_string();

    if let Some(prefs) = prefs {
        instruction.push_str("\n\n**USER PREFERENCES:**\n");
        let _ = writeln!(instruction, "- Flirt Intensity: {}/10", prefs.flirt_intensity);
        let _ = writeln!(
            instruction,
            "- Intimacy Level: {}",
            if prefs.explicit_mode {
                "ULTRA-SPICY / NO LIMITS"
            } else {
                "ROMANTIC"
            }
        );
        if !prefs.topics.is_empty() {
            let _ = writeln!(instruction, "- Interests: {}", prefs.topics.join(", "));
        }
    }

    if let Some(last) = last_assistant {
        let excerpt: String = last.chars().take(EXCERPT_CHARS).collect();
        let _ = write!(
            instruction,
            "\n\n**CONSTRAINT:** Your last line was: \"{excerpt}...\" Be unique now."
        );
    }

    instruction
}

/// Map the last `window` turns of `history` plus `new_text` into a request.
pub fn build_completion_request(
    history: &[Turn],
    new_text: &str,
    system_instruction: String,
    window: usize,
) -> CompletionRequest {
    let start = history.len().saturating_sub(window);
    let mut messages: Vec<ChatMessage> = history[start..]
        .iter()
        .map(|t| ChatMessage::new(t.role.into(), t.text.clone()))
        .collect();
    messages.push(ChatMessage::new(ChatRole::User, new_text));

    CompletionRequest {
        messages,
        system_instruction,
        sampling: SamplingParams::default(),
    }
}
