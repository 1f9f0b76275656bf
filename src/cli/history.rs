//! CLI `history` command: print the saved transcript.

use anyhow::Result;

use hearth::config::HearthConfig;
use hearth::conversation::{ConversationStore, Role};
use hearth::mood;

/// Print every saved turn, oldest first, followed by the current mood.
pub fn history(config: &HearthConfig) -> Result<()> {
    let storage = super::open_storage(config)?;
    // Read-only view: never wipe the transcript here.
    let store = ConversationStore::load(storage, true);
    let name = &config.conversation.companion_name;

    println!("Conversation ({} turns)", store.len());
    println!("{}", "=".repeat(40));
    for turn in store.turns() {
        let speaker = match turn.role {
            Role::User => "you",
            Role::Assistant => name.as_str(),
        };
        println!(
            "[{}] {speaker}: {}",
            turn.created_at.format("%Y-%m-%d %H:%M"),
            turn.text
        );
    }

    let current = store
        .latest_assistant()
        .map(|t| mood::classify(&t.text))
        .unwrap_or_default();
    println!();
    println!("Mood: {current}");
    Ok(())
}
