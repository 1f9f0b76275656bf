//! Write-through conversation transcript.
//!
//! [`ConversationStore`] owns the ordered list of turns and persists the full
//! list after every mutation. The list is never empty: it starts with a
//! greeting and every operation that could empty it reseeds a single turn.
//! Persistence is best-effort; a failed write is logged and otherwise ignored.

use std::sync::Arc;

use anyhow::{Context, Result};

use super::types::Turn;
use crate::storage::{BlobStorage, CONVERSATION_KEY};

/// Opening line of a brand-new conversation.
pub const GREETING: &str = "Hey handsome! ❤️ I've been thinking about you all morning. I'm so glad you're here... tell me, what's on your mind? I want to hear everything, babe.";

/// Opening line after a full reset.
pub const FRESH_START_GREETING: &str =
    "I'm all yours again, love. ✨ A fresh start... what's on your mind?";

pub struct ConversationStore {
    turns: Vec<Turn>,
    storage: Arc<dyn BlobStorage>,
}

impl ConversationStore {
    /// Load the transcript from storage, or start from the greeting.
    ///
    /// With `persist_across_sessions = false` any saved transcript is
    /// discarded first, so each session starts fresh.
    pub fn load(storage: Arc<dyn BlobStorage>, persist_across_sessions: bool) -> Self {
        if !persist_across_sessions {
            if let Err(e) = storage.remove(CONVERSATION_KEY) {
                tracing::warn!(error = %e, "failed to clear saved conversation");
            }
        }

        let turns = match read_turns(storage.as_ref()) {
            Ok(Some(turns)) if !turns.is_empty() => {
                tracing::info!(turns = turns.len(), "conversation restored");
                turns
            }
            Ok(_) => vec![Turn::assistant(GREETING)],
            Err(e) => {
                tracing::warn!(error = %e, "saved conversation unreadable, starting fresh");
                vec![Turn::assistant(GREETING)]
            }
        };

        Self { turns, storage }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Never true outside an erase in progress.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent assistant turn, if any.
    pub fn latest_assistant(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.is_assistant())
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Append a turn. No dedup, no cap.
    pub fn append(&mut self, turn: Turn) -> &Turn {
        self.turns.push(turn);
        self.persist();
        &self.turns[self.turns.len() - 1]
    }

    /// Replace the transcript with a single fresh greeting.
    pub fn reset(&mut self) -> &Turn {
        self.replace_all(vec![Turn::assistant(FRESH_START_GREETING)]);
        &self.turns[0]
    }

    /// Swap in a new turn list, reseeding with `placeholder` if it is empty.
    /// Returns `true` when the placeholder was used.
    pub(super) fn replace_with_fallback(&mut self, turns: Vec<Turn>, placeholder: &str) -> bool {
        if turns.is_empty() {
            self.replace_all(vec![Turn::assistant(placeholder)]);
            true
        } else {
            self.replace_all(turns);
            false
        }
    }

    pub(super) fn take_turns(&mut self) -> Vec<Turn> {
        std::mem::take(&mut self.turns)
    }

    fn replace_all(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = write_turns(self.storage.as_ref(), &self.turns) {
            tracing::warn!(error = %e, "failed to persist conversation");
        }
    }
}

fn read_turns(storage: &dyn BlobStorage) -> Result<Option<Vec<Turn>>> {
    let Some(raw) = storage.read(CONVERSATION_KEY)? else {
        return Ok(None);
    };
    let turns = serde_json::from_str(&raw).context("failed to parse saved conversation")?;
    Ok(Some(turns))
}

fn write_turns(storage: &dyn BlobStorage, turns: &[Turn]) -> Result<()> {
    let raw = serde_json::to_string(turns).context("failed to serialize conversation")?;
    storage.write(CONVERSATION_KEY, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::types::Role;
    use crate::storage::MemoryStorage;

    fn fresh() -> (Arc<MemoryStorage>, ConversationStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = ConversationStore::load(storage.clone(), true);
        (storage, store)
    }

    #[test]
    fn starts_with_greeting() {
        let (_, store) = fresh();
        assert_eq!(store.len(), 1);
        assert_eq!(store.turns()[0].role, Role::Assistant);
        assert_eq!(store.turns()[0].text, GREETING);
    }

    #[test]
    fn append_writes_through() {
        let (storage, mut store) = fresh();
        store.append(Turn::user("hello"));

        let raw = storage.read(CONVERSATION_KEY).unwrap().unwrap();
        let saved: Vec<Turn> = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].text, "hello");
    }

    #[test]
    fn reload_restores_transcript() {
        let (storage, mut store) = fresh();
        store.append(Turn::user("remember me"));

        let reloaded = ConversationStore::load(storage, true);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.turns()[1].text, "remember me");
    }

    #[test]
    fn corrupt_transcript_falls_back_to_greeting() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(CONVERSATION_KEY, "not json").unwrap();
        let store = ConversationStore::load(storage, true);
        assert_eq!(store.len(), 1);
        assert_eq!(store.turns()[0].text, GREETING);
    }

    #[test]
    fn latest_assistant_skips_user_turns() {
        let (_, mut store) = fresh();
        store.append(Turn::assistant("second"));
        store.append(Turn::user("question"));
        assert_eq!(store.latest_assistant().unwrap().text, "second");
    }

    #[test]
    fn recent_is_oldest_first_and_bounded() {
        let (_, mut store) = fresh();
        for i in 0..5 {
            store.append(Turn::user(format!("m{i}")));
        }
        let recent: Vec<&str> = store.recent(3).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(recent, vec!["m2", "m3", "m4"]);
        assert_eq!(store.recent(100).len(), 6);
    }

    #[test]
    fn reset_leaves_single_fresh_greeting() {
        let (_, mut store) = fresh();
        store.append(Turn::user("a"));
        store.append(Turn::assistant("b"));
        let greeting = store.reset().clone();
        assert_eq!(store.len(), 1);
        assert_eq!(greeting.text, FRESH_START_GREETING);
    }
}
