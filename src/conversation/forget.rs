//! Transcript erasure.
//!
//! Two ways to forget: drop the most recent turns, or drop every turn that
//! mentions a topic. Neither can leave the transcript empty.

use serde::Serialize;

use super::store::ConversationStore;

/// Turns dropped by a default "forget our last moment".
pub const DEFAULT_ERASE_RECENT: usize = 4;

/// Seeded when a topic erase removes every turn.
pub const CLEARED_PLACEHOLDER: &str = "My mind feels so clear now... did something happen? ❤️";

/// Assistant reaction appended after any erase.
pub const ERASE_ACKNOWLEDGMENT: &str = "Mmm... I feel like a secret just vanished. I only want to remember the good things with you anyway. ❤️";

/// Result returned from an erase operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EraseResult {
    /// Number of turns removed.
    pub removed: usize,
    /// `true` if the transcript was reseeded with a placeholder turn.
    pub reseeded: bool,
}

impl ConversationStore {
    /// Drop the last `min(n, len - 1)` turns. The first turn always survives.
    pub fn erase_recent(&mut self, n: usize) -> EraseResult {
        let mut turns = self.take_turns();
        let keep = turns.len().saturating_sub(n).max(1).min(turns.len());
        let removed = turns.len() - keep;
        turns.truncate(keep);
        let reseeded = self.replace_with_fallback(turns, CLEARED_PLACEHOLDER);

        tracing::info!(removed, remaining = self.len(), "erased recent turns");
        EraseResult { removed, reseeded }
    }

    /// Drop every turn whose text contains `query`, ignoring case.
    ///
    /// The query is trimmed first; a blank query removes nothing.
    pub fn erase_by_topic(&mut self, query: &str) -> EraseResult {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return EraseResult {
                removed: 0,
                reseeded: false,
            };
        }

        let turns = self.take_turns();
        let before = turns.len();
        let kept: Vec<_> = turns
            .into_iter()
            .filter(|t| !t.text.to_lowercase().contains(&needle))
            .collect();
        let removed = before - kept.len();
        let reseeded = self.replace_with_fallback(kept, CLEARED_PLACEHOLDER);

        tracing::info!(removed, reseeded, remaining = self.len(), "erased turns by topic");
        EraseResult { removed, reseeded }
    }
}
