//! CLI `forget` command: erase recent turns or a topic from the transcript.

use anyhow::{bail, Result};

use hearth::config::HearthConfig;
use hearth::orchestrator::{Erasure, Outcome, Rejection};

/// Drop the last `count` turns (default from config).
pub async fn forget_recent(config: &HearthConfig, count: Option<usize>) -> Result<()> {
    let session = super::open_session(config)?;
    let count = count.unwrap_or(config.conversation.erase_recent_count);
    report(config, session.erase_recent(count).await)
}

/// Drop every turn mentioning `query`.
pub async fn forget_topic(config: &HearthConfig, query: &str) -> Result<()> {
    let session = super::open_session(config)?;
    report(config, session.erase_by_topic(query).await)
}

fn report(config: &HearthConfig, outcome: Outcome<Erasure>) -> Result<()> {
    match outcome {
        Outcome::Done(erasure) => {
            println!("Removed {} turn(s).", erasure.result.removed);
            if erasure.result.reseeded {
                println!("Nothing was left; the conversation was reseeded.");
            }
            println!(
                "{}: {}",
                config.conversation.companion_name, erasure.acknowledgment.text
            );
            Ok(())
        }
        Outcome::Rejected(Rejection::EmptyInput) => bail!("topic must not be blank"),
        Outcome::Rejected(Rejection::Busy(phase)) => bail!("session busy ({phase:?})"),
    }
}
