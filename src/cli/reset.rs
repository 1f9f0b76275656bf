//! CLI `reset` command: start the conversation over after confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use hearth::config::HearthConfig;

/// Replace the whole transcript with a fresh greeting.
pub async fn reset(config: &HearthConfig, yes: bool) -> Result<()> {
    if !yes {
        println!("This will erase the entire conversation.");
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("reset cancelled");
        }
    }

    let session = super::open_session(config)?;
    if let Some(greeting) = session.reset().await.done() {
        println!("{}: {}", config.conversation.companion_name, greeting.text);
    }
    Ok(())
}
