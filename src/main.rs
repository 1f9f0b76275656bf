mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hearth::config::HearthConfig;
use hearth::settings::PreferenceUpdate;

#[derive(Parser)]
#[command(name = "hearth", version, about = "Mood-aware companion chat in your terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat session
    Chat {
        /// Speak replies (writes WAV files to the voice directory)
        #[arg(long)]
        voice: bool,
    },
    /// Print the saved conversation
    History,
    /// Erase part of the conversation
    Forget {
        #[command(subcommand)]
        target: ForgetTarget,
    },
    /// Start the conversation over
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show or change preferences
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum ForgetTarget {
    /// Forget the most recent turns
    Recent {
        /// Number of turns to drop
        #[arg(long)]
        count: Option<usize>,
    },
    /// Forget every turn mentioning a topic
    Topic {
        /// Case-insensitive text to match
        query: String,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current preferences
    Show,
    /// Update preferences
    Set {
        /// Flirt intensity, 1-10
        #[arg(long)]
        flirt: Option<u8>,
        /// Explicit mode on or off
        #[arg(long)]
        explicit: Option<bool>,
        /// Comma-separated interests (empty string clears them)
        #[arg(long)]
        topics: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = HearthConfig::load()?;

    // Log to stderr so the transcript on stdout stays clean.
    let filter = EnvFilter::try_new(&config.log.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Chat { voice } => {
            config.voice.enabled |= voice;
            cli::chat::chat(&config).await?;
        }
        Command::History => cli::history::history(&config)?,
        Command::Forget { target } => match target {
            ForgetTarget::Recent { count } => cli::forget::forget_recent(&config, count).await?,
            ForgetTarget::Topic { query } => cli::forget::forget_topic(&config, &query).await?,
        },
        Command::Reset { yes } => cli::reset::reset(&config, yes).await?,
        Command::Settings { action } => match action {
            SettingsAction::Show => cli::settings::show(&config)?,
            SettingsAction::Set {
                flirt,
                explicit,
                topics,
            } => cli::settings::set(
                &config,
                PreferenceUpdate {
                    flirt_intensity: flirt,
                    explicit_mode: explicit,
                    topics,
                },
            )?,
        },
    }

    Ok(())
}
