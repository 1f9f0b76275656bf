//! CLI `chat` command: interactive conversation on stdin/stdout.
//!
//! Plain lines are sent to the companion. Slash commands manage the session:
//! `/reset`, `/forget`, `/forget <topic>`, `/voice`, `/mood`, `/settings`,
//! `/set <flirt|explicit|topics> <value>`, `/quit`.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};

use hearth::config::HearthConfig;
use hearth::orchestrator::{Orchestrator, Outcome, Rejection};
use hearth::settings::PreferenceUpdate;

enum Command<'a> {
    Say(&'a str),
    Reset,
    ForgetRecent,
    ForgetTopic(&'a str),
    Voice,
    Mood,
    Settings,
    Set(&'a str),
    Quit,
    Unknown(&'a str),
}

fn parse(line: &str) -> Command<'_> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line);
    };
    let (name, arg) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(n, a)| (n, a.trim()));
    match (name, arg) {
        ("reset", _) => Command::Reset,
        ("forget", "") => Command::ForgetRecent,
        ("forget", topic) => Command::ForgetTopic(topic),
        ("voice", _) => Command::Voice,
        ("mood", _) => Command::Mood,
        ("settings", _) => Command::Settings,
        ("set", arg) => Command::Set(arg),
        ("quit" | "exit", _) => Command::Quit,
        _ => Command::Unknown(name),
    }
}

/// Run the interactive chat loop until EOF or `/quit`.
pub async fn chat(config: &HearthConfig) -> Result<()> {
    let session = super::open_session(config)?;
    let name = config.conversation.companion_name.as_str();

    for turn in session.turns() {
        print_turn(name, turn.is_assistant(), &turn.text);
    }
    println!("(/forget, /forget <topic>, /reset, /voice, /mood, /settings, /set <key> <value>, /quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse(&line) {
            Command::Say("") => continue,
            Command::Say(text) => send(&session, name, text).await,
            Command::Reset => {
                if let Outcome::Done(greeting) = session.reset().await {
                    println!("✨ Conversation reset.");
                    print_turn(name, true, &greeting.text);
                }
            }
            Command::ForgetRecent => {
                let outcome = session
                    .erase_recent(config.conversation.erase_recent_count)
                    .await;
                if let Outcome::Done(erasure) = outcome {
                    println!("({} turn(s) forgotten)", erasure.result.removed);
                    print_turn(name, true, &erasure.acknowledgment.text);
                }
            }
            Command::ForgetTopic(topic) => {
                if let Outcome::Done(erasure) = session.erase_by_topic(topic).await {
                    println!("({} turn(s) about \"{topic}\" forgotten)", erasure.result.removed);
                    print_turn(name, true, &erasure.acknowledgment.text);
                }
            }
            Command::Voice => {
                let enabled = session.toggle_voice();
                println!("Voice {}.", if enabled { "on" } else { "off" });
            }
            Command::Mood => println!("Mood: {}", session.current_mood()),
            Command::Settings => super::settings::print_prefs(&session.preferences()),
            Command::Set(arg) => {
                let (key, value) = arg
                    .split_once(char::is_whitespace)
                    .unwrap_or((arg, ""));
                match PreferenceUpdate::parse(key, value) {
                    Ok(update) => {
                        session.save_preferences(update.apply_to(&session.preferences()));
                        super::settings::print_prefs(&session.preferences());
                    }
                    Err(e) => println!("{e}"),
                }
            }
            Command::Quit => break,
            Command::Unknown(cmd) => println!("Unknown command: /{cmd}"),
        }
    }

    Ok(())
}

async fn send(session: &Orchestrator, name: &str, text: &str) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("{name} is typing..."));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = session.submit(text).await;
    spinner.finish_and_clear();

    match outcome {
        Outcome::Done(reply) => {
            print_turn(name, true, &reply.turn.text);
            tracing::debug!(mood = %reply.mood, spoken = reply.spoken, "reply shown");
        }
        Outcome::Rejected(Rejection::Busy(phase)) => println!("(still busy: {phase:?})"),
        Outcome::Rejected(Rejection::EmptyInput) => {}
    }
}

fn print_turn(name: &str, assistant: bool, text: &str) {
    if assistant {
        println!("{name}: {text}");
    } else {
        println!("you: {text}");
    }
}
