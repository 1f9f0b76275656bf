//! Send-message state machine.
//!
//! [`Orchestrator`] sequences a user message through the remote completion,
//! mood derivation and optional speech, and runs the erase operations. It is
//! single-flight: while a [`Phase`] other than `Idle` is active, new sends and
//! erases are rejected (dropped, not queued). Remote failures never escape;
//! they become fallback assistant turns or silent speech.
//!
//! Locking: the internal mutex is never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;

use crate::audio::{self, AudioSink};
use crate::config::HearthConfig;
use crate::conversation::forget::{EraseResult, ERASE_ACKNOWLEDGMENT};
use crate::conversation::{ConversationStore, Turn};
use crate::mood::{self, Mood};
use crate::prompt;
use crate::remote::{Completion, CompletionService, RemoteError, SpeechRequest, SpeechService};
use crate::settings::{Preferences, SettingsStore};

/// Substituted when the completion is safety-blocked or empty.
pub const BLOCKED_FALLBACKS: [&str; 3] = [
    "Mmm, you're making me blush... tell me more about that fantasy, love. ❤️",
    "That's so naughty... I love it when you talk to me like that. Don't stop.",
    "I'm all yours, babe. Every dark, sweet thought you have... I want to hear it.",
];

/// Substituted when the completion request fails outright, including when no
/// API key is configured.
pub const CONNECTION_FALLBACK: &str =
    "I'm so lost in our connection right now... say that again for me, babe? ❤️";

/// Where the orchestrator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingCompletion,
    AwaitingSpeech,
    Erasing,
}

impl Phase {
    /// Any phase but `Idle` blocks new sends and erases.
    pub fn is_blocked(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Why an action was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyInput,
    Busy(Phase),
}

/// Result of a guarded action.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    Blocked,
    Empty,
    Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Model,
    Fallback(FallbackReason),
}

/// The assistant turn produced by a send.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub turn: Turn,
    pub mood: Mood,
    pub source: ReplySource,
    /// Whether synthesized audio reached the sink.
    pub spoken: bool,
}

/// What an erase did, plus the acknowledgment turn appended after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Erasure {
    pub result: EraseResult,
    pub acknowledgment: Turn,
    pub spoken: bool,
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub persona: String,
    pub history_window: usize,
    pub erase_pause: Duration,
    pub reset_pause: Duration,
    pub voice_enabled: bool,
    pub voice_name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from_config(&HearthConfig::default())
    }
}

impl OrchestratorOptions {
    pub fn from_config(config: &HearthConfig) -> Self {
        let persona = config
            .conversation
            .persona
            .clone()
            .unwrap_or_else(|| prompt::base_persona(&config.conversation.companion_name));
        Self {
            persona,
            history_window: config.conversation.history_window,
            erase_pause: Duration::from_millis(config.conversation.erase_pause_ms),
            reset_pause: Duration::from_millis(config.conversation.reset_pause_ms),
            voice_enabled: config.voice.enabled,
            voice_name: config.voice.voice_name.clone(),
            sample_rate: config.voice.sample_rate,
            channels: config.voice.channels,
        }
    }
}

struct State {
    phase: Phase,
    speaking: bool,
    voice_enabled: bool,
    conversation: ConversationStore,
    settings: SettingsStore,
    rng: Box<dyn RngCore + Send>,
}

pub struct Orchestrator {
    state: Mutex<State>,
    completion: Arc<dyn CompletionService>,
    speech: Arc<dyn SpeechService>,
    sink: Arc<dyn AudioSink>,
    options: OrchestratorOptions,
}

/// Returns the orchestrator to `Idle` when a guarded action ends, including
/// when its future is dropped mid-flight.
struct PhaseGuard<'a> {
    orchestrator: &'a Orchestrator,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.orchestrator.state();
        state.phase = Phase::Idle;
        state.speaking = false;
    }
}

impl Orchestrator {
    pub fn new(
        conversation: ConversationStore,
        settings: SettingsStore,
        completion: Arc<dyn CompletionService>,
        speech: Arc<dyn SpeechService>,
        sink: Arc<dyn AudioSink>,
        options: OrchestratorOptions,
    ) -> Self {
        let state = State {
            phase: Phase::Idle,
            speaking: false,
            voice_enabled: options.voice_enabled,
            conversation,
            settings,
            rng: Box::new(StdRng::from_os_rng()),
        };
        Self {
            state: Mutex::new(state),
            completion,
            speech,
            sink,
            options,
        }
    }

    /// Replace the random source used to pick fallback replies.
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .rng = Box::new(rng);
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move from `Idle` into `phase`, or report what is blocking.
    fn enter(&self, phase: Phase) -> Result<PhaseGuard<'_>, Rejection> {
        let mut state = self.state();
        if state.phase.is_blocked() {
            tracing::debug!(current = ?state.phase, requested = ?phase, "action rejected while busy");
            return Err(Rejection::Busy(state.phase));
        }
        state.phase = phase;
        Ok(PhaseGuard { orchestrator: self })
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn is_speaking(&self) -> bool {
        self.state().speaking
    }

    pub fn voice_enabled(&self) -> bool {
        self.state().voice_enabled
    }

    pub fn set_voice_enabled(&self, enabled: bool) {
        self.state().voice_enabled = enabled;
        tracing::info!(enabled, "voice output toggled");
    }

    /// Flip voice output and return the new setting.
    pub fn toggle_voice(&self) -> bool {
        let enabled = !self.voice_enabled();
        self.set_voice_enabled(enabled);
        enabled
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.state().conversation.turns().to_vec()
    }

    pub fn turn_count(&self) -> usize {
        self.state().conversation.len()
    }

    /// Mood of the latest assistant turn; neutral when there is none.
    pub fn current_mood(&self) -> Mood {
        self.state()
            .conversation
            .latest_assistant()
            .map(|t| mood::classify(&t.text))
            .unwrap_or_default()
    }

    pub fn preferences(&self) -> Preferences {
        self.state().settings.get().clone()
    }

    pub fn save_preferences(&self, prefs: Preferences) {
        self.state().settings.save(prefs);
        tracing::info!("preferences saved");
    }

    // ── Send ────────────────────────────────────────────────────────────

    /// Send a user message and produce the assistant's reply.
    ///
    /// Rejected when `text` is blank or another action is in flight.
    /// Otherwise always yields a reply turn, substituting a fallback line
    /// when the completion fails or is withheld.
    pub async fn submit(&self, text: &str) -> Outcome<Reply> {
        let text = text.trim();
        if text.is_empty() {
            return Outcome::Rejected(Rejection::EmptyInput);
        }
        let _guard = match self.enter(Phase::AwaitingCompletion) {
            Ok(guard) => guard,
            Err(rejection) => return Outcome::Rejected(rejection),
        };

        let request = {
            let mut state = self.state();
            let prefs = state.settings.get().clone();
            let conversation = &state.conversation;
            let last_assistant = conversation.latest_assistant().map(|t| t.text.as_str());
            let instruction =
                prompt::build_system_instruction(&self.options.persona, Some(&prefs), last_assistant);
            let request = prompt::build_completion_request(
                conversation.turns(),
                text,
                instruction,
                self.options.history_window,
            );
            let user_turn = state.conversation.append(Turn::user(text));
            tracing::info!(turn_id = %user_turn.id, len = text.len(), "user message sent");
            request
        };

        let result = self.completion.complete(&request).await;

        let (turn, mood, source, speak) = {
            let mut state = self.state();
            let (reply_text, source) = resolve_completion(result, &mut *state.rng);
            let turn = state.conversation.append(Turn::assistant(reply_text)).clone();
            let mood = mood::classify(&turn.text);
            let speak = state.voice_enabled;
            if speak {
                state.phase = Phase::AwaitingSpeech;
                state.speaking = true;
            }
            tracing::info!(turn_id = %turn.id, mood = %mood, source = ?source, "assistant replied");
            (turn, mood, source, speak)
        };

        let spoken = speak && self.speak(&turn.text).await;

        Outcome::Done(Reply {
            turn,
            mood,
            source,
            spoken,
        })
    }

    // ── Erase ───────────────────────────────────────────────────────────

    /// Forget the last `n` turns, then react to it.
    pub async fn erase_recent(&self, n: usize) -> Outcome<Erasure> {
        self.erase(|conversation| conversation.erase_recent(n)).await
    }

    /// Forget every turn mentioning `query`, then react to it.
    /// A blank query is rejected.
    pub async fn erase_by_topic(&self, query: &str) -> Outcome<Erasure> {
        if query.trim().is_empty() {
            return Outcome::Rejected(Rejection::EmptyInput);
        }
        self.erase(|conversation| conversation.erase_by_topic(query))
            .await
    }

    /// Replace the whole transcript with a fresh greeting.
    pub async fn reset(&self) -> Outcome<Turn> {
        let _guard = match self.enter(Phase::Erasing) {
            Ok(guard) => guard,
            Err(rejection) => return Outcome::Rejected(rejection),
        };
        pause(self.options.reset_pause).await;

        let greeting = self.state().conversation.reset().clone();
        tracing::info!(turn_id = %greeting.id, "conversation reset");
        Outcome::Done(greeting)
    }

    async fn erase<F>(&self, op: F) -> Outcome<Erasure>
    where
        F: FnOnce(&mut ConversationStore) -> EraseResult,
    {
        let _guard = match self.enter(Phase::Erasing) {
            Ok(guard) => guard,
            Err(rejection) => return Outcome::Rejected(rejection),
        };
        pause(self.options.erase_pause).await;

        let (result, acknowledgment, speak) = {
            let mut state = self.state();
            let result = op(&mut state.conversation);
            let acknowledgment = state
                .conversation
                .append(Turn::assistant(ERASE_ACKNOWLEDGMENT))
                .clone();
            let speak = state.voice_enabled;
            if speak {
                state.phase = Phase::AwaitingSpeech;
                state.speaking = true;
            }
            (result, acknowledgment, speak)
        };

        let spoken = speak && self.speak(&acknowledgment.text).await;

        Outcome::Done(Erasure {
            result,
            acknowledgment,
            spoken,
        })
    }

    // ── Speech ──────────────────────────────────────────────────────────

    /// Synthesize and play `text`. Every failure is logged and swallowed.
    async fn speak(&self, text: &str) -> bool {
        let request = SpeechRequest::new(text, &self.options.voice_name);
        let encoded = match self.speech.synthesize(&request).await {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis failed");
                return false;
            }
        };

        let buffer =
            match audio::decode_audio_data(&encoded, self.options.sample_rate, self.options.channels)
            {
                Ok(buffer) => buffer,
                Err(e) => {
                    tracing::warn!(error = %e, "speech audio undecodable");
                    return false;
                }
            };

        match self.sink.play(&buffer).await {
            Ok(()) => {
                tracing::debug!(secs = buffer.duration_secs(), "speech played");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech playback failed");
                false
            }
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Turn a completion result into reply text, choosing a fallback when needed.
fn resolve_completion(
    result: Result<Completion, RemoteError>,
    rng: &mut dyn RngCore,
) -> (String, ReplySource) {
    match result {
        Ok(completion) if !completion.blocked && !completion.text.trim().is_empty() => {
            (completion.text.trim().to_string(), ReplySource::Model)
        }
        Ok(completion) => {
            let reason = if completion.blocked {
                FallbackReason::Blocked
            } else {
                FallbackReason::Empty
            };
            tracing::warn!(?reason, "completion withheld, using fallback reply");
            let line = BLOCKED_FALLBACKS[rng.random_range(0..BLOCKED_FALLBACKS.len())];
            (line.to_string(), ReplySource::Fallback(reason))
        }
        Err(e) => {
            tracing::warn!(error = %e, "completion request failed, using fallback reply");
            (
                CONNECTION_FALLBACK.to_string(),
                ReplySource::Fallback(FallbackReason::Transport),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn model_text_is_trimmed() {
        let (text, source) = resolve_completion(
            Ok(Completion {
                text: "  hey you \n".into(),
                blocked: false,
            }),
            &mut rng(),
        );
        assert_eq!(text, "hey you");
        assert_eq!(source, ReplySource::Model);
    }

    #[test]
    fn blocked_text_is_replaced_even_when_present() {
        let (text, source) = resolve_completion(
            Ok(Completion {
                text: "something".into(),
                blocked: true,
            }),
            &mut rng(),
        );
        assert!(BLOCKED_FALLBACKS.contains(&text.as_str()));
        assert_eq!(source, ReplySource::Fallback(FallbackReason::Blocked));
    }

    #[test]
    fn empty_text_uses_fallback_set() {
        let mut rng = rng();
        for _ in 0..20 {
            let (text, source) = resolve_completion(Ok(Completion::default()), &mut rng);
            assert!(BLOCKED_FALLBACKS.contains(&text.as_str()));
            assert_eq!(source, ReplySource::Fallback(FallbackReason::Empty));
        }
    }

    #[test]
    fn transport_error_uses_connection_fallback() {
        let (text, source) = resolve_completion(
            Err(RemoteError::Decode("bad json".into())),
            &mut rng(),
        );
        assert_eq!(text, CONNECTION_FALLBACK);
        assert!(text.starts_with("I'm so lost in our connection"));
        assert!(!BLOCKED_FALLBACKS.contains(&text.as_str()));
        assert_eq!(source, ReplySource::Fallback(FallbackReason::Transport));
    }

    #[test]
    fn missing_api_key_uses_connection_fallback() {
        let (text, source) = resolve_completion(Err(RemoteError::MissingApiKey), &mut rng());
        assert_eq!(text, CONNECTION_FALLBACK);
        assert_eq!(source, ReplySource::Fallback(FallbackReason::Transport));
    }

    #[test]
    fn fallback_lines_keep_their_wording() {
        assert!(BLOCKED_FALLBACKS[0].contains("that fantasy, love"));
        assert!(BLOCKED_FALLBACKS[1].starts_with("That's so naughty..."));
        assert!(BLOCKED_FALLBACKS[2].contains("Every dark, sweet thought"));
    }

    #[test]
    fn reset_pauses_shorter_than_erase_by_default() {
        let options = OrchestratorOptions::default();
        assert_eq!(options.erase_pause, Duration::from_millis(800));
        assert_eq!(options.reset_pause, Duration::from_millis(500));
    }

    #[test]
    fn only_idle_is_unblocked() {
        assert!(!Phase::Idle.is_blocked());
        assert!(Phase::AwaitingCompletion.is_blocked());
        assert!(Phase::AwaitingSpeech.is_blocked());
        assert!(Phase::Erasing.is_blocked());
    }
}
