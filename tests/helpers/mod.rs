#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use hearth::audio::{AudioBuffer, AudioSink};
use hearth::conversation::ConversationStore;
use hearth::orchestrator::{Orchestrator, OrchestratorOptions};
use hearth::remote::{
    Completion, CompletionRequest, CompletionService, RemoteError, SpeechRequest, SpeechService,
};
use hearth::settings::SettingsStore;
use hearth::storage::MemoryStorage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Notify;

/// Completion service that replays scripted results and records requests.
/// Once the script runs out it answers "ok".
#[derive(Default)]
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<Result<Completion, RemoteError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedCompletion {
    pub fn new(script: Vec<Result<Completion, RemoteError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Hold every call until `gate.notify_one()`.
    pub fn gated(script: Vec<Result<Completion, RemoteError>>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(script)
        }
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RemoteError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(reply("ok")))
    }
}

pub fn reply(text: &str) -> Completion {
    Completion {
        text: text.to_string(),
        blocked: false,
    }
}

pub fn blocked() -> Completion {
    Completion {
        text: String::new(),
        blocked: true,
    }
}

/// Speech service returning fixed PCM, or failing.
pub struct FakeSpeech {
    audio: Option<String>,
    pub calls: AtomicUsize,
    pub texts: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl FakeSpeech {
    pub fn with_samples(samples: &[i16]) -> Self {
        Self {
            audio: Some(encode_pcm(samples)),
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Hold every synthesis until `gate.notify_one()`.
    pub fn gated(samples: &[i16], gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::with_samples(samples)
        }
    }

    pub fn failing() -> Self {
        Self {
            audio: None,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechService for FakeSpeech {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<String, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(request.text.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.audio.clone().ok_or(RemoteError::EmptyAudio)
    }
}

/// Sink that records what it was asked to play.
#[derive(Default)]
pub struct RecordingSink {
    pub played: Mutex<Vec<AudioBuffer>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.played.lock().unwrap().len()
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, buffer: &AudioBuffer) -> anyhow::Result<()> {
        self.played.lock().unwrap().push(buffer.clone());
        Ok(())
    }
}

pub fn encode_pcm(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    BASE64_STANDARD.encode(bytes)
}

/// Everything a test needs to drive and inspect an orchestrator.
pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub completion: Arc<ScriptedCompletion>,
    pub speech: Arc<FakeSpeech>,
    pub sink: Arc<RecordingSink>,
    pub storage: Arc<MemoryStorage>,
}

pub fn test_options(voice_enabled: bool) -> OrchestratorOptions {
    OrchestratorOptions {
        persona: "You are Test.".into(),
        erase_pause: Duration::ZERO,
        reset_pause: Duration::ZERO,
        voice_enabled,
        ..OrchestratorOptions::default()
    }
}

/// Build an orchestrator over in-memory storage with a seeded RNG.
pub fn harness(completion: ScriptedCompletion, speech: FakeSpeech, voice_enabled: bool) -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    harness_with_storage(completion, speech, voice_enabled, storage)
}

pub fn harness_with_storage(
    completion: ScriptedCompletion,
    speech: FakeSpeech,
    voice_enabled: bool,
    storage: Arc<MemoryStorage>,
) -> Harness {
    harness_with_options(completion, speech, test_options(voice_enabled), storage)
}

pub fn harness_with_options(
    completion: ScriptedCompletion,
    speech: FakeSpeech,
    options: OrchestratorOptions,
    storage: Arc<MemoryStorage>,
) -> Harness {
    let completion = Arc::new(completion);
    let speech = Arc::new(speech);
    let sink = Arc::new(RecordingSink::default());

    let orchestrator = Orchestrator::new(
        ConversationStore::load(storage.clone(), true),
        SettingsStore::load(storage.clone()),
        completion.clone(),
        speech.clone(),
        sink.clone(),
        options,
    )
    .with_rng(StdRng::seed_from_u64(42));

    Harness {
        orchestrator: Arc::new(orchestrator),
        completion,
        speech,
        sink,
        storage,
    }
}
