pub mod chat;
pub mod forget;
pub mod history;
pub mod reset;
pub mod settings;

use std::sync::Arc;

use anyhow::Result;

use hearth::audio::{AudioSink, WavFileSink};
use hearth::config::HearthConfig;
use hearth::conversation::ConversationStore;
use hearth::orchestrator::{Orchestrator, OrchestratorOptions};
use hearth::remote::gemini::GeminiClient;
use hearth::settings::SettingsStore;
use hearth::storage::{BlobStorage, FileStorage};

/// Open the file storage under the configured data directory.
pub fn open_storage(config: &HearthConfig) -> Result<Arc<dyn BlobStorage>> {
    let storage = FileStorage::open(config.resolved_data_dir())?;
    Ok(Arc::new(storage))
}

/// Wire stores, the Gemini client, and the WAV sink into an orchestrator.
pub fn open_session(config: &HearthConfig) -> Result<Orchestrator> {
    let storage = open_storage(config)?;
    let conversation =
        ConversationStore::load(storage.clone(), config.storage.persist_across_sessions);
    let settings = SettingsStore::load(storage);

    let client = Arc::new(GeminiClient::new(&config.api));
    if !client.has_api_key() {
        tracing::warn!(
            "no API key configured (set GEMINI_API_KEY or [api] api_key); replies will fall back to canned lines"
        );
    }
    let sink: Arc<dyn AudioSink> = Arc::new(WavFileSink::new(config.resolved_voice_dir()));

    Ok(Orchestrator::new(
        conversation,
        settings,
        client.clone(),
        client,
        sink,
        OrchestratorOptions::from_config(config),
    ))
}
