mod helpers;

use std::sync::Arc;

use helpers::{harness_with_storage, FakeSpeech, ScriptedCompletion};
use hearth::conversation::store::GREETING;
use hearth::conversation::ConversationStore;
use hearth::settings::{Preferences, SettingsStore};
use hearth::storage::{BlobStorage, FileStorage, MemoryStorage, CONVERSATION_KEY, SETTINGS_KEY};
use tempfile::TempDir;

#[test]
fn transcript_survives_restart_when_persisting() {
    let tmp = TempDir::new().unwrap();
    let storage: Arc<dyn BlobStorage> = Arc::new(FileStorage::open(tmp.path()).unwrap());

    let mut store = ConversationStore::load(storage.clone(), true);
    store.append(hearth::conversation::Turn::user("see you tomorrow"));
    drop(store);

    let reopened: Arc<dyn BlobStorage> = Arc::new(FileStorage::open(tmp.path()).unwrap());
    let store = ConversationStore::load(reopened, true);
    assert_eq!(store.len(), 2);
    assert_eq!(store.turns()[1].text, "see you tomorrow");
    assert!(tmp.path().join(format!("{CONVERSATION_KEY}.json")).exists());
}

#[test]
fn session_scoped_policy_wipes_transcript_but_keeps_preferences() {
    let tmp = TempDir::new().unwrap();
    let storage: Arc<dyn BlobStorage> = Arc::new(FileStorage::open(tmp.path()).unwrap());

    let mut store = ConversationStore::load(storage.clone(), true);
    store.append(hearth::conversation::Turn::user("forget me"));
    let mut settings = SettingsStore::load(storage.clone());
    let prefs = Preferences {
        flirt_intensity: 2,
        explicit_mode: false,
        topics: vec!["books".into()],
    };
    settings.save(prefs.clone());

    let store = ConversationStore::load(storage.clone(), false);
    assert_eq!(store.len(), 1);
    assert_eq!(store.turns()[0].text, GREETING);
    assert!(storage.read(CONVERSATION_KEY).unwrap().is_none());

    let settings = SettingsStore::load(storage);
    assert_eq!(settings.get(), &prefs);
}

#[test]
fn saved_transcript_is_plain_json_with_string_timestamps() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = ConversationStore::load(storage.clone(), true);
    store.append(hearth::conversation::Turn::user("hi"));

    let raw = storage.read(CONVERSATION_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let turns = value.as_array().unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1]["role"], "user");
    assert!(turns[1]["created_at"].as_str().unwrap().contains('T'));
}

#[test]
fn preferences_record_is_flat() {
    let storage = Arc::new(MemoryStorage::new());
    let mut settings = SettingsStore::load(storage.clone());
    settings.save(Preferences::default());

    let raw = storage.read(SETTINGS_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["flirt_intensity"], 8);
    assert_eq!(value["explicit_mode"], true);
    assert_eq!(value["topics"], serde_json::json!([]));
}

#[tokio::test]
async fn storage_failures_do_not_interrupt_the_chat() {
    let storage = Arc::new(MemoryStorage::new());
    let h = harness_with_storage(
        ScriptedCompletion::default(),
        FakeSpeech::failing(),
        false,
        storage.clone(),
    );
    storage.set_fail_writes(true);

    let reply = h.orchestrator.submit("still here?").await.done().unwrap();
    assert_eq!(reply.turn.text, "ok");
    assert_eq!(h.orchestrator.turn_count(), 3);

    h.orchestrator.save_preferences(Preferences {
        flirt_intensity: 10,
        ..Preferences::default()
    });
    assert_eq!(h.orchestrator.preferences().flirt_intensity, 10);

    // nothing reached storage
    assert!(storage.read(CONVERSATION_KEY).unwrap().is_none());
}
