use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HearthConfig {
    pub log: LogConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub voice: VoiceConfig,
    pub conversation: ConversationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `hearth=debug`.
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    /// When `false`, the saved transcript is discarded at startup and every
    /// session begins from the greeting. Preferences always persist.
    pub persist_across_sessions: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub chat_model: String,
    pub tts_model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VoiceConfig {
    pub enabled: bool,
    pub voice_name: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub output_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConversationConfig {
    pub companion_name: String,
    /// Replaces the built-in persona text when set.
    pub persona: Option<String>,
    pub history_window: usize,
    pub erase_recent_count: usize,
    pub erase_pause_ms: u64,
    pub reset_pause_ms: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_hearth_dir().to_string_lossy().into_owned(),
            persist_across_sessions: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".into(),
            chat_model: "gemini-2.5-flash".into(),
            tts_model: "gemini-2.5-flash-preview-tts".into(),
            api_key: None,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        let output_dir = default_hearth_dir()
            .join("voice")
            .to_string_lossy()
            .into_owned();
        Self {
            enabled: false,
            voice_name: "Kore".into(),
            sample_rate: crate::audio::DEFAULT_SAMPLE_RATE,
            channels: 1,
            output_dir,
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            companion_name: "Amara".into(),
            persona: None,
            history_window: crate::prompt::HISTORY_WINDOW,
            erase_recent_count: crate::conversation::forget::DEFAULT_ERASE_RECENT,
            erase_pause_ms: 800,
            reset_pause_ms: 500,
        }
    }
}

/// Returns `~/.hearth/`
pub fn default_hearth_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hearth")
}

/// Returns the default config file path: `~/.hearth/config.toml`
pub fn default_config_path() -> PathBuf {
    default_hearth_dir().join("config.toml")
}

impl HearthConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            HearthConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (HEARTH_DATA_DIR, HEARTH_LOG_LEVEL,
    /// HEARTH_VOICE, HEARTH_API_KEY / GEMINI_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HEARTH_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("HEARTH_LOG_LEVEL") {
            self.log.level = val;
        }
        if let Ok(val) = std::env::var("HEARTH_VOICE") {
            self.voice.enabled = matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "on");
        }
        if let Ok(val) = std::env::var("HEARTH_API_KEY").or_else(|_| std::env::var("GEMINI_API_KEY"))
        {
            self.api.api_key = Some(val);
        }
    }

    /// Resolve the data directory, expanding `~` if needed.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    pub fn resolved_voice_dir(&self) -> PathBuf {
        expand_tilde(&self.voice.output_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
