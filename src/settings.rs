//! User preferences that shape the outbound system instruction.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::storage::{BlobStorage, SETTINGS_KEY};

pub const MIN_FLIRT_INTENSITY: u8 = 1;
pub const MAX_FLIRT_INTENSITY: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// 1 (friendly) to 10 (intense).
    pub flirt_intensity: u8,
    pub explicit_mode: bool,
    /// Interests the companion should lean into, in entry order.
    pub topics: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            flirt_intensity: 8,
            explicit_mode: true,
            topics: Vec::new(),
        }
    }
}

impl Preferences {
    /// Split a comma-separated topic list, trimming entries and dropping
    /// blanks and repeats.
    pub fn parse_topics(input: &str) -> Vec<String> {
        let mut topics: Vec<String> = Vec::new();
        for topic in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if !topics.iter().any(|t| t == topic) {
                topics.push(topic.to_string());
            }
        }
        topics
    }

    pub fn clamp_intensity(value: u8) -> u8 {
        value.clamp(MIN_FLIRT_INTENSITY, MAX_FLIRT_INTENSITY)
    }

    /// Human label for the intensity band.
    pub fn intensity_label(&self) -> &'static str {
        match self.flirt_intensity {
            0..=3 => "friendly & polite",
            4..=7 => "flirty & playful",
            _ => "obsessed & intense",
        }
    }
}

/// A partial change to [`Preferences`]; unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceUpdate {
    pub flirt_intensity: Option<u8>,
    pub explicit_mode: Option<bool>,
    /// Comma-separated; an empty string clears the interests.
    pub topics: Option<String>,
}

impl PreferenceUpdate {
    /// Parse a single `key value` pair as typed in the chat session,
    /// e.g. `flirt 5`, `explicit off`, `topics music, hiking`.
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        let mut update = Self::default();
        match key {
            "flirt" => {
                let level: u8 = value
                    .parse()
                    .with_context(|| format!("flirt expects a number from 1 to 10, got {value:?}"))?;
                update.flirt_intensity = Some(level);
            }
            "explicit" => {
                update.explicit_mode = Some(match value {
                    "on" | "true" | "yes" => true,
                    "off" | "false" | "no" => false,
                    other => bail!("explicit expects on or off, got {other:?}"),
                });
            }
            "topics" => update.topics = Some(value.to_string()),
            other => bail!("unknown setting {other:?} (flirt, explicit, topics)"),
        }
        Ok(update)
    }

    /// Apply onto `prefs`, clamping the intensity and normalizing topics.
    pub fn apply_to(&self, prefs: &Preferences) -> Preferences {
        let mut next = prefs.clone();
        if let Some(level) = self.flirt_intensity {
            next.flirt_intensity = Preferences::clamp_intensity(level);
        }
        if let Some(explicit) = self.explicit_mode {
            next.explicit_mode = explicit;
        }
        if let Some(topics) = &self.topics {
            next.topics = Preferences::parse_topics(topics);
        }
        next
    }
}

/// Write-through holder of the current [`Preferences`].
pub struct SettingsStore {
    prefs: Preferences,
    storage: Arc<dyn BlobStorage>,
}

impl SettingsStore {
    /// Load saved preferences, falling back to defaults when nothing is saved
    /// or the saved record does not parse.
    pub fn load(storage: Arc<dyn BlobStorage>) -> Self {
        let prefs = match read_prefs(storage.as_ref()) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Preferences::default(),
            Err(e) => {
                tracing::warn!(error = %e, "saved preferences unreadable, using defaults");
                Preferences::default()
            }
        };
        Self { prefs, storage }
    }

    pub fn get(&self) -> &Preferences {
        &self.prefs
    }

    /// Replace the preferences wholesale and persist them.
    pub fn save(&mut self, prefs: Preferences) {
        self.prefs = prefs;
        let written = serde_json::to_string(&self.prefs)
            .context("failed to serialize preferences")
            .and_then(|raw| self.storage.write(SETTINGS_KEY, &raw));
        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to persist preferences");
        }
    }
}

fn read_prefs(storage: &dyn BlobStorage) -> Result<Option<Preferences>> {
    let Some(raw) = storage.read(SETTINGS_KEY)? else {
        return Ok(None);
    };
    let prefs = serde_json::from_str(&raw).context("failed to parse saved preferences")?;
    Ok(Some(prefs))
}
