//! CLI `settings` command: show or update preferences.

use anyhow::Result;

use hearth::config::HearthConfig;
use hearth::settings::{PreferenceUpdate, Preferences, SettingsStore};

/// Print the saved preferences.
pub fn show(config: &HearthConfig) -> Result<()> {
    let store = SettingsStore::load(super::open_storage(config)?);
    print_prefs(store.get());
    Ok(())
}

/// Overwrite the fields that were given and save the whole record.
pub fn set(config: &HearthConfig, update: PreferenceUpdate) -> Result<()> {
    let mut store = SettingsStore::load(super::open_storage(config)?);
    let prefs = update.apply_to(store.get());
    store.save(prefs);

    println!("Preferences saved.");
    print_prefs(store.get());
    Ok(())
}

pub fn print_prefs(prefs: &Preferences) {
    println!("Preferences");
    println!("{}", "=".repeat(40));
    println!(
        "  Flirt intensity:  {}/10 ({})",
        prefs.flirt_intensity,
        prefs.intensity_label()
    );
    println!(
        "  Explicit mode:    {}",
        if prefs.explicit_mode { "on" } else { "off" }
    );
    if prefs.topics.is_empty() {
        println!("  Interests:        (none)");
    } else {
        println!("  Interests:        {}", prefs.topics.join(", "));
    }
}
