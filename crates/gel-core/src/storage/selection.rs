//! Persisted plugin selection.
//!
//! The set of plugins to bring up at startup is kept under the `plugins`
//! settings key as one comma-separated string of plugin references: the
//! module pathname for dynamic plugins, the bare name for builtins.
use crate::kernel::constants::PLUGINS_SETTINGS_KEY;
use crate::kernel::error::Result;
use crate::plugin_system::dependency::parse_dependency_list;
use crate::storage::settings::Settings;

/// Split a stored selection, dropping empty and repeated entries
pub fn parse_selection(value: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for reference in parse_dependency_list(value) {
        if !refs.contains(&reference) {
            refs.push(reference);
        }
    }
    refs
}

pub fn format_selection<S: AsRef<str>>(refs: &[S]) -> String {
    refs.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",")
}

pub fn load_selection(settings: &Settings) -> Result<Vec<String>> {
    let stored: Option<String> = settings.get(PLUGINS_SETTINGS_KEY)?;
    Ok(stored.as_deref().map(parse_selection).unwrap_or_default())
}

pub fn save_selection<S: AsRef<str>>(settings: &Settings, refs: &[S]) -> Result<()> {
    settings.set(PLUGINS_SETTINGS_KEY, format_selection(refs))
}
