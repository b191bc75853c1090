//! Persisted user preferences.
//!
//! The only durable state outside the in-memory cache: whether the sync-lag
//! banner was dismissed. Stored as a small JSON file; a missing or corrupt
//! file reads as not-dismissed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(default)]
    sync_banner_dismissed: bool,
}

/// File-backed preference store.
#[derive(Debug)]
pub struct Preferences {
    path: PathBuf,
    state: PreferencesFile,
}

impl Preferences {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable preferences file {}: {e}", path.display());
                PreferencesFile::default()
            }),
            Err(_) => PreferencesFile::default(),
        };
        Self { path, state }
    }

    pub fn sync_banner_dismissed(&self) -> bool {
        self.state.sync_banner_dismissed
    }

    pub fn set_sync_banner_dismissed(&mut self, dismissed: bool) -> Result<()> {
        self.state.sync_banner_dismissed = dismissed;
        let raw = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write preferences to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("poolscope-prefs-{tag}-{}.json", std::process::id()))
    }

    #[test]
    fn missing_file_reads_as_not_dismissed() {
        let prefs = Preferences::load(temp_path("missing"));
        assert!(!prefs.sync_banner_dismissed());
    }

    #[test]
    fn dismissal_survives_reload() {
        let path = temp_path("roundtrip");
        let mut prefs = Preferences::load(&path);
        prefs.set_sync_banner_dismissed(true).unwrap();

        let reloaded = Preferences::load(&path);
        assert!(reloaded.sync_banner_dismissed());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupt_file_reads_as_default() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "not json at all").unwrap();

        let prefs = Preferences::load(&path);
        assert!(!prefs.sync_banner_dismissed());

        let _ = std::fs::remove_file(&path);
    }
}
