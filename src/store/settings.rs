//! Persisted replay settings (buffer duration, default speed, auto-replay)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::{persist, read_json, FORMAT_VERSION};
use crate::replay::{validate_duration, ReplaySettings};

/// On-disk layout. `version` is absent in files written by older installs.
#[derive(Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    version: u32,
    #[serde(flatten)]
    settings: ReplaySettings,
}

pub struct SettingsStore {
    path: PathBuf,
    settings: ReplaySettings,
}

impl SettingsStore {
    /// Open the store at `path` and load its contents
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            settings: ReplaySettings::default(),
        };
        store.load();
        store
    }

    /// Re-read the settings, writing defaults when the file is missing and
    /// falling back to defaults in memory when it cannot be parsed. A stored
    /// buffer duration outside 5-60 s is replaced by the default.
    pub fn load(&mut self) -> &ReplaySettings {
        match read_json::<SettingsDocument>(&self.path) {
            Ok(Some(doc)) => {
                let mut settings = doc.settings;
                if let Err(e) = validate_duration(i64::from(settings.buffer_duration_seconds)) {
                    error!("Stored replay buffer duration rejected, using default: {}", e);
                    settings.buffer_duration_seconds =
                        ReplaySettings::default().buffer_duration_seconds;
                }
                self.settings = settings;
                info!("Replay settings loaded: {:?}", self.settings);
            }
            Ok(None) => {
                self.settings = ReplaySettings::default();
                self.persist();
            }
            Err(e) => {
                error!("Failed to load replay settings, using defaults: {:#}", e);
                self.settings = ReplaySettings::default();
            }
        }
        &self.settings
    }

    /// Replace the settings and persist them. Returns false on I/O failure.
    pub fn save(&mut self, settings: ReplaySettings) -> bool {
        self.settings = settings;
        self.persist()
    }

    /// Update the buffer duration. Out-of-range values are rejected without
    /// touching the stored settings.
    pub fn set_duration(&mut self, seconds: i64) -> bool {
        let Ok(seconds) = validate_duration(seconds) else {
            error!("Invalid replay buffer duration: {}", seconds);
            return false;
        };

        self.settings.buffer_duration_seconds = seconds;
        self.persist()
    }

    pub fn settings(&self) -> &ReplaySettings {
        &self.settings
    }

    pub fn buffer_duration_seconds(&self) -> u32 {
        self.settings.buffer_duration_seconds
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> bool {
        let doc = SettingsDocument {
            version: FORMAT_VERSION,
            settings: self.settings.clone(),
        };
        persist(&self.path, &doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::PlaybackSpeed;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::open(dir.path().join("replay_config.json"))
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.settings(), &ReplaySettings::default());
        assert!(store.path().exists());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        let mut settings = ReplaySettings::default();
        settings.buffer_duration_seconds = 22;
        settings.default_playback_speed_percent = PlaybackSpeed::ThreeQuarters;
        settings.auto_replay_enabled = true;
        settings.event_type_enablement.insert("set".into(), false);
        assert!(store.save(settings.clone()));

        let reopened = store_in(&dir);
        assert_eq!(reopened.settings(), &settings);
    }

    #[test]
    fn test_set_duration_rejects_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        assert!(store.set_duration(30));
        assert!(!store.set_duration(4));
        assert!(!store.set_duration(61));
        assert_eq!(store.buffer_duration_seconds(), 30);

        let reopened = store_in(&dir);
        assert_eq!(reopened.buffer_duration_seconds(), 30);
    }

    #[test]
    fn test_reads_legacy_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay_config.json");
        std::fs::write(
            &path,
            r#"{"duration": 15, "speed": 75, "enableAutoReplay": true,
                "events": {"point": false, "set": true, "match": true}}"#,
        )
        .unwrap();

        let store = SettingsStore::open(&path);
        let settings = store.settings();
        assert_eq!(settings.buffer_duration_seconds, 15);
        assert_eq!(settings.default_playback_speed_percent, PlaybackSpeed::ThreeQuarters);
        assert!(settings.auto_replay_enabled);
        assert!(!settings.event_type_enablement["point"]);
    }

    #[test]
    fn test_out_of_range_duration_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay_config.json");
        for stored in [2, 61, 0] {
            std::fs::write(
                &path,
                format!(
                    r#"{{"version": 1, "bufferDurationSeconds": {}, "defaultPlaybackSpeedPercent": 25}}"#,
                    stored
                ),
            )
            .unwrap();

            let store = SettingsStore::open(&path);
            assert_eq!(store.buffer_duration_seconds(), 8);
            assert_eq!(
                store.settings().default_playback_speed_percent,
                PlaybackSpeed::Quarter
            );
        }

        std::fs::write(&path, r#"{"duration": 1}"#).unwrap();
        assert_eq!(SettingsStore::open(&path).buffer_duration_seconds(), 8);
    }

    #[test]
    fn test_corrupt_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay_config.json");
        std::fs::write(&path, "duration=8").unwrap();

        let store = SettingsStore::open(&path);
        assert_eq!(store.settings(), &ReplaySettings::default());
    }
}
