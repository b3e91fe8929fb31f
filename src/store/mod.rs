//! Flat-file JSON persistence for replay state
//!
//! Both stores keep their whole document in memory and rewrite the file on
//! every mutation. Writes go to a sibling temp file first and are renamed
//! over the target, so a crash mid-write never truncates the previous copy.

mod events;
mod settings;

pub use events::EventStore;
pub use settings::SettingsStore;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::error;

use crate::error::ReplayError;

/// File name of the event list inside the data directory
pub const EVENTS_FILE_NAME: &str = "replay_events.json";
/// File name of the replay settings inside the data directory
pub const SETTINGS_FILE_NAME: &str = "replay_config.json";

/// Current on-disk document version
pub const FORMAT_VERSION: u32 = 1;

/// Read and parse a JSON document. `Ok(None)` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {:?}", path))?;
    Ok(Some(value))
}

/// Serialize `value` and atomically replace `path` with it
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {:?}", parent))?;
    }

    let contents = serde_json::to_string_pretty(value).context("Failed to serialize document")?;

    let tmp_path = temp_path(path);
    std::fs::write(&tmp_path, contents)
        .with_context(|| format!("Failed to write {:?}", tmp_path))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move {:?} into place", tmp_path))?;

    Ok(())
}

/// Write a document, logging and swallowing failures so a degraded disk
/// never blocks replay control
fn persist<T: Serialize>(path: &Path, value: &T) -> bool {
    let result = write_json_atomic(path, value)
        .map_err(|e| ReplayError::Persistence(format!("{:#}", e)));
    match result {
        Ok(()) => true,
        Err(e) => {
            error!("{}", e);
            false
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        version: u32,
        label: String,
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let doc: Option<Doc> = read_json(&dir.path().join("absent.json")).unwrap();
        assert!(doc.is_none());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("doc.json");
        let doc = Doc {
            version: FORMAT_VERSION,
            label: "first".into(),
        };

        write_json_atomic(&path, &doc).unwrap();
        assert!(!temp_path(&path).exists());
        assert_eq!(read_json::<Doc>(&path).unwrap(), Some(doc));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(read_json::<Doc>(&path).is_err());
    }
}
