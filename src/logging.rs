use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::project_dirs;

const LOG_FILE_BASENAME: &str = "replay-deck.log";
const LOG_DIR_ENV: &str = "REPLAY_DECK_LOG_PATH";
const LOG_RETENTION: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Install the global subscriber: console output plus a daily rolling log file.
///
/// Keep the returned guard alive for the life of the process, dropping it
/// flushes and stops the background writer.
pub fn init_logging() -> Result<WorkerGuard> {
    let log_dir = log_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let pruned = prune_old_logs(&log_dir, LOG_RETENTION);

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_BASENAME));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging to {:?}, pruned {} stale log files", log_dir, pruned);
    Ok(guard)
}

/// `REPLAY_DECK_LOG_PATH`, else a `logs` folder in the platform state
/// (Linux) or local data directory
fn log_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let dirs = project_dirs()?;
    let base = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(base.join("logs"))
}

/// Remove rotated replay-deck logs last written before `now - max_age`.
/// Returns how many were removed.
fn prune_old_logs(log_dir: &Path, max_age: Duration) -> usize {
    let (Ok(entries), Some(cutoff)) = (
        std::fs::read_dir(log_dir),
        SystemTime::now().checked_sub(max_age),
    ) else {
        return 0;
    };

    entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(LOG_FILE_BASENAME))
        })
        .filter(|entry| {
            entry
                .metadata()
                .and_then(|m| m.modified())
                .is_ok_and(|modified| modified < cutoff)
        })
        .filter(|entry| entry.path().is_file() && std::fs::remove_file(entry.path()).is_ok())
        .count()
}
