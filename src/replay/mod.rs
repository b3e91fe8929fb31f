//! Replay event management - buffer recording, event marking and playback

mod event;
mod manager;

pub use event::{
    event_display_name, validate_duration, PlaybackSpeed, ReplayEvent, ReplaySettings,
    MAX_BUFFER_SECONDS, MIN_BUFFER_SECONDS,
};
pub use manager::ReplayManager;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// In-memory recording/playback flags. Not persisted: they only reflect the
/// outcome of the last command this process sent.
#[derive(Debug, Clone, Default)]
pub struct RecordingSession {
    pub is_recording: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub is_playing: bool,
}

impl RecordingSession {
    /// Seconds since recording started, 0 when not recording
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        match (self.is_recording, self.started_at) {
            (true, Some(started)) => (now - started).num_milliseconds().max(0) as f64 / 1000.0,
            _ => 0.0,
        }
    }
}

/// Snapshot returned by `ReplayManager::status`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStatus {
    pub is_recording: bool,
    pub is_playing: bool,
    pub recording_elapsed_seconds: f64,
    pub event_count: usize,
}

/// Which playback strategy ended up reaching the switcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", rename_all = "camelCase")]
pub enum PlaybackTier {
    /// Played with the local index as the switcher's event number
    Direct { remote_index: usize },
    /// Played with the newest-first index `count - 1 - local`
    Mirrored { remote_index: usize },
    /// Fell back to playing the most recent buffer
    MostRecent,
}

/// Result of a command with no payload beyond its message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutcome {
    pub message: String,
}

/// Result of a successful playback request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayOutcome {
    pub tier: PlaybackTier,
    pub message: String,
}

/// Result of marking an event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOutcome {
    pub event: ReplayEvent,
    pub events: Vec<ReplayEvent>,
    /// Mark-out was rejected by the switcher; the event only has an in-point
    pub mark_out_failed: bool,
    /// The switcher did not accept the event name
    pub rename_failed: bool,
    pub message: String,
}

/// Result of deleting an event from the local list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteOutcome {
    pub removed: ReplayEvent,
    pub events: Vec<ReplayEvent>,
    /// The switcher still holds the event; local and remote numbering now differ
    pub warning: String,
    pub message: String,
}

/// State changes broadcast to whoever relays them to clients
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayNotification {
    DurationChanged { seconds: u32 },
    RecordingStarted,
    RecordingStopped,
    PlaybackStarted { tier: PlaybackTier, speed: PlaybackSpeed },
    PlaybackPaused,
    EventMarked { event: ReplayEvent },
    EventDeleted { index: usize, warning: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_elapsed_only_counts_while_recording() {
        let now = Utc::now();
        let mut session = RecordingSession::default();
        assert_eq!(session.elapsed_seconds(now), 0.0);

        session.is_recording = true;
        session.started_at = Some(now - Duration::milliseconds(12_500));
        assert_eq!(session.elapsed_seconds(now), 12.5);

        session.is_recording = false;
        assert_eq!(session.elapsed_seconds(now), 0.0);
    }

    #[test]
    fn test_tier_serialization() {
        let value = serde_json::to_value(PlaybackTier::Mirrored { remote_index: 3 }).unwrap();
        assert_eq!(value["tier"], "mirrored");
        assert_eq!(value["remote_index"], 3);
    }
}
