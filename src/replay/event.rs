//! Replay data model

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::{ReplayError, Result};

/// Shortest buffer the switcher is asked to keep (seconds)
pub const MIN_BUFFER_SECONDS: i64 = 5;
/// Longest buffer the switcher is asked to keep (seconds)
pub const MAX_BUFFER_SECONDS: i64 = 60;

/// A marked replay segment, as kept in the local event list.
///
/// `local_index` always equals the event's position in the store; the store
/// renumbers survivors after a deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayEvent {
    /// Display name
    pub name: String,

    /// Free-form tag such as "point", "set" or "match"
    #[serde(alias = "type")]
    pub event_type: String,

    /// When the event was marked
    #[serde(alias = "timestamp", deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,

    /// Zero-based position in the event list
    #[serde(alias = "index")]
    pub local_index: usize,

    /// Buffer duration in effect when the event was marked
    #[serde(alias = "duration")]
    pub buffer_duration_seconds: u32,
}

impl ReplayEvent {
    pub fn new(
        name: String,
        event_type: String,
        local_index: usize,
        buffer_duration_seconds: u32,
    ) -> Self {
        Self {
            name,
            event_type,
            created_at: Utc::now(),
            local_index,
            buffer_duration_seconds,
        }
    }
}

/// Accepts RFC 3339 timestamps as well as offset-less ISO-8601 ones, which
/// older installs wrote in host local time
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(serde::de::Error::custom)?;
    Ok(local_to_utc(naive))
}

/// Ambiguous local times (DST fall-back) take the earlier instant; times
/// skipped by a DST jump are read as UTC
fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => naive.and_utc(),
    }
}

/// Display name for an event: the caller's name as given, or "Event N"
/// (1-based) when it is missing or blank
pub fn event_display_name(name: Option<&str>, local_index: usize) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => format!("Event {}", local_index + 1),
    }
}

/// Replay playback speed, as a percentage of real time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PlaybackSpeed {
    Quarter,
    Half,
    ThreeQuarters,
    #[default]
    Full,
}

impl PlaybackSpeed {
    pub fn percent(self) -> u32 {
        match self {
            PlaybackSpeed::Quarter => 25,
            PlaybackSpeed::Half => 50,
            PlaybackSpeed::ThreeQuarters => 75,
            PlaybackSpeed::Full => 100,
        }
    }
}

impl TryFrom<u32> for PlaybackSpeed {
    type Error = ReplayError;

    fn try_from(percent: u32) -> Result<Self> {
        match percent {
            25 => Ok(PlaybackSpeed::Quarter),
            50 => Ok(PlaybackSpeed::Half),
            75 => Ok(PlaybackSpeed::ThreeQuarters),
            100 => Ok(PlaybackSpeed::Full),
            other => Err(ReplayError::Validation(format!(
                "playback speed must be one of 25, 50, 75, 100 (got {})",
                other
            ))),
        }
    }
}

impl From<PlaybackSpeed> for u32 {
    fn from(speed: PlaybackSpeed) -> Self {
        speed.percent()
    }
}

/// Check a buffer duration against the 5..=60 second range. Out-of-range
/// values are rejected, never clamped.
pub fn validate_duration(seconds: i64) -> Result<u32> {
    if (MIN_BUFFER_SECONDS..=MAX_BUFFER_SECONDS).contains(&seconds) {
        Ok(seconds as u32)
    } else {
        Err(ReplayError::Validation(format!(
            "buffer duration must be between {} and {} seconds (got {})",
            MIN_BUFFER_SECONDS, MAX_BUFFER_SECONDS, seconds
        )))
    }
}

/// Persisted replay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySettings {
    /// Length of the switcher's replay buffer (5-60 s)
    #[serde(alias = "duration", default = "default_buffer_duration")]
    pub buffer_duration_seconds: u32,

    /// Speed used when the caller does not pick one
    #[serde(alias = "speed", default = "default_playback_speed")]
    pub default_playback_speed_percent: PlaybackSpeed,

    /// Whether higher-level logic should capture replays automatically
    #[serde(alias = "enableAutoReplay", default)]
    pub auto_replay_enabled: bool,

    /// Which event types trigger automatic capture
    #[serde(alias = "events", default = "default_event_types")]
    pub event_type_enablement: BTreeMap<String, bool>,
}

fn default_buffer_duration() -> u32 {
    8
}

fn default_playback_speed() -> PlaybackSpeed {
    PlaybackSpeed::Half
}

fn default_event_types() -> BTreeMap<String, bool> {
    ["point", "set", "match"]
        .into_iter()
        .map(|t| (t.to_string(), true))
        .collect()
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            buffer_duration_seconds: default_buffer_duration(),
            default_playback_speed_percent: default_playback_speed(),
            auto_replay_enabled: false,
            event_type_enablement: default_event_types(),
        }
    }
}
