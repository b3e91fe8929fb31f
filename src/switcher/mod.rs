//! Switcher control API client
//!
//! The switcher exposes a request/response HTTP interface: every command is a
//! GET on the API endpoint with a `Function` query parameter plus arbitrary
//! key/value parameters. Only the HTTP status is consulted, 200 means success.

mod client;
#[cfg(test)]
pub(crate) mod fake;

pub use client::HttpSwitcherClient;

use async_trait::async_trait;

/// Switcher function names used by the replay manager
pub mod commands {
    pub const SET_DURATION: &str = "ReplaySetDuration";
    pub const START_RECORDING: &str = "ReplayStartRecording";
    pub const STOP_RECORDING: &str = "ReplayStopRecording";
    pub const PLAY_LAST: &str = "ReplayPlay";
    pub const PAUSE: &str = "ReplayPause";
    pub const MARK_IN: &str = "ReplayMarkIn";
    pub const MARK_OUT: &str = "ReplayMarkOut";
    pub const RENAME_EVENT: &str = "ReplayChangeEventName";
    pub const PLAY_EVENT: &str = "ReplayPlayEvent";
}

/// Parameter keys accepted by the replay functions
pub mod params {
    pub const VALUE: &str = "Value";
    pub const SPEED: &str = "Speed";
    pub const NAME: &str = "Name";
}

/// Stateless command channel to the switcher.
///
/// Implementations never fail past their own boundary: timeouts, refused
/// connections and non-success statuses all come back as `false`.
#[async_trait]
pub trait SwitcherClient: Send + Sync {
    /// Fire `function` with the given parameters, true on a 200 response
    async fn send_command(&self, function: &str, params: &[(&str, String)]) -> bool;

    /// Lightweight reachability probe with a short timeout
    async fn check_connection(&self) -> bool;
}
