//! replay-deck
//!
//! Instant replay control for an HTTP-driven live production switcher:
//! records the rolling replay buffer, marks named events and plays them back,
//! keeping a local event list alongside the switcher's own numbering.

pub mod config;
pub mod error;
pub mod logging;
pub mod replay;
pub mod store;
pub mod switcher;

pub use config::Config;
pub use error::{ErrorKind, ReplayError};
pub use replay::{ReplayManager, ReplayNotification, ReplayStatus};
