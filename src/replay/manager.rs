//! Replay event manager
//!
//! Drives the switcher's replay buffer and keeps the local event list in
//! step with the events it marks. The switcher numbers its own buffer events
//! and offers no way to list, rename after the fact, or delete them, so the
//! local list is the only source of truth for display. Playback of a marked
//! event walks a fallback chain because the two numberings are not known to
//! agree for every switcher firmware.
//!
//! Recording and playback flags live in memory only and reflect the outcome
//! of the last command sent from this process.

use anyhow::Result as AnyResult;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{error, info, warn};

use super::{
    event_display_name, validate_duration, CommandOutcome, DeleteOutcome, MarkOutcome,
    PlayOutcome, PlaybackSpeed, PlaybackTier, RecordingSession, ReplayEvent, ReplayNotification,
    ReplaySettings, ReplayStatus,
};
use crate::config::{Config, PlaybackConfig};
use crate::error::{ReplayError, Result};
use crate::store::{EventStore, SettingsStore, EVENTS_FILE_NAME, SETTINGS_FILE_NAME};
use crate::switcher::{commands, params, HttpSwitcherClient, SwitcherClient};

/// Told to the caller whenever a local delete leaves the switcher's copy behind
const DELETE_DESYNC_WARNING: &str = "The event was removed from the local list only. \
The switcher keeps its own copy because its API cannot delete individual replay events, \
so switcher event numbers no longer match local indices past this point.";

const NOTIFICATION_CAPACITY: usize = 64;

/// Owns the replay session and the two stores.
///
/// The event store lock is held for the whole of an operation that derives
/// indices from the event count, so concurrent calls cannot hand out the
/// same index twice. The event count is mirrored outside that lock so status
/// reads never wait on a switcher round-trip.
pub struct ReplayManager {
    switcher: Arc<dyn SwitcherClient>,
    events: Mutex<EventStore>,
    event_count: AtomicUsize,
    settings: Mutex<SettingsStore>,
    session: RwLock<RecordingSession>,
    playback: PlaybackConfig,
    notify_tx: broadcast::Sender<ReplayNotification>,
}

impl ReplayManager {
    /// Create a manager from injected collaborators
    pub fn new(
        switcher: Arc<dyn SwitcherClient>,
        events: EventStore,
        settings: SettingsStore,
        playback: PlaybackConfig,
    ) -> Self {
        let (notify_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            switcher,
            event_count: AtomicUsize::new(events.len()),
            events: Mutex::new(events),
            settings: Mutex::new(settings),
            session: RwLock::new(RecordingSession::default()),
            playback,
            notify_tx,
        }
    }

    /// Wire up the HTTP switcher client and file stores described by `config`
    pub fn from_config(config: &Config) -> AnyResult<Self> {
        let data_dir = config.data_dir()?;
        info!("Replay data directory: {:?}", data_dir);

        let switcher = Arc::new(HttpSwitcherClient::new(&config.switcher));
        let events = EventStore::open(data_dir.join(EVENTS_FILE_NAME));
        let settings = SettingsStore::open(data_dir.join(SETTINGS_FILE_NAME));

        Ok(Self::new(switcher, events, settings, config.playback.clone()))
    }

    /// Probe the switcher without changing any state
    pub async fn is_switcher_reachable(&self) -> bool {
        self.switcher.check_connection().await
    }

    /// Receive state-change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ReplayNotification> {
        self.notify_tx.subscribe()
    }

    /// Current persisted replay settings
    pub async fn get_config(&self) -> ReplaySettings {
        self.settings.lock().await.settings().clone()
    }

    /// Snapshot of the local event list
    pub async fn list_events(&self) -> Vec<ReplayEvent> {
        self.events.lock().await.events().to_vec()
    }

    /// Recording/playback flags and event count. No switcher round-trip.
    pub async fn status(&self) -> ReplayStatus {
        let event_count = self.event_count.load(Ordering::Acquire);
        let session = self.session.read().await;
        ReplayStatus {
            is_recording: session.is_recording,
            is_playing: session.is_playing,
            recording_elapsed_seconds: session.elapsed_seconds(Utc::now()),
            event_count,
        }
    }

    /// Set the length of the switcher's replay buffer (5-60 s)
    pub async fn set_duration(&self, seconds: i64) -> Result<CommandOutcome> {
        let seconds = validate_duration(seconds)?;
        self.ensure_connected().await?;

        self.send(commands::SET_DURATION, &[(params::VALUE, seconds.to_string())])
            .await?;

        let mut settings = self.settings.lock().await;
        if !settings.set_duration(i64::from(seconds)) {
            warn!("Buffer duration applied on the switcher but not saved locally");
        }
        drop(settings);

        info!("Replay buffer duration set to {} seconds", seconds);
        self.notify(ReplayNotification::DurationChanged { seconds });
        Ok(CommandOutcome {
            message: format!("Replay buffer duration set to {} seconds", seconds),
        })
    }

    /// Start recording into the replay buffer
    pub async fn start_recording(&self) -> Result<CommandOutcome> {
        self.ensure_connected().await?;
        self.send(commands::START_RECORDING, &[]).await?;

        let mut session = self.session.write().await;
        session.is_recording = true;
        session.started_at = Some(Utc::now());
        drop(session);

        info!("Replay recording started");
        self.notify(ReplayNotification::RecordingStarted);
        Ok(CommandOutcome {
            message: "Replay recording started".to_string(),
        })
    }

    /// Stop recording into the replay buffer
    pub async fn stop_recording(&self) -> Result<CommandOutcome> {
        self.ensure_connected().await?;
        self.send(commands::STOP_RECORDING, &[]).await?;

        let mut session = self.session.write().await;
        session.is_recording = false;
        session.started_at = None;
        drop(session);

        info!("Replay recording stopped");
        self.notify(ReplayNotification::RecordingStopped);
        Ok(CommandOutcome {
            message: "Replay recording stopped".to_string(),
        })
    }

    /// Play the most recent buffer at `speed` percent
    pub async fn play_last(&self, speed: u32) -> Result<CommandOutcome> {
        let speed = PlaybackSpeed::try_from(speed)?;
        self.ensure_connected().await?;

        info!("Playing last replay at {}%", speed.percent());
        if !self.play_most_recent(speed).await {
            error!("Failed to play last replay");
            return Err(ReplayError::remote(commands::PLAY_LAST));
        }

        self.set_playing(true).await;
        self.notify(ReplayNotification::PlaybackStarted {
            tier: PlaybackTier::MostRecent,
            speed,
        });
        Ok(CommandOutcome {
            message: format!("Playing last replay at {}%", speed.percent()),
        })
    }

    /// Pause replay playback
    pub async fn pause(&self) -> Result<CommandOutcome> {
        self.ensure_connected().await?;
        self.send(commands::PAUSE, &[]).await?;

        self.set_playing(false).await;
        info!("Replay paused");
        self.notify(ReplayNotification::PlaybackPaused);
        Ok(CommandOutcome {
            message: "Replay paused".to_string(),
        })
    }

    /// Mark a new replay event on the switcher and record it locally.
    ///
    /// Mark-in is the only step whose failure aborts the operation. A failed
    /// mark-out or rename still leaves a usable in-point, so the event is
    /// kept and the outcome reports which step failed.
    pub async fn mark_event(&self, name: Option<&str>, event_type: &str) -> Result<MarkOutcome> {
        if event_type.trim().is_empty() {
            return Err(ReplayError::Validation(
                "event type must not be empty".to_string(),
            ));
        }

        let mut events = self.events.lock().await;
        self.ensure_connected().await?;

        // Assumes the switcher numbers buffer events in the same creation
        // order as the local list. Nothing on the switcher confirms this.
        let event_index = events.len();
        let value = event_index.to_string();

        if !self
            .switcher
            .send_command(commands::MARK_IN, &[(params::VALUE, value.clone())])
            .await
        {
            error!("Mark-in failed for event {}", event_index);
            return Err(ReplayError::remote(commands::MARK_IN));
        }

        let name = event_display_name(name, event_index);

        let mark_out_failed = !self
            .switcher
            .send_command(commands::MARK_OUT, &[(params::VALUE, value.clone())])
            .await;
        if mark_out_failed {
            warn!(
                "Mark-out failed for event {}, keeping the in-point only",
                event_index
            );
        }

        let rename_failed = !self
            .switcher
            .send_command(
                commands::RENAME_EVENT,
                &[(params::VALUE, value), (params::NAME, name.clone())],
            )
            .await;
        if rename_failed {
            warn!("Switcher did not accept name {:?} for event {}", name, event_index);
        }

        let buffer_duration = self.settings.lock().await.buffer_duration_seconds();
        let event = ReplayEvent::new(name, event_type.to_string(), event_index, buffer_duration);
        events.append(event.clone());
        self.event_count.store(events.len(), Ordering::Release);
        let snapshot = events.events().to_vec();
        drop(events);

        info!(
            "Marked replay event {:?} (index {}, buffer {}s)",
            event.name, event.local_index, event.buffer_duration_seconds
        );
        self.notify(ReplayNotification::EventMarked {
            event: event.clone(),
        });

        let message = match (mark_out_failed, rename_failed) {
            (false, false) => format!("Event {:?} marked", event.name),
            (true, _) => format!("Event {:?} marked without an out-point", event.name),
            (false, true) => format!("Event {:?} marked, switcher kept its default name", event.name),
        };
        Ok(MarkOutcome {
            event,
            events: snapshot,
            mark_out_failed,
            rename_failed,
            message,
        })
    }

    /// Play the event at `local_index` at `speed` percent.
    ///
    /// Tries, in order and only while the previous attempt failed: the local
    /// index as the switcher's event number, the newest-first index
    /// `count - 1 - local_index`, and finally the most recent buffer. The
    /// last two can be switched off in `PlaybackConfig`.
    pub async fn play_event(&self, local_index: usize, speed: u32) -> Result<PlayOutcome> {
        let events = self.events.lock().await;
        let count = events.len();
        if local_index >= count {
            return Err(ReplayError::IndexOutOfRange {
                index: local_index,
                len: count,
            });
        }
        let speed = PlaybackSpeed::try_from(speed)?;
        self.ensure_connected().await?;

        let tier = self.resolve_playback(local_index, count, speed).await;
        drop(events);

        let Some(tier) = tier else {
            error!("All playback attempts failed for event {}", local_index);
            return Err(ReplayError::remote(commands::PLAY_EVENT));
        };

        self.set_playing(true).await;
        self.notify(ReplayNotification::PlaybackStarted { tier, speed });

        let message = match tier {
            PlaybackTier::Direct { .. } => {
                format!("Playing event {} at {}%", local_index, speed.percent())
            }
            PlaybackTier::Mirrored { remote_index } => format!(
                "Playing event {} as switcher event {} at {}%",
                local_index,
                remote_index,
                speed.percent()
            ),
            PlaybackTier::MostRecent => format!(
                "Event {} could not be addressed, playing the most recent replay at {}%",
                local_index,
                speed.percent()
            ),
        };
        Ok(PlayOutcome { tier, message })
    }

    /// Remove an event from the local list.
    ///
    /// The switcher cannot delete marked events, so its copy stays and the
    /// returned warning says so.
    pub async fn delete_event(&self, local_index: usize) -> Result<DeleteOutcome> {
        let mut events = self.events.lock().await;
        let (removed, remaining) = events.delete_at(local_index)?;
        self.event_count.store(remaining.len(), Ordering::Release);
        drop(events);

        info!("Deleted replay event {:?} from the local list", removed.name);
        warn!("{}", DELETE_DESYNC_WARNING);
        self.notify(ReplayNotification::EventDeleted {
            index: local_index,
            warning: DELETE_DESYNC_WARNING.to_string(),
        });

        Ok(DeleteOutcome {
            message: format!("Event {:?} deleted", removed.name),
            removed,
            events: remaining,
            warning: DELETE_DESYNC_WARNING.to_string(),
        })
    }

    async fn resolve_playback(
        &self,
        local_index: usize,
        count: usize,
        speed: PlaybackSpeed,
    ) -> Option<PlaybackTier> {
        info!("Playing event {} at {}%", local_index, speed.percent());
        if self.play_switcher_event(local_index, speed).await {
            return Some(PlaybackTier::Direct {
                remote_index: local_index,
            });
        }

        if self.playback.mirrored_index_fallback {
            let mirrored = count - 1 - local_index;
            info!(
                "Retrying event {} as newest-first switcher event {}",
                local_index, mirrored
            );
            if self.play_switcher_event(mirrored, speed).await {
                return Some(PlaybackTier::Mirrored {
                    remote_index: mirrored,
                });
            }
        }

        if self.playback.play_last_fallback {
            warn!(
                "Event {} could not be addressed, falling back to the most recent replay",
                local_index
            );
            if self.play_most_recent(speed).await {
                return Some(PlaybackTier::MostRecent);
            }
        }

        None
    }

    async fn play_switcher_event(&self, remote_index: usize, speed: PlaybackSpeed) -> bool {
        self.switcher
            .send_command(
                commands::PLAY_EVENT,
                &[
                    (params::VALUE, remote_index.to_string()),
                    (params::SPEED, speed.percent().to_string()),
                ],
            )
            .await
    }

    async fn play_most_recent(&self, speed: PlaybackSpeed) -> bool {
        self.switcher
            .send_command(
                commands::PLAY_LAST,
                &[(params::SPEED, speed.percent().to_string())],
            )
            .await
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.switcher.check_connection().await {
            Ok(())
        } else {
            error!("Cannot reach the switcher");
            Err(ReplayError::Connection(
                "switcher did not answer the connectivity probe".to_string(),
            ))
        }
    }

    async fn send(&self, function: &str, command_params: &[(&str, String)]) -> Result<()> {
        if self.switcher.send_command(function, command_params).await {
            Ok(())
        } else {
            error!("Switcher command {} failed", function);
            Err(ReplayError::remote(function))
        }
    }

    async fn set_playing(&self, playing: bool) {
        self.session.write().await.is_playing = playing;
    }

    fn notify(&self, notification: ReplayNotification) {
        // No subscribers is fine
        let _ = self.notify_tx.send(notification);
    }
}
