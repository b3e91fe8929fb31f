//! replay-deck
//!
//! Loads the replay state, checks the switcher and relays replay
//! notifications to the log until interrupted.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use replay_deck::logging::init_logging;
use replay_deck::{Config, ReplayManager, ReplayNotification};

fn main() -> Result<()> {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging()?;

    info!("replay-deck starting...");

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded from {:?}", config.config_path()?);

    // Create tokio runtime for async operations
    let runtime = tokio::runtime::Runtime::new()?;

    let manager = Arc::new(ReplayManager::from_config(&config)?);

    // Set up Ctrl+C handler that signals shutdown
    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        let _ = shutdown_tx.send(());
    })?;

    runtime.block_on(async move {
        if manager.is_switcher_reachable().await {
            info!("Switcher reachable at {}", config.switcher.base_url());
        } else {
            warn!(
                "Switcher not reachable at {}, replay commands will fail until it is",
                config.switcher.base_url()
            );
        }

        let settings = manager.get_config().await;
        let events = manager.list_events().await;
        info!(
            "Replay buffer {}s, default speed {}%, {} stored events",
            settings.buffer_duration_seconds,
            settings.default_playback_speed_percent.percent(),
            events.len()
        );
        for event in &events {
            info!(
                "  #{} {:?} [{}] marked {}",
                event.local_index, event.name, event.event_type, event.created_at
            );
        }

        let mut notifications = manager.subscribe();
        let relay = tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(notification) => log_notification(&notification),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Notification relay lagged, {} notifications dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        shutdown_rx.recv().await;
        relay.abort();

        let status = manager.status().await;
        info!(
            "Final replay status: recording={}, playing={}, events={}",
            status.is_recording, status.is_playing, status.event_count
        );
    });

    info!("Shutdown complete");
    Ok(())
}

fn log_notification(notification: &ReplayNotification) {
    match notification {
        ReplayNotification::DurationChanged { seconds } => {
            info!("Replay buffer duration changed to {}s", seconds)
        }
        ReplayNotification::RecordingStarted => info!("Replay recording started"),
        ReplayNotification::RecordingStopped => info!("Replay recording stopped"),
        ReplayNotification::PlaybackStarted { tier, speed } => {
            info!("Replay playback started ({:?}, {}%)", tier, speed.percent())
        }
        ReplayNotification::PlaybackPaused => info!("Replay playback paused"),
        ReplayNotification::EventMarked { event } => {
            info!("Replay event {:?} marked at #{}", event.name, event.local_index)
        }
        ReplayNotification::EventDeleted { index, warning } => {
            warn!("Replay event #{} deleted: {}", index, warning)
        }
    }
}

fn print_help() {
    println!("replay-deck - instant replay event manager for a live production switcher");
    println!();
    println!("USAGE:");
    println!("    replay-deck [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help    Print this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG              Set log level (e.g., debug, info, warn)");
    println!("    REPLAY_DECK_LOG_PATH  Override the log directory");
}
