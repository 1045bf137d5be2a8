use std::time::Duration;

use chrono::Utc;
use officehours_core::service::PresenceService;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodically marks users that stopped sending heartbeats as offline.
pub fn spawn_presence_monitor(
    presence: PresenceService,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Presence monitor started (every {:?})", every);
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => match presence.sweep_inactive(Utc::now()).await {
                    Ok(changed) => debug!("Presence sweep marked {} users offline", changed.len()),
                    Err(e) => warn!("Presence sweep failed: {}", e),
                },
            }
        }

        info!("Presence monitor stopped");
    })
}
