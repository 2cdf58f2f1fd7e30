//! Background loops.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::bridge::Bridge;

/// Log a heartbeat every `period` until shutdown. The first beat is immediate.
pub async fn run_heartbeat(bridge: Bridge, period: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                bridge.heartbeat().await;
            }
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Heartbeat loop stopped");
}

/// Run `sync_now` every `period` until shutdown. The first sync waits one period.
pub async fn run_sync(bridge: Bridge, period: Duration, mut shutdown: broadcast::Receiver<()>) {
    let start = tokio::time::Instant::now() + period;
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let result = bridge.sync_now().await;
                if result.success {
                    tracing::info!(message = %result.message, "Scheduled sync finished");
                } else {
                    tracing::warn!(message = %result.message, "Scheduled sync failed");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Sync loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditLog, LogQuery};
    use crate::config::ConfigStore;
    use crate::lifecycle::Shutdown;
    use crate::storage::Storage;

    #[tokio::test]
    async fn test_heartbeat_beats_immediately_and_stops() {
        let storage = Storage::open_in_memory().await.unwrap();
        let bridge = Bridge::new(ConfigStore::new(&storage, AuditLog::new(&storage)));
        let mut live = bridge.audit().subscribe();
        let shutdown = Shutdown::new();

        let task = tokio::spawn(run_heartbeat(
            bridge.clone(),
            Duration::from_secs(3600),
            shutdown.subscribe(),
        ));

        let first = tokio::time::timeout(Duration::from_secs(2), live.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.event, "heartbeat");

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();

        let beats = bridge.audit().get_logs(&LogQuery::new().event("heartbeat")).await;
        assert_eq!(beats.len(), 1);
    }
}
