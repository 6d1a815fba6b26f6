//! Automatic backup scheduling
//!
//! A fixed-interval loop: each tick creates a backup and prunes expired
//! ones. No cron table, no drift correction; the interval restarts from
//! whenever the previous tick's work finished, and because the loop awaits
//! each run, a single scheduler never overlaps its own backups.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::services::backup::BackupService;

pub struct BackupScheduler {
    backups: Arc<BackupService>,
    owner: String,
    interval: Duration,
}

/// Handle for a running scheduler. Dropping it without calling `shutdown`
/// leaves the loop running for the life of the runtime.
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop. Idempotent; a tick already in flight finishes first.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

impl BackupScheduler {
    pub fn new(backups: Arc<BackupService>, owner: impl Into<String>, interval: Duration) -> Self {
        Self {
            backups,
            owner: owner.into(),
            interval,
        }
    }

    /// Spawn the scheduler loop onto the current runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (stop, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            log::info!(
                "Backup scheduler running every {}s for owner {}",
                self.interval.as_secs(),
                self.owner
            );

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {
                        self.run_once().await;
                    }
                    _ = stopped.changed() => {
                        log::info!("Backup scheduler stopped");
                        break;
                    }
                }
            }
        });

        SchedulerHandle { stop, task }
    }

    /// One scheduled pass: create a backup, then apply retention. Failures
    /// are logged and the loop continues; the next tick gets a fresh try.
    async fn run_once(&self) {
        match self
            .backups
            .create_backup(&self.owner, Some("Scheduled backup".to_string()))
            .await
        {
            Ok(metadata) => {
                log::info!("Scheduled backup {} completed", metadata.id);
            }
            Err(e) => {
                log::warn!("Scheduled backup failed: {}", e);
            }
        }

        let pruned = self.backups.prune_expired(&self.owner).await;
        if pruned > 0 {
            log::info!("Scheduled retention pruned {} backup(s)", pruned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackupConfig;
    use crate::notification::test_support::CapturingNotifier;
    use crate::storage::test_support::memory_adapter;

    fn backups() -> Arc<BackupService> {
        let (adapter, _) = memory_adapter();
        Arc::new(BackupService::new(
            adapter,
            CapturingNotifier::shared(),
            BackupConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_scheduler_creates_backups_on_interval() {
        let backups = backups();
        let scheduler = BackupScheduler::new(backups.clone(), "anon", Duration::from_millis(20));
        let handle = scheduler.spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.shutdown().await;

        let history = backups.list_history("anon").await;
        assert!(
            !history.is_empty(),
            "expected at least one scheduled backup"
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_loop() {
        let backups = backups();
        let scheduler = BackupScheduler::new(backups.clone(), "anon", Duration::from_millis(20));
        let handle = scheduler.spawn();

        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.shutdown().await;
        let count_at_shutdown = backups.list_history("anon").await.len();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(backups.list_history("anon").await.len(), count_at_shutdown);
    }

    #[tokio::test]
    async fn test_run_once_applies_retention() {
        let backups = backups();
        let scheduler = BackupScheduler::new(backups.clone(), "anon", Duration::from_secs(3600));

        scheduler.run_once().await;
        assert_eq!(backups.list_history("anon").await.len(), 1);
    }
}
