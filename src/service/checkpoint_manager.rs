use crate::domain::checkpoint::{baseline_start, window_start, SyncCheckpoint, SyncWindow};
use crate::repo::sync_state_repo::SyncStateRepo;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

#[derive(Clone)]
pub struct CheckpointManager {
    pub sync_state_repo: SyncStateRepo,
    pub overlap: Duration,
}

impl CheckpointManager {
    pub async fn current(&self) -> Result<SyncCheckpoint> {
        self.sync_state_repo.load_checkpoint().await
    }

    pub async fn window_start(&self, default_days_back: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let checkpoint = self.current().await?;
        Ok(window_start(&checkpoint, now, default_days_back, self.overlap))
    }

    /// Incremental window ending at `now`.
    pub async fn incremental_window(&self, default_days_back: i64, now: DateTime<Utc>) -> Result<SyncWindow> {
        let begin = self.window_start(default_days_back, now).await?;
        // A checkpoint ahead of the local clock must not produce an inverted window.
        Ok(SyncWindow {
            begin: begin.min(now),
            end: now,
        })
    }

    /// Forced resync window; never consults persisted state.
    pub fn baseline_window(&self, days_back: i64, now: DateTime<Utc>) -> SyncWindow {
        SyncWindow {
            begin: baseline_start(now, days_back),
            end: now,
        }
    }

    /// Only call after a pass finished its reconciliation loop.
    pub async fn save(&self, when: DateTime<Utc>) -> Result<bool> {
        let advanced = self.sync_state_repo.save_checkpoint(when).await?;
        if !advanced {
            tracing::warn!("checkpoint not advanced: stored value is already at or past {}", when);
        }
        Ok(advanced)
    }
}
