use crate::domain::checkpoint::{format_utc, parse_utc, truncate_to_seconds, SyncCheckpoint};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

#[derive(Clone)]
pub struct SyncStateRepo {
    pub pool: SqlitePool,
}

impl SyncStateRepo {
    pub async fn load_checkpoint(&self) -> Result<SyncCheckpoint> {
        let row = sqlx::query("SELECT last_synced_at FROM sync_state WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        let raw: Option<String> = row.and_then(|r| r.get("last_synced_at"));
        match raw {
            None => Ok(SyncCheckpoint::never()),
            Some(s) => parse_utc(&s)
                .map(|when| SyncCheckpoint { last_synced_at: Some(when) })
                .ok_or_else(|| anyhow!("stored checkpoint is not a timestamp: {s:?}")),
        }
    }

    /// Persists `when` unless the stored checkpoint is already at or past it.
    /// Values are compared as instants, so a stored offset or fractional
    /// timestamp written by another tool is ordered correctly.
    /// Returns whether the stored value changed.
    pub async fn save_checkpoint(&self, when: DateTime<Utc>) -> Result<bool> {
        let when = truncate_to_seconds(when);
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT last_synced_at FROM sync_state WHERE id = 1")
            .fetch_optional(&mut *tx)
            .await?;
        let stored: Option<String> = row.and_then(|r| r.get("last_synced_at"));
        if let Some(s) = stored {
            match parse_utc(&s) {
                Some(current) if current >= when => {
                    tx.rollback().await?;
                    return Ok(false);
                }
                Some(_) => {}
                None => tracing::warn!("replacing unparseable stored checkpoint {:?}", s),
            }
        }

        sqlx::query(
            r#"
            INSERT INTO sync_state (id, last_synced_at) VALUES (1, ?1)
            ON CONFLICT (id) DO UPDATE SET last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(format_utc(when))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
