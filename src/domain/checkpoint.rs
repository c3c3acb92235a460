use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

pub const CHECKPOINT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncCheckpoint {
    /// `None` means the mirror has never completed a pass.
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl SyncCheckpoint {
    pub fn never() -> Self {
        Self { last_synced_at: None }
    }

    pub fn at(when: DateTime<Utc>) -> Self {
        Self {
            last_synced_at: Some(truncate_to_seconds(when)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncWindow {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    pub fn begin_iso(&self) -> String {
        format_utc(self.begin)
    }

    pub fn end_iso(&self) -> String {
        format_utc(self.end)
    }
}

impl std::fmt::Display for SyncWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.begin_iso(), self.end_iso())
    }
}

pub fn format_utc(when: DateTime<Utc>) -> String {
    when.format(CHECKPOINT_FORMAT).to_string()
}

/// Accepts the stored format as well as RFC 3339 with offset or fraction.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, CHECKPOINT_FORMAT) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn truncate_to_seconds(when: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(when.timestamp(), 0).single().unwrap_or(when)
}

/// Start of the next window: `checkpoint - overlap`, or `now - days_back`
/// when no checkpoint exists yet.
pub fn window_start(
    checkpoint: &SyncCheckpoint,
    now: DateTime<Utc>,
    default_days_back: i64,
    overlap: Duration,
) -> DateTime<Utc> {
    match checkpoint.last_synced_at {
        Some(last) => last - overlap,
        None => baseline_start(now, default_days_back),
    }
}

pub fn baseline_start(now: DateTime<Utc>, days_back: i64) -> DateTime<Utc> {
    now - Duration::days(days_back.max(0))
}
