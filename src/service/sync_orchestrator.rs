use crate::config::SyncSettings;
use crate::domain::checkpoint::{truncate_to_seconds, SyncWindow};
use crate::domain::payment::PaymentSummary;
use crate::gateways::PaymentProvider;
use crate::repo::payments_repo::PaymentsRepo;
use crate::repo::sync_state_repo::SyncStateRepo;
use crate::service::checkpoint_manager::CheckpointManager;
use crate::service::identity_resolver::IdentityResolver;
use crate::service::payment_fetcher::PaymentFetcher;
use crate::service::reconciler::Reconciler;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncMode {
    Incremental,
    /// Ignores the stored checkpoint and re-covers `now - days_back`.
    FullResync { persist_checkpoint: bool },
}

impl SyncMode {
    fn persists_checkpoint(&self) -> bool {
        match self {
            SyncMode::Incremental => true,
            SyncMode::FullResync { persist_checkpoint } => *persist_checkpoint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncOptions {
    pub days_back: i64,
    pub mode: SyncMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncPhase {
    ComputeWindow,
    Fetching,
    Reconciling,
    Checkpointing,
    Done,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SyncOutcome {
    Completed,
    Aborted { phase: SyncPhase, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub mode: SyncMode,
    pub window: Option<SyncWindow>,
    pub phase: SyncPhase,
    pub found: usize,
    pub duplicates: usize,
    pub upserted: usize,
    pub detail_fallbacks: usize,
    pub item_failures: usize,
    pub errors: Vec<String>,
    /// The provider rejected the access token; retrying cannot succeed.
    pub credentials_rejected: bool,
    pub checkpoint_advanced: bool,
    pub outcome: SyncOutcome,
}

impl SyncReport {
    fn new(mode: SyncMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            window: None,
            phase: SyncPhase::ComputeWindow,
            found: 0,
            duplicates: 0,
            upserted: 0,
            detail_fallbacks: 0,
            item_failures: 0,
            errors: Vec::new(),
            credentials_rejected: false,
            checkpoint_advanced: false,
            outcome: SyncOutcome::Completed,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Aborted { .. })
    }

    fn abort(mut self, reason: String) -> Self {
        tracing::error!("sync {} aborted during {:?}: {}", self.run_id, self.phase, reason);
        self.errors.push(reason.clone());
        self.outcome = SyncOutcome::Aborted {
            phase: self.phase,
            reason,
        };
        self.phase = SyncPhase::Aborted;
        self
    }

    fn item_failed(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.item_failures += 1;
        self.errors.push(message);
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let window = self
            .window
            .map(|w| w.to_string())
            .unwrap_or_else(|| "<none>".to_string());
        let outcome = match &self.outcome {
            SyncOutcome::Completed => "completed".to_string(),
            SyncOutcome::Aborted { phase, reason } => format!("ABORTED in {:?}: {}", phase, reason),
        };
        write!(
            f,
            "sync {} [{}] window {}: found={} upserted={} detail_fallbacks={} item_failures={} checkpoint_advanced={}",
            self.run_id,
            outcome,
            window,
            self.found,
            self.upserted,
            self.detail_fallbacks,
            self.item_failures,
            self.checkpoint_advanced
        )
    }
}

/// Drives one reconciliation pass. Passes must not overlap against the same
/// store; callers serialize them.
#[derive(Clone)]
pub struct SyncOrchestrator {
    pub checkpoints: CheckpointManager,
    pub fetcher: PaymentFetcher,
    pub reconciler: Reconciler,
}

impl SyncOrchestrator {
    pub fn new(pool: SqlitePool, provider: Arc<dyn PaymentProvider>, settings: &SyncSettings) -> Self {
        Self {
            checkpoints: CheckpointManager {
                sync_state_repo: SyncStateRepo { pool: pool.clone() },
                overlap: settings.checkpoint_overlap,
            },
            fetcher: PaymentFetcher {
                provider: provider.clone(),
                page_size: settings.page_size,
                page_delay: settings.page_delay,
            },
            reconciler: Reconciler {
                payments_repo: PaymentsRepo { pool },
                identity_resolver: IdentityResolver { provider },
            },
        }
    }

    pub async fn run(&self, options: SyncOptions, now: DateTime<Utc>) -> SyncReport {
        let now = truncate_to_seconds(now);
        let mut report = SyncReport::new(options.mode);

        // ComputeWindow
        let window = match options.mode {
            SyncMode::Incremental => match self.checkpoints.incremental_window(options.days_back, now).await {
                Ok(w) => w,
                Err(e) => return report.abort(format!("could not read checkpoint: {e:#}")),
            },
            SyncMode::FullResync { .. } => {
                tracing::info!("full resync requested, ignoring stored checkpoint");
                self.checkpoints.baseline_window(options.days_back, now)
            }
        };
        report.window = Some(window);
        tracing::info!(
            "sync {} against {} window {}",
            report.run_id,
            self.fetcher.provider.name(),
            window
        );

        // Fetching
        report.phase = SyncPhase::Fetching;
        let summaries = match self.fetcher.collect_window(&window).await {
            Ok(s) => s,
            Err(e) if e.is_unauthorized() => {
                report.credentials_rejected = true;
                return report.abort(format!("{e}; check MP_ACCESS_TOKEN"));
            }
            Err(e) => return report.abort(format!("payment search failed: {e}")),
        };
        report.found = summaries.len();

        if summaries.is_empty() {
            tracing::info!("no new or updated payments in window");
        } else {
            tracing::info!("found {} payments to process", summaries.len());
            report.phase = SyncPhase::Reconciling;
            self.reconcile_all(summaries, &mut report).await;
        }

        // Checkpointing
        report.phase = SyncPhase::Checkpointing;
        if options.mode.persists_checkpoint() {
            match self.checkpoints.save(window.end).await {
                Ok(advanced) => report.checkpoint_advanced = advanced,
                Err(e) => return report.abort(format!("could not persist checkpoint: {e:#}")),
            }
        }

        report.phase = SyncPhase::Done;
        tracing::info!("{}", report);
        report
    }

    async fn reconcile_all(&self, summaries: Vec<PaymentSummary>, report: &mut SyncReport) {
        let mut seen = HashSet::with_capacity(summaries.len());
        for summary in summaries {
            let Some(id) = summary.id else {
                report.item_failed(format!(
                    "skipped search result without a usable payment id: {}",
                    summary.decode_error.as_deref().unwrap_or("missing id")
                ));
                continue;
            };
            if !seen.insert(id) {
                report.duplicates += 1;
                continue;
            }
            tracing::debug!("processing payment {}", id);
            if let Some(e) = &summary.decode_error {
                tracing::warn!("summary for payment {} only partly decoded: {}", id, e);
            }

            let payment = match self.fetcher.fetch_details(id).await {
                Some(full) => full,
                None => {
                    tracing::warn!("using search summary for payment {}", id);
                    report.detail_fallbacks += 1;
                    match summary.fallback_payment() {
                        Some(p) => p,
                        None => continue,
                    }
                }
            };

            match self.reconciler.upsert(&payment).await {
                Ok(_) => report.upserted += 1,
                Err(e) => report.item_failed(format!("upsert failed for payment {}: {e:#}", payment.id)),
            }
        }
    }
}
