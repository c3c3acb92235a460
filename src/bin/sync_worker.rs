use anyhow::Result;
use clap::Parser;
use payments_mirror::config::{AppConfig, ProviderCredentials};
use payments_mirror::gateways::mercadopago::MercadoPagoProvider;
use payments_mirror::service::sync_orchestrator::{SyncMode, SyncOptions, SyncOrchestrator};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Mirrors recently updated provider payments into the local store.
#[derive(Debug, Parser)]
struct Args {
    /// Days to cover when there is no checkpoint, or with --full-sync.
    #[arg(long, env = "SYNC_DAYS_BACK")]
    days_back: Option<i64>,

    /// Ignore the stored checkpoint and resync the last --days-back days.
    #[arg(long)]
    full_sync: bool,

    /// With --full-sync, still write the checkpoint when the pass succeeds.
    #[arg(long, requires = "full_sync")]
    advance_checkpoint: bool,

    /// Keep running, one pass every N seconds.
    #[arg(long, env = "SYNC_INTERVAL_SECS")]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let cfg = AppConfig::from_env();

    let credentials = match ProviderCredentials::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("refusing to sync: {}", e);
            std::process::exit(2);
        }
    };

    let pool = payments_mirror::db::connect(&cfg.database_url, 1).await?;
    let provider = Arc::new(MercadoPagoProvider::new(
        cfg.provider_base_url.clone(),
        credentials,
        cfg.timeouts.clone(),
    ));
    let orchestrator = SyncOrchestrator::new(pool, provider, &cfg.sync);

    let options = SyncOptions {
        days_back: args.days_back.unwrap_or(cfg.sync.default_days_back),
        mode: if args.full_sync {
            SyncMode::FullResync {
                persist_checkpoint: args.advance_checkpoint,
            }
        } else {
            SyncMode::Incremental
        },
    };

    let Some(interval) = args.interval_secs else {
        let report = orchestrator.run(options, chrono::Utc::now()).await;
        println!("{}", report);
        if report.is_aborted() {
            std::process::exit(1);
        }
        return Ok(());
    };

    // Passes run back to back in this task, never concurrently.
    loop {
        let report = orchestrator.run(options, chrono::Utc::now()).await;
        println!("{}", report);
        if report.credentials_rejected {
            tracing::error!("stopping: provider rejected the access token");
            std::process::exit(1);
        }
        tokio::time::sleep(std::time::Duration::from_secs(interval.max(1))).await;
    }
}
