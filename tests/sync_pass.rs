use chrono::{DateTime, Duration, TimeZone, Utc};
use payments_mirror::config::SyncSettings;
use payments_mirror::domain::checkpoint::SyncCheckpoint;
use payments_mirror::gateways::mock::{MockFailure, MockProvider};
use payments_mirror::repo::payments_repo::PaymentsRepo;
use payments_mirror::repo::sync_state_repo::SyncStateRepo;
use payments_mirror::service::sync_orchestrator::{
    SyncMode, SyncOptions, SyncOrchestrator, SyncOutcome, SyncPhase,
};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;

struct Harness {
    provider: Arc<MockProvider>,
    orchestrator: SyncOrchestrator,
    payments: PaymentsRepo,
    sync_state: SyncStateRepo,
}

async fn harness_on(pool: SqlitePool, provider: MockProvider) -> Harness {
    let provider = Arc::new(provider);
    let settings = SyncSettings {
        page_size: 2,
        page_delay: std::time::Duration::ZERO,
        ..SyncSettings::default()
    };
    Harness {
        orchestrator: SyncOrchestrator::new(pool.clone(), provider.clone(), &settings),
        provider,
        payments: PaymentsRepo { pool: pool.clone() },
        sync_state: SyncStateRepo { pool },
    }
}

async fn harness(provider: MockProvider) -> Harness {
    let pool = payments_mirror::db::connect_in_memory().await.unwrap();
    harness_on(pool, provider).await
}

fn incremental() -> SyncOptions {
    SyncOptions {
        days_back: 1,
        mode: SyncMode::Incremental,
    }
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn summary_555() -> serde_json::Value {
    json!({"id": 555, "status": "approved", "transaction_amount": 1000, "currency_id": "ARS"})
}

#[tokio::test]
async fn detail_failure_falls_back_to_summary_and_advances_checkpoint() {
    let h = harness(MockProvider::new().with_page(vec![summary_555()])).await;

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.phase, SyncPhase::Done);
    let window = report.window.unwrap();
    assert_eq!(window.begin_iso(), "2024-01-01T00:00:00Z");
    assert_eq!(window.end_iso(), "2024-01-02T00:00:00Z");
    assert_eq!(report.found, 1);
    assert_eq!(report.upserted, 1);
    assert_eq!(report.detail_fallbacks, 1);

    assert_eq!(h.payments.count().await.unwrap(), 1);
    let row = h.payments.find_by_payment_id(555).await.unwrap().unwrap();
    assert_eq!(row.operation_number, "555");
    assert_eq!(row.status.as_deref(), Some("approved"));
    assert_eq!(row.amount, Some(1000.0));
    assert_eq!(row.currency, "ARS");
    assert_eq!(row.payer_name, None);

    let cp = h.sync_state.load_checkpoint().await.unwrap();
    assert_eq!(cp, SyncCheckpoint::at(at(2024, 1, 2)));
    assert_eq!(h.provider.detail_requests(), vec![555]);
}

#[tokio::test]
async fn unauthorized_search_aborts_without_touching_state() {
    let h = harness(
        MockProvider::new()
            .with_page(vec![summary_555()])
            .with_search_failure(MockFailure::Unauthorized),
    )
    .await;
    h.sync_state.save_checkpoint(at(2024, 1, 1)).await.unwrap();

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    assert!(report.is_aborted());
    assert!(report.credentials_rejected);
    assert_eq!(report.phase, SyncPhase::Aborted);
    assert!(matches!(
        report.outcome,
        SyncOutcome::Aborted { phase: SyncPhase::Fetching, .. }
    ));
    assert_eq!(h.payments.count().await.unwrap(), 0);
    assert_eq!(
        h.sync_state.load_checkpoint().await.unwrap(),
        SyncCheckpoint::at(at(2024, 1, 1))
    );
    assert!(h.provider.detail_requests().is_empty());
}

#[tokio::test]
async fn server_error_on_search_aborts_and_keeps_checkpoint() {
    let h = harness(MockProvider::new().with_search_failure(MockFailure::Status(503))).await;

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    assert!(report.is_aborted());
    assert!(!report.credentials_rejected);
    assert!(!report.checkpoint_advanced);
    assert_eq!(h.sync_state.load_checkpoint().await.unwrap(), SyncCheckpoint::never());
}

#[tokio::test]
async fn empty_window_still_advances_checkpoint() {
    let h = harness(MockProvider::new()).await;

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.found, 0);
    assert!(report.checkpoint_advanced);
    assert_eq!(
        h.sync_state.load_checkpoint().await.unwrap(),
        SyncCheckpoint::at(at(2024, 1, 2))
    );
}

#[tokio::test]
async fn pagination_walks_offsets_until_empty_page() {
    let h = harness(
        MockProvider::new()
            .with_page(vec![json!({"id": 1}), json!({"id": 2})])
            .with_page(vec![json!({"id": 3}), json!({"status": "no id here"})])
            .with_page(vec![json!({"id": 4})]),
    )
    .await;

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    let offsets: Vec<u32> = h.provider.search_requests().iter().map(|q| q.offset).collect();
    assert_eq!(offsets, vec![0, 2, 4, 6]);
    let first = &h.provider.search_requests()[0];
    assert_eq!(first.range, "date_last_updated");
    assert_eq!(first.limit, 2);
    assert_eq!(first.begin_date, "2024-01-01T00:00:00Z");
    assert_eq!(first.end_date, "2024-01-02T00:00:00Z");

    assert_eq!(report.found, 5);
    assert_eq!(report.item_failures, 1);
    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(h.provider.detail_requests(), vec![1, 2, 3, 4]);
    assert_eq!(h.payments.count().await.unwrap(), 4);
}

#[tokio::test]
async fn summary_with_bad_field_still_reaches_the_store() {
    let h = harness(
        MockProvider::new()
            .with_page(vec![json!({"id": 777, "transaction_amount": "1000.00"})])
            .with_details(777, json!({"id": 777, "status": "approved", "transaction_amount": 1000.0})),
    )
    .await;

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.found, 1);
    assert_eq!(report.upserted, 1);
    assert_eq!(report.detail_fallbacks, 0);
    assert_eq!(h.provider.detail_requests(), vec![777]);
    let row = h.payments.find_by_payment_id(777).await.unwrap().unwrap();
    assert_eq!(row.status.as_deref(), Some("approved"));
    assert_eq!(row.amount, Some(1000.0));
}

#[tokio::test]
async fn undecodable_summary_without_details_is_stored_minimally() {
    let h = harness(MockProvider::new().with_page(vec![json!({"id": "778", "transaction_amount": "1000.00"})])).await;

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.upserted, 1);
    assert_eq!(report.detail_fallbacks, 1);
    assert_eq!(report.item_failures, 0);
    assert!(report.checkpoint_advanced);

    let row = h.payments.find_by_payment_id(778).await.unwrap().unwrap();
    assert_eq!(row.operation_number, "778");
    assert_eq!(row.currency, "ARS");
    assert_eq!(row.amount, None);
    let raw: serde_json::Value = serde_json::from_str(row.raw.as_deref().unwrap()).unwrap();
    assert_eq!(raw["transaction_amount"], "1000.00");
}

#[tokio::test]
async fn summary_without_id_is_counted_as_item_failure() {
    let h = harness(MockProvider::new().with_page(vec![json!({"id": "abc"}), json!({"id": 80})])).await;

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.found, 2);
    assert_eq!(report.upserted, 1);
    assert_eq!(report.item_failures, 1);
    assert!(report.errors[0].contains("without a usable payment id"));
    assert_eq!(h.provider.detail_requests(), vec![80]);
}

#[tokio::test]
async fn one_failed_upsert_does_not_stop_the_pass() {
    let pool = payments_mirror::db::connect_in_memory().await.unwrap();
    sqlx::query(
        r#"
        CREATE TRIGGER reject_payment_13 BEFORE INSERT ON payments
        WHEN NEW.payment_id = 13
        BEGIN
            SELECT RAISE(ABORT, 'payment 13 rejected by store');
        END
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    let h = harness_on(
        pool,
        MockProvider::new()
            .with_page(vec![json!({"id": 12}), json!({"id": 13})])
            .with_page(vec![json!({"id": 14})]),
    )
    .await;

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.found, 3);
    assert_eq!(report.upserted, 2);
    assert_eq!(report.item_failures, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("payment 13"));
    assert!(report.errors[0].contains("rejected by store"));
    assert!(report.checkpoint_advanced);

    assert!(h.payments.find_by_payment_id(12).await.unwrap().is_some());
    assert!(h.payments.find_by_payment_id(13).await.unwrap().is_none());
    assert!(h.payments.find_by_payment_id(14).await.unwrap().is_some());
    assert_eq!(
        h.sync_state.load_checkpoint().await.unwrap(),
        SyncCheckpoint::at(at(2024, 1, 2))
    );
}

#[tokio::test]
async fn details_win_over_summary_and_missing_names_use_nickname() {
    let h = harness(
        MockProvider::new()
            .with_page(vec![json!({"id": 10, "status": "pending"}), json!({"id": 11})])
            .with_details(
                10,
                json!({
                    "id": 10,
                    "status": "approved",
                    "status_detail": "accredited",
                    "transaction_amount": 250.75,
                    "date_approved": "2024-01-01T15:00:00.000-03:00",
                    "payer": {"id": "9001", "email": "a@b.c"}
                }),
            )
            .with_details(
                11,
                json!({"id": 11, "status": "approved", "payer": {"first_name": "Ana", "last_name": "Gomez", "id": 42}}),
            )
            .with_nickname("9001", "ANAGOMEZ"),
    )
    .await;

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;
    assert_eq!(report.detail_fallbacks, 0);

    let a = h.payments.find_by_operation_number("10").await.unwrap().unwrap();
    assert_eq!(a.status.as_deref(), Some("approved"));
    assert_eq!(a.status_detail.as_deref(), Some("accredited"));
    assert_eq!(a.payer_name.as_deref(), Some("ANAGOMEZ"));
    assert_eq!(a.payer_email.as_deref(), Some("a@b.c"));

    let b = h.payments.find_by_operation_number("11").await.unwrap().unwrap();
    assert_eq!(b.payer_name.as_deref(), Some("Ana Gomez"));

    // Only the payer without a name needs a profile lookup.
    assert_eq!(h.provider.user_requests(), vec!["9001".to_string()]);
}

#[tokio::test]
async fn failed_identity_lookup_leaves_name_empty() {
    let h = harness(
        MockProvider::new()
            .with_page(vec![json!({"id": 20})])
            .with_details(20, json!({"id": 20, "status": "approved", "payer": {"id": "404404"}})),
    )
    .await;

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    assert_eq!(report.outcome, SyncOutcome::Completed);
    let row = h.payments.find_by_payment_id(20).await.unwrap().unwrap();
    assert_eq!(row.payer_name, None);
}

#[tokio::test]
async fn repeated_passes_are_idempotent() {
    let pool = payments_mirror::db::connect_in_memory().await.unwrap();
    let provider = || {
        MockProvider::new()
            .with_page(vec![json!({"id": 30}), json!({"id": 31})])
            .with_details(30, json!({"id": 30, "status": "approved", "transaction_amount": 10}))
    };

    let first = harness_on(pool.clone(), provider()).await;
    first.orchestrator.run(incremental(), at(2024, 1, 2)).await;
    let before = first.payments.list_all().await.unwrap();

    let second = harness_on(pool.clone(), provider()).await;
    let report = second.orchestrator.run(incremental(), at(2024, 1, 2) + Duration::minutes(5)).await;
    let after = second.payments.list_all().await.unwrap();

    assert_eq!(report.upserted, 2);
    assert_eq!(before.len(), 2);
    assert_eq!(after.len(), 2);
    for (b, a) in before.iter().zip(after.iter()) {
        let mut a = a.clone();
        a.updated_at = b.updated_at.clone();
        assert_eq!(&a, b);
    }
}

#[tokio::test]
async fn overlapping_pass_updates_rows_in_place() {
    let pool = payments_mirror::db::connect_in_memory().await.unwrap();

    let first = harness_on(
        pool.clone(),
        MockProvider::new()
            .with_page(vec![json!({"id": 40})])
            .with_details(40, json!({"id": 40, "status": "pending", "transaction_amount": 99})),
    )
    .await;
    first.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    let second = harness_on(
        pool.clone(),
        MockProvider::new()
            .with_page(vec![json!({"id": 40})])
            .with_details(
                40,
                json!({"id": 40, "status": "approved", "transaction_amount": 99, "date_approved": "2024-01-02T00:03:00Z"}),
            ),
    )
    .await;
    second.orchestrator.run(incremental(), at(2024, 1, 2) + Duration::minutes(30)).await;

    // Second window starts 10 minutes before the first checkpoint.
    let q = &second.provider.search_requests()[0];
    assert_eq!(q.begin_date, "2024-01-01T23:50:00Z");

    assert_eq!(second.payments.count().await.unwrap(), 1);
    let row = second.payments.find_by_payment_id(40).await.unwrap().unwrap();
    assert_eq!(row.status.as_deref(), Some("approved"));
    assert_eq!(row.date_approved.as_deref(), Some("2024-01-02T00:03:00Z"));
}

#[tokio::test]
async fn duplicate_ids_in_one_pass_are_processed_once() {
    let h = harness(MockProvider::new().with_page(vec![json!({"id": 50}), json!({"id": 50})])).await;

    let report = h.orchestrator.run(incremental(), at(2024, 1, 2)).await;

    assert_eq!(report.found, 2);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.upserted, 1);
    assert_eq!(h.provider.detail_requests(), vec![50]);
}

#[tokio::test]
async fn checkpoint_never_moves_backwards() {
    let pool = payments_mirror::db::connect_in_memory().await.unwrap();
    let repo = SyncStateRepo { pool };

    assert!(repo.save_checkpoint(at(2024, 1, 5)).await.unwrap());
    assert!(!repo.save_checkpoint(at(2024, 1, 3)).await.unwrap());
    assert_eq!(repo.load_checkpoint().await.unwrap(), SyncCheckpoint::at(at(2024, 1, 5)));
    assert!(repo.save_checkpoint(at(2024, 1, 6)).await.unwrap());
    assert_eq!(repo.load_checkpoint().await.unwrap(), SyncCheckpoint::at(at(2024, 1, 6)));
}

#[tokio::test]
async fn checkpoint_comparison_uses_instants_not_text() {
    let pool = payments_mirror::db::connect_in_memory().await.unwrap();
    // 08:00Z written with an offset; sorts after "09:00:00Z" as text.
    sqlx::query("UPDATE sync_state SET last_synced_at = '2024-01-05T10:00:00+02:00' WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();
    let repo = SyncStateRepo { pool };

    let nine = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
    assert!(repo.save_checkpoint(nine).await.unwrap());
    assert_eq!(repo.load_checkpoint().await.unwrap(), SyncCheckpoint::at(nine));

    let seven = Utc.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap();
    assert!(!repo.save_checkpoint(seven).await.unwrap());
    assert!(!repo.save_checkpoint(nine).await.unwrap());
    assert_eq!(repo.load_checkpoint().await.unwrap(), SyncCheckpoint::at(nine));
}

#[tokio::test]
async fn successive_passes_keep_checkpoint_monotonic() {
    let pool = payments_mirror::db::connect_in_memory().await.unwrap();
    let mut last = SyncCheckpoint::never();
    for (i, now) in [at(2024, 1, 2), at(2024, 1, 3), at(2024, 1, 3) + Duration::hours(6)]
        .into_iter()
        .enumerate()
    {
        let h = harness_on(pool.clone(), MockProvider::new().with_page(vec![json!({"id": 60 + i as i64})])).await;
        let report = h.orchestrator.run(incremental(), now).await;
        assert_eq!(report.outcome, SyncOutcome::Completed);
        let current = h.sync_state.load_checkpoint().await.unwrap();
        assert!(current.last_synced_at >= last.last_synced_at);
        last = current;
    }
    assert_eq!(last, SyncCheckpoint::at(at(2024, 1, 3) + Duration::hours(6)));
}

#[tokio::test]
async fn full_resync_ignores_and_preserves_checkpoint() {
    let h = harness(MockProvider::new().with_page(vec![summary_555()])).await;
    h.sync_state.save_checkpoint(at(2024, 1, 9)).await.unwrap();

    let options = SyncOptions {
        days_back: 3,
        mode: SyncMode::FullResync {
            persist_checkpoint: false,
        },
    };
    let report = h.orchestrator.run(options, at(2024, 1, 10)).await;

    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert_eq!(report.window.unwrap().begin_iso(), "2024-01-07T00:00:00Z");
    assert!(!report.checkpoint_advanced);
    assert_eq!(
        h.sync_state.load_checkpoint().await.unwrap(),
        SyncCheckpoint::at(at(2024, 1, 9))
    );
    assert_eq!(h.payments.count().await.unwrap(), 1);
}

#[tokio::test]
async fn full_resync_can_advance_checkpoint_when_asked() {
    let h = harness(MockProvider::new()).await;

    let options = SyncOptions {
        days_back: 3,
        mode: SyncMode::FullResync {
            persist_checkpoint: true,
        },
    };
    let report = h.orchestrator.run(options, at(2024, 1, 10)).await;

    assert!(report.checkpoint_advanced);
    assert_eq!(
        h.sync_state.load_checkpoint().await.unwrap(),
        SyncCheckpoint::at(at(2024, 1, 10))
    );
}
