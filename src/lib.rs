pub mod config;
pub mod db;
pub mod domain {
    pub mod checkpoint;
    pub mod payment;
    pub mod verification;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod ops;
        pub mod sync_status;
        pub mod verify;
    }
}
pub mod repo {
    pub mod payments_repo;
    pub mod sync_state_repo;
}
pub mod service {
    pub mod checkpoint_manager;
    pub mod identity_resolver;
    pub mod payment_fetcher;
    pub mod reconciler;
    pub mod sync_orchestrator;
}

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::SqlitePool,
    pub payments_repo: repo::payments_repo::PaymentsRepo,
    pub sync_state_repo: repo::sync_state_repo::SyncStateRepo,
    pub mask_payer_name: bool,
}

impl AppState {
    pub fn new(pool: sqlx::SqlitePool, mask_payer_name: bool) -> Self {
        Self {
            payments_repo: repo::payments_repo::PaymentsRepo { pool: pool.clone() },
            sync_state_repo: repo::sync_state_repo::SyncStateRepo { pool: pool.clone() },
            pool,
            mask_payer_name,
        }
    }
}

pub fn router(state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(http::handlers::verify::health))
        .route("/verify", get(http::handlers::verify::verify))
        .route("/sync/status", get(http::handlers::sync_status::sync_status))
        .route("/ops/readiness", get(http::handlers::ops::readiness))
        .route("/ops/liveness", get(http::handlers::ops::liveness))
        .with_state(state)
}
