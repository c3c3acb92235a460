use crate::domain::checkpoint::format_utc;
use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

pub async fn sync_status(State(state): State<AppState>) -> impl IntoResponse {
    let checkpoint = match state.sync_state_repo.load_checkpoint().await {
        Ok(c) => c,
        Err(e) => {
            return (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    };
    let payments = state.payments_repo.count().await.ok();

    (
        axum::http::StatusCode::OK,
        Json(serde_json::json!({
            "last_synced_at": checkpoint.last_synced_at.map(format_utc),
            "never_synced": checkpoint.last_synced_at.is_none(),
            "payments": payments
        })),
    )
        .into_response()
}
