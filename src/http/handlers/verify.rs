use crate::domain::verification::{is_valid_operation_number, VerifyResponse};
use crate::AppState;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub op: Option<String>,
}

pub async fn health() -> impl IntoResponse {
    (axum::http::StatusCode::OK, Json(serde_json::json!({"ok": true})))
}

pub async fn verify(State(state): State<AppState>, Query(params): Query<VerifyParams>) -> impl IntoResponse {
    let op = params.op.unwrap_or_default();
    let op = op.trim();
    if !is_valid_operation_number(op) {
        return (
            axum::http::StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": {
                    "code": "INVALID_OPERATION_NUMBER",
                    "message": "op must be 6 to 24 digits"
                }
            })),
        )
            .into_response();
    }

    match state.payments_repo.find_by_operation_number(op).await {
        Ok(Some(record)) => (
            axum::http::StatusCode::OK,
            Json(VerifyResponse::from_record(&record, state.mask_payer_name)),
        )
            .into_response(),
        Ok(None) => (axum::http::StatusCode::OK, Json(VerifyResponse::not_found())).into_response(),
        Err(e) => {
            tracing::error!("verification lookup for {} failed: {}", op, e);
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": {"code": "DB_ERROR", "message": e.to_string()}})),
            )
                .into_response()
        }
    }
}
