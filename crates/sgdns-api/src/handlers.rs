use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use sgdns_domain::LifecycleEvent;
use sgdns_pipeline::{reconcile, LifecycleOutcome, ReconcileRequest};

use crate::error::ApiError;
use crate::state::AppState;

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn ready(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    // a KV round trip proves the repository is reachable
    state.kv.get("readiness-probe").await?;
    Ok(StatusCode::OK)
}

// ── Lifecycle events ──────────────────────────────────────────────────────────

pub async fn post_event(
    State(state): State<AppState>,
    Json(event): Json<LifecycleEvent>,
) -> Result<(StatusCode, Json<LifecycleOutcome>), ApiError> {
    event.validate().map_err(|e| ApiError::bad_request(e.to_string()))?;
    info!(event = %event, "received lifecycle event");
    let outcome = state.pipeline.handle(event).await;
    let status = StatusCode::from_u16(outcome.status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((status, Json(outcome)))
}

// ── Reconciliation ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ReconcileBody {
    #[serde(default)]
    pub scaling_group_name: Option<String>,
}

pub async fn post_reconcile(
    State(state): State<AppState>,
    body: Option<Json<ReconcileBody>>,
) -> Result<Json<Value>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let report = reconcile(
        ReconcileRequest { scaling_group_name: body.scaling_group_name },
        state.pipeline.clone(),
        state.config_service.clone(),
        state.reconcile_max_concurrency,
    )
    .await?;
    Ok(Json(json!(report)))
}
