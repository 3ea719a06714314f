//! Bank-slip batch reconciliation handler

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use domain_settlement::BatchSummary;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

/// Processes an uploaded bank settlement file
///
/// The body is the raw file; every record is classified independently, so
/// the response is always 200 with per-record results.
pub async fn reconcile_slips(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BatchSummary>, ApiError> {
    let summary = state.reconciler.process(&body).await;

    info!(
        good = summary.good,
        late = summary.late,
        bad = summary.bad,
        unknown = summary.unknown,
        "settlement batch processed"
    );

    Ok(Json(summary))
}
