use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};
use ceac_core::{BatchEntry, BatchResult};

use super::{ApiError, AppState};
use crate::middleware::RequestId;

/// `POST /`: runs the batch and returns the bare `case_no -> result` map.
pub(super) async fn query_batch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<Vec<BatchEntry>>, JsonRejection>,
) -> Result<Json<BatchResult>, ApiError> {
    let Json(entries) = payload.map_err(|rejection| {
        tracing::warn!(request_id = %req_id.0, error = %rejection, "rejected batch body");
        ApiError::new(req_id.0.clone(), "bad_request", rejection.body_text())
    })?;

    if entries.len() > state.max_batch_size {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!(
                "batch of {} entries exceeds the limit of {}",
                entries.len(),
                state.max_batch_size
            ),
        ));
    }

    tracing::info!(request_id = %req_id.0, entries = entries.len(), "batch received");
    let results = state.dispatcher.run(entries).await.map_err(|e| {
        ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
    })?;
    Ok(Json(results))
}
