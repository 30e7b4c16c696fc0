//! /api/streaks - batched streak lookup, computation, and cache flush

use crate::chart::{streaks, RequestSnapshotCache};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use topfive_common::chart::{StreakLookup, StreakSpan};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct StreaksQuery {
    songs: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComputeStreaksRequest {
    songs: Vec<StreakLookup>,
}

/// GET /api/streaks?songs=[...] - cached streaks only; misses are simply
/// absent from the response.
pub async fn cached_streaks(
    State(state): State<AppState>,
    Query(query): Query<StreaksQuery>,
) -> ApiResult<Json<HashMap<String, StreakSpan>>> {
    let raw = query
        .songs
        .ok_or_else(|| ApiError::BadRequest("Missing songs parameter".to_string()))?;

    let parsed: Value = serde_json::from_str(&raw)
        .map_err(|_| ApiError::BadRequest("Invalid JSON in songs parameter".to_string()))?;
    if !parsed.is_array() {
        return Err(ApiError::BadRequest("songs must be an array".to_string()));
    }
    let lookups: Vec<StreakLookup> = serde_json::from_value(parsed)
        .map_err(|e| ApiError::BadRequest(format!("malformed songs entry: {e}")))?;

    let cached = state.cache.get_streaks_batch(&lookups).await;
    let found: HashMap<String, StreakSpan> = cached
        .into_iter()
        .filter_map(|(key, span)| span.map(|span| (key, span)))
        .collect();

    Ok(Json(found))
}

/// POST /api/streaks - compute streaks for a batch of songs.
///
/// All walks share one request-scoped snapshot fetcher, so songs from the
/// same chart date share neighbor fetches; results are written back to the
/// cache in one batch.
pub async fn compute_streaks(
    State(state): State<AppState>,
    Json(request): Json<ComputeStreaksRequest>,
) -> ApiResult<Json<HashMap<String, StreakSpan>>> {
    if request.songs.is_empty() {
        return Err(ApiError::BadRequest("Missing or empty songs array".to_string()));
    }

    let fetcher = RequestSnapshotCache::new(Arc::clone(&state.snapshots));
    let computed: Vec<(StreakLookup, StreakSpan)> =
        join_all(request.songs.into_iter().map(|lookup| {
            let fetcher = &fetcher;
            let valid_dates = &state.valid_dates;
            let max_weeks = state.config.streak_max_weeks;
            async move {
                let span = streaks::top5_streak(
                    &lookup.song,
                    &lookup.artist,
                    lookup.chart_date,
                    valid_dates,
                    max_weeks,
                    fetcher,
                )
                .await;
                (lookup, span)
            }
        }))
        .await;

    state.cache.put_streaks_batch(&computed).await;
    info!(count = computed.len(), "streak batch computed");

    let response = computed
        .into_iter()
        .map(|(lookup, span)| (lookup.lookup_key(), span))
        .collect();
    Ok(Json(response))
}

/// DELETE /api/streaks - drop every cached streak record.
pub async fn flush_streaks(State(state): State<AppState>) -> Json<Value> {
    match state.cache.flush_streaks().await {
        None => Json(json!({
            "success": false,
            "message": "cache store not configured",
        })),
        Some(deleted) => {
            info!(deleted, "streak cache flushed");
            Json(json!({
                "success": true,
                "deleted": deleted,
            }))
        }
    }
}
