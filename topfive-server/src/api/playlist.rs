//! POST /api/playlist - playlist resolution with SSE progress streaming
//!
//! Validation failures and a zero-candidate outcome are rejected before any
//! stream is opened; once streaming, the only failure signal is a terminal
//! `error` event.

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the pipeline-to-stream event channel. Events are consumed as
/// they arrive; the buffer only smooths bursts of cache hits.
const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRequest {
    pub week: u32,
    /// Inclusive `[startYear, endYear]` span.
    pub year_range: [i32; 2],
}

/// POST /api/playlist - resolve a week across a year range, streaming
/// progress events as each candidate resolves.
pub async fn generate_playlist(
    State(state): State<AppState>,
    request: Result<Json<PlaylistRequest>, JsonRejection>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let Json(request) = request.map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let [start_year, end_year] = request.year_range;

    if request.week == 0 || request.week > 53 {
        return Err(ApiError::BadRequest(format!(
            "week must be between 1 and 53, got {}",
            request.week
        )));
    }
    if start_year > end_year {
        return Err(ApiError::BadRequest(format!(
            "invalid year range {start_year}..{end_year}"
        )));
    }

    // An unreachable catalog is reported as an immediate error response, not
    // discovered candidate-by-candidate mid-stream.
    state
        .resolver
        .warm_up()
        .await
        .map_err(|e| ApiError::Upstream(format!("catalog token unavailable: {e}")))?;

    let pipeline = state.pipeline();
    let candidates = pipeline
        .load_candidates(request.week, start_year, end_year)
        .await;
    if candidates.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no chart data available for week {} in {start_year}..{end_year}",
            request.week
        )));
    }

    info!(
        week = request.week,
        start_year,
        end_year,
        candidates = candidates.len(),
        "playlist resolution started"
    );

    let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(pipeline.run(candidates, tx));

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            match serde_json::to_string(&event) {
                Ok(json) => {
                    yield Ok(Event::default().event(event.event_type()).data(json));
                }
                Err(e) => {
                    warn!(error = %e, "failed to serialize playlist event");
                }
            }
            if terminal {
                debug!("terminal event sent, closing stream");
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}
