//! GET /api/meta - chart history span and suggested default week

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use topfive_common::chart::{dates, YearRange};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaResponse {
    pub year_range: YearRange,
    pub default_week: u32,
}

pub async fn meta(State(state): State<AppState>) -> ApiResult<Json<MetaResponse>> {
    let year_range = dates::year_range(&state.valid_dates)
        .ok_or_else(|| ApiError::Internal("no chart history loaded".to_string()))?;

    Ok(Json(MetaResponse {
        year_range,
        default_week: dates::next_week_number(Utc::now().date_naive()),
    }))
}
