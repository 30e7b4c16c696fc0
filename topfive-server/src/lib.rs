//! topfive-server library interface
//!
//! Turns a historical chart week number into a cross-year top-five playlist:
//! chart-date resolution, streak computation, cache-aside catalog track
//! resolution, and incremental SSE progress streaming.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod chart;
pub mod error;
pub mod pipeline;

pub use crate::error::{ApiError, ApiResult};

use crate::cache::CacheLayer;
use crate::catalog::TrackResolver;
use crate::chart::SnapshotFetch;
use crate::pipeline::ResolutionPipeline;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use topfive_common::chart::ValidDates;
use topfive_common::config::ServerConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Known chart history; loaded once at startup.
    pub valid_dates: Arc<ValidDates>,
    /// Process-wide snapshot source (memory cache + disk + HTTP fallback).
    pub snapshots: Arc<dyn SnapshotFetch>,
    pub cache: Arc<CacheLayer>,
    pub resolver: Arc<dyn TrackResolver>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Arc<ServerConfig>,
        valid_dates: Arc<ValidDates>,
        snapshots: Arc<dyn SnapshotFetch>,
        cache: Arc<CacheLayer>,
        resolver: Arc<dyn TrackResolver>,
    ) -> Self {
        Self {
            config,
            valid_dates,
            snapshots,
            cache,
            resolver,
            startup_time: Utc::now(),
        }
    }

    /// A fresh pipeline for one request, with its own request-scoped
    /// snapshot fetcher.
    pub fn pipeline(&self) -> ResolutionPipeline {
        ResolutionPipeline::new(
            Arc::clone(&self.valid_dates),
            Arc::clone(&self.snapshots),
            Arc::clone(&self.cache),
            Arc::clone(&self.resolver),
            Duration::from_millis(self.config.catalog.search_delay_ms),
            self.config.streak_max_weeks,
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/api/playlist", post(api::playlist::generate_playlist))
        .route(
            "/api/streaks",
            get(api::streaks::cached_streaks)
                .post(api::streaks::compute_streaks)
                .delete(api::streaks::flush_streaks),
        )
        .route("/api/meta", get(api::meta::meta))
        .route("/health", get(api::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
