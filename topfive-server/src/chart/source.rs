//! Chart snapshot source
//!
//! Loads immutable weekly chart snapshots by date: the configured chart
//! directory is tried first, then the HTTP archive when one is configured.
//! Loaded snapshots are kept in a process-wide in-memory cache; chart
//! history never changes, so an entry is valid for the life of the process.
//!
//! Fetch failures are reported as `None`, never as errors; callers treat a
//! missing snapshot as "skip this date".

use async_trait::async_trait;
use chrono::NaiveDate;
use moka::future::Cache;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use topfive_common::chart::{ChartSnapshot, ValidDates};
use topfive_common::{Error, Result};
use tracing::{debug, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on cached snapshots; sized for a century of weekly charts.
const SNAPSHOT_CACHE_CAPACITY: u64 = 8192;

/// Anything that can produce a chart snapshot for a date.
///
/// The streak calculator and the pipeline depend on this seam rather than on
/// a concrete source, so tests inject fixture-backed fetchers.
#[async_trait]
pub trait SnapshotFetch: Send + Sync {
    /// Fetch the snapshot for `date`; `None` on failure or missing data.
    async fn fetch(&self, date: NaiveDate) -> Option<Arc<ChartSnapshot>>;
}

/// Process-wide snapshot source: disk first, HTTP fallback, memory cache.
pub struct ChartSnapshotSource {
    chart_dir: PathBuf,
    base_url: Option<String>,
    http: reqwest::Client,
    memory: Cache<NaiveDate, Arc<ChartSnapshot>>,
}

impl ChartSnapshotSource {
    pub fn new(chart_dir: PathBuf, base_url: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("topfive/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client construction cannot fail with static options");

        Self {
            chart_dir,
            base_url,
            http,
            memory: Cache::new(SNAPSHOT_CACHE_CAPACITY),
        }
    }

    /// Load the snapshot for `date`, consulting the memory cache first.
    pub async fn load(&self, date: NaiveDate) -> Option<Arc<ChartSnapshot>> {
        if let Some(snapshot) = self.memory.get(&date).await {
            return Some(snapshot);
        }

        let snapshot = match self.read_from_disk(date).await {
            Some(snapshot) => Some(snapshot),
            None => self.fetch_over_http(date).await,
        }?;

        let snapshot = Arc::new(snapshot);
        self.memory.insert(date, Arc::clone(&snapshot)).await;
        Some(snapshot)
    }

    async fn read_from_disk(&self, date: NaiveDate) -> Option<ChartSnapshot> {
        let path = self.chart_dir.join("date").join(format!("{date}.json"));
        let contents = tokio::fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str(&contents) {
            Ok(snapshot) => {
                debug!(%date, path = %path.display(), "chart snapshot read from disk");
                Some(snapshot)
            }
            Err(e) => {
                warn!(%date, path = %path.display(), error = %e, "malformed chart document on disk");
                None
            }
        }
    }

    async fn fetch_over_http(&self, date: NaiveDate) -> Option<ChartSnapshot> {
        let base = self.base_url.as_deref()?;
        let url = format!("{}/date/{date}.json", base.trim_end_matches('/'));

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%date, error = %e, "chart archive fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(%date, status = %response.status(), "chart archive has no document for date");
            return None;
        }

        match response.json().await {
            Ok(snapshot) => {
                debug!(%date, "chart snapshot fetched from archive");
                Some(snapshot)
            }
            Err(e) => {
                warn!(%date, error = %e, "malformed chart document from archive");
                None
            }
        }
    }

    /// Read `valid_dates.json` from the chart directory at startup.
    pub fn load_valid_dates(chart_dir: &Path) -> Result<ValidDates> {
        let path = chart_dir.join("valid_dates.json");
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let dates: Vec<NaiveDate> = serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))?;

        if dates.is_empty() {
            return Err(Error::Config(format!("{} lists no dates", path.display())));
        }
        Ok(ValidDates::new(dates))
    }
}

#[async_trait]
impl SnapshotFetch for ChartSnapshotSource {
    async fn fetch(&self, date: NaiveDate) -> Option<Arc<ChartSnapshot>> {
        self.load(date).await
    }
}

/// Request-scoped memoizing fetcher with in-flight de-duplication.
///
/// Concurrent calls for the same date share one underlying fetch, and the
/// outcome (including a failed fetch) is memoized for the rest of the
/// request. The long-lived source beneath it only ever caches successes.
pub struct RequestSnapshotCache {
    inner: Arc<dyn SnapshotFetch>,
    slots: Mutex<HashMap<NaiveDate, Arc<OnceCell<Option<Arc<ChartSnapshot>>>>>>,
}

impl RequestSnapshotCache {
    pub fn new(inner: Arc<dyn SnapshotFetch>) -> Self {
        Self {
            inner,
            slots: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SnapshotFetch for RequestSnapshotCache {
    async fn fetch(&self, date: NaiveDate) -> Option<Arc<ChartSnapshot>> {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(date).or_default())
        };

        slot.get_or_init(|| self.inner.fetch(date)).await.clone()
    }
}
