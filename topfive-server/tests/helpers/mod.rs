//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use topfive_common::chart::{CatalogTrack, ChartRank, ChartSnapshot, ValidDates};
use topfive_common::{Error, Result};
use topfive_server::catalog::TrackResolver;
use topfive_server::chart::SnapshotFetch;

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// A chart snapshot whose entries rank in the order given.
pub fn chart(chart_date: &str, entries: &[(&str, &str)]) -> ChartSnapshot {
    ChartSnapshot {
        date: date(chart_date),
        data: entries
            .iter()
            .enumerate()
            .map(|(i, (song, artist))| ChartRank {
                song: song.to_string(),
                artist: artist.to_string(),
                this_week: i as u32 + 1,
                last_week: None,
                peak_position: i as u32 + 1,
                weeks_on_chart: 1,
            })
            .collect(),
    }
}

pub fn track(uri: &str) -> CatalogTrack {
    CatalogTrack {
        uri: uri.to_string(),
        name: uri.rsplit(':').next().unwrap_or(uri).to_string(),
        artists: "Test Artist".to_string(),
        album: "Test Album".to_string(),
        image: String::new(),
    }
}

/// Fixture-backed snapshot fetcher with a fetch counter.
pub struct MockSnapshots {
    charts: HashMap<NaiveDate, Arc<ChartSnapshot>>,
    fetches: AtomicUsize,
}

impl MockSnapshots {
    pub fn new(charts: Vec<ChartSnapshot>) -> Self {
        Self {
            charts: charts
                .into_iter()
                .map(|c| (c.date, Arc::new(c)))
                .collect(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotFetch for MockSnapshots {
    async fn fetch(&self, date: NaiveDate) -> Option<Arc<ChartSnapshot>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.charts.get(&date).cloned()
    }
}

/// Track resolver stub: songs map to fixed uris, may be absent, or may fail
/// as if the upstream were down.
pub struct StubResolver {
    tracks: HashMap<String, CatalogTrack>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl StubResolver {
    pub fn new() -> Self {
        Self {
            tracks: HashMap::new(),
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// `song` resolves to a track with `uri`.
    pub fn with_track(mut self, song: &str, uri: &str) -> Self {
        self.tracks.insert(song.to_lowercase(), track(uri));
        self
    }

    /// `song` makes the live search fail.
    pub fn with_failure(mut self, song: &str) -> Self {
        self.failing.insert(song.to_lowercase());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackResolver for StubResolver {
    async fn warm_up(&self) -> Result<()> {
        Ok(())
    }

    async fn resolve(
        &self,
        song: &str,
        _artist: &str,
        _year: Option<i32>,
    ) -> Result<Option<CatalogTrack>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = song.to_lowercase();
        if self.failing.contains(&key) {
            return Err(Error::Http("search request failed".to_string()));
        }
        Ok(self.tracks.get(&key).cloned())
    }
}

/// The five January 2024 chart dates used across streak scenarios.
pub fn january_2024() -> ValidDates {
    ValidDates::new(vec![
        date("2024-01-01"),
        date("2024-01-08"),
        date("2024-01-15"),
        date("2024-01-22"),
        date("2024-01-29"),
    ])
}
