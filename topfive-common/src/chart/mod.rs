//! Chart domain model
//!
//! Types describing weekly chart snapshots and the playlist entries resolved
//! from them. Snapshots are immutable historical data; once fetched they are
//! shared as `Arc<ChartSnapshot>` and never mutated.

pub mod dates;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of leading chart positions this service consumes.
pub const TOP_COUNT: usize = 5;

/// One ranked entry of a weekly chart snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartRank {
    pub song: String,
    pub artist: String,
    /// Rank this week; 1 is the highest chart position.
    pub this_week: u32,
    /// Rank the previous week; `None` marks a new entry.
    pub last_week: Option<u32>,
    pub peak_position: u32,
    pub weeks_on_chart: u32,
}

/// Immutable weekly chart snapshot as published by the chart archive.
///
/// The wire document is `{ "date": "YYYY-MM-DD", "data": [...] }`; only the
/// first [`TOP_COUNT`] entries of `data` are consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSnapshot {
    pub date: NaiveDate,
    pub data: Vec<ChartRank>,
}

impl ChartSnapshot {
    /// The leading entries in source rank order.
    pub fn top_entries(&self) -> &[ChartRank] {
        &self.data[..self.data.len().min(TOP_COUNT)]
    }

    /// Case-insensitive exact match on song and artist within the top entries.
    pub fn contains_in_top(&self, song: &str, artist: &str) -> bool {
        let song = song.to_lowercase();
        let artist = artist.to_lowercase();
        self.top_entries()
            .iter()
            .any(|r| r.song.to_lowercase() == song && r.artist.to_lowercase() == artist)
    }
}

/// A track resolved in the external music catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub uri: String,
    pub name: String,
    /// Joined display string, e.g. "Artist A, Artist B".
    pub artists: String,
    pub album: String,
    pub image: String,
}

/// Week-over-week movement of a chart entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionChange {
    Up,
    Down,
    Same,
    New,
}

/// Consecutive top-five presence around a reference week.
///
/// `before` includes the reference week itself and is therefore always at
/// least 1. `after` never crosses a calendar-year boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSpan {
    pub before: u32,
    pub after: u32,
}

/// The song/artist pair as printed on the chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalSong {
    pub song: String,
    pub artist: String,
}

/// A resolved playlist candidate, unique per (chart date, song, artist).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartEntry {
    pub year: i32,
    pub chart_date: NaiveDate,
    pub position: u32,
    pub original: OriginalSong,
    pub catalog_track: Option<CatalogTrack>,
    pub from_cache: bool,
    pub last_week_position: Option<u32>,
    pub position_change: PositionChange,
    pub weeks_in_top5: StreakSpan,
}

/// Identifies one streak computation: a song on a concrete chart date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakLookup {
    pub chart_date: NaiveDate,
    pub song: String,
    pub artist: String,
}

impl StreakLookup {
    /// The key callers use to correlate batch results, in the raw
    /// `date:song:artist` form of the streaks API.
    pub fn lookup_key(&self) -> String {
        format!("{}:{}:{}", self.chart_date, self.song, self.artist)
    }
}

/// Inclusive year span covered by the known chart history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

/// Ordered list of dates for which chart snapshots exist.
///
/// The sole source of truth for previous/next date arithmetic; see
/// [`dates`] for the walks built on top of it.
#[derive(Debug, Clone)]
pub struct ValidDates(Vec<NaiveDate>);

impl ValidDates {
    /// Build from an arbitrary list; dates are sorted and deduplicated.
    pub fn new(mut dates: Vec<NaiveDate>) -> Self {
        dates.sort();
        dates.dedup();
        Self(dates)
    }

    pub fn as_slice(&self) -> &[NaiveDate] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of `date` in the chronological order, if known.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.0.binary_search(&date).ok()
    }
}

impl From<Vec<NaiveDate>> for ValidDates {
    fn from(dates: Vec<NaiveDate>) -> Self {
        Self::new(dates)
    }
}
