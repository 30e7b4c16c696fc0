//! Top-five streak computation
//!
//! Walks neighboring chart snapshots around a reference date and counts how
//! many consecutive weeks a song stayed in the top five. Fetch failures are
//! ordinary misses: the walk stops and the count so far is returned, so a
//! flaky archive can shorten a streak but never fail a request.

use crate::chart::SnapshotFetch;
use chrono::NaiveDate;
use topfive_common::chart::{dates, StreakSpan, ValidDates};
use tracing::debug;

/// Count consecutive top-five weeks around `reference`.
///
/// `before` includes the reference week itself and walks earlier snapshots
/// nearest-first, bounded by `max_weeks`. `after` walks later snapshots in
/// ascending order and stops at the calendar-year boundary, which is
/// enforced by the date walk itself.
pub async fn top5_streak(
    song: &str,
    artist: &str,
    reference: NaiveDate,
    valid_dates: &ValidDates,
    max_weeks: usize,
    fetcher: &dyn SnapshotFetch,
) -> StreakSpan {
    // The reference week counts as 1.
    let mut before = 1u32;
    for date in dates::previous_dates(reference, valid_dates, Some(max_weeks)) {
        match fetcher.fetch(date).await {
            Some(snapshot) if snapshot.contains_in_top(song, artist) => before += 1,
            _ => break,
        }
    }

    let mut after = 0u32;
    for date in dates::same_year_future_dates(reference, valid_dates) {
        match fetcher.fetch(date).await {
            Some(snapshot) if snapshot.contains_in_top(song, artist) => after += 1,
            _ => break,
        }
    }

    debug!(song, artist, %reference, before, after, "streak computed");
    StreakSpan { before, after }
}
