//! Chart date arithmetic
//!
//! Maps (week, year-range) requests onto concrete snapshot dates and
//! produces the neighbor-date sequences the streak walks run over. All
//! functions are pure; [`ValidDates`] is the only source of truth.

use super::{PositionChange, ValidDates, YearRange};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// Resolve the nominal week number to a concrete chart date for every year
/// in `start_year..=end_year`.
///
/// The nominal date for (week, year) is January 1 of that year plus
/// `(week - 1) * 7` days; among the valid dates of the same calendar year
/// the one closest to the nominal date wins, ties breaking toward the
/// earlier date. Years with no valid date are absent from the result.
pub fn resolve_chart_dates(
    week: u32,
    start_year: i32,
    end_year: i32,
    valid_dates: &ValidDates,
) -> BTreeMap<i32, NaiveDate> {
    let mut resolved = BTreeMap::new();

    for year in start_year..=end_year {
        let Some(jan_first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
            continue;
        };
        let nominal = jan_first + Duration::weeks(i64::from(week.saturating_sub(1)));

        let best = valid_dates
            .as_slice()
            .iter()
            .filter(|d| d.year() == year)
            .min_by_key(|d| ((**d - nominal).num_days().abs(), **d));

        if let Some(date) = best {
            resolved.insert(year, *date);
        }
    }

    resolved
}

/// Dates strictly preceding `date`, nearest-first.
///
/// Empty when `date` is the earliest known date or is not itself a known
/// chart date. `max_count` bounds the walk when given.
pub fn previous_dates(
    date: NaiveDate,
    valid_dates: &ValidDates,
    max_count: Option<usize>,
) -> Vec<NaiveDate> {
    let Some(index) = valid_dates.index_of(date) else {
        return Vec::new();
    };

    let mut dates: Vec<NaiveDate> = valid_dates.as_slice()[..index].iter().rev().copied().collect();
    if let Some(max) = max_count {
        dates.truncate(max);
    }
    dates
}

/// Dates strictly following `date`, ascending, restricted to the same
/// calendar year.
///
/// Empty when `date` is the last known date of its year, the last date
/// overall, or not itself a known chart date.
pub fn same_year_future_dates(date: NaiveDate, valid_dates: &ValidDates) -> Vec<NaiveDate> {
    let Some(index) = valid_dates.index_of(date) else {
        return Vec::new();
    };

    valid_dates.as_slice()[index + 1..]
        .iter()
        .take_while(|d| d.year() == date.year())
        .copied()
        .collect()
}

/// Classify week-over-week movement. Lower numeric rank is a higher chart
/// position, so `this_week < last_week` means the song moved up.
pub fn position_change(this_week: u32, last_week: Option<u32>) -> PositionChange {
    match last_week {
        None => PositionChange::New,
        Some(last) if this_week < last => PositionChange::Up,
        Some(last) if this_week > last => PositionChange::Down,
        Some(_) => PositionChange::Same,
    }
}

/// Inclusive year span covered by the known chart history.
pub fn year_range(valid_dates: &ValidDates) -> Option<YearRange> {
    let slice = valid_dates.as_slice();
    Some(YearRange {
        min: slice.first()?.year(),
        max: slice.last()?.year(),
    })
}

/// Suggested default week for new requests: the next upcoming chart week,
/// wrapped into 1..=52.
pub fn next_week_number(today: NaiveDate) -> u32 {
    let current = (today.ordinal0() / 7 + 1).min(52);
    current % 52 + 1
}
