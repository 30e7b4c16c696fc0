//! Playlist resolution pipeline
//!
//! Orchestrates one request in three ordered phases:
//!
//! 1. **Chart loading** - resolve the requested week to concrete chart
//!    dates, fetch the needed snapshots concurrently (de-duplicated within
//!    the request), and extract the top-five candidates per usable snapshot.
//! 2. **Streak resolution** - one batched cache read, parallel computation
//!    of the misses over a shared request-scoped snapshot fetcher, one
//!    batched write-back.
//! 3. **Catalog resolution** - strictly sequential cache-aside track
//!    resolution with a fixed inter-call delay after live searches, emitting
//!    one `song` event per candidate as it resolves.
//!
//! A snapshot fetch failure skips its year; a catalog search failure
//! degrades that one candidate to not-found. Progress flows to the consumer
//! through an mpsc channel; a failed send means the consumer is gone and the
//! run stops.

use crate::cache::CacheLayer;
use crate::catalog::TrackResolver;
use crate::chart::{streaks, RequestSnapshotCache, SnapshotFetch};
use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use topfive_common::chart::{
    dates, CatalogTrack, ChartEntry, ChartRank, OriginalSong, StreakLookup, StreakSpan, ValidDates,
};
use topfive_common::events::PlaylistEvent;
use topfive_common::{Error, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One playlist candidate produced by phase 1.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub year: i32,
    pub chart_date: NaiveDate,
    pub rank: ChartRank,
}

impl Candidate {
    fn streak_lookup(&self) -> StreakLookup {
        StreakLookup {
            chart_date: self.chart_date,
            song: self.rank.song.clone(),
            artist: self.rank.artist.clone(),
        }
    }

    fn to_entry(
        &self,
        catalog_track: Option<CatalogTrack>,
        from_cache: bool,
        weeks_in_top5: StreakSpan,
    ) -> ChartEntry {
        ChartEntry {
            year: self.year,
            chart_date: self.chart_date,
            position: self.rank.this_week,
            original: OriginalSong {
                song: self.rank.song.clone(),
                artist: self.rank.artist.clone(),
            },
            catalog_track,
            from_cache,
            last_week_position: self.rank.last_week,
            position_change: dates::position_change(self.rank.this_week, self.rank.last_week),
            weeks_in_top5,
        }
    }
}

struct CandidateResolution {
    track: Option<CatalogTrack>,
    from_cache: bool,
    live_call: bool,
}

/// One playlist resolution run.
pub struct ResolutionPipeline {
    run_id: Uuid,
    valid_dates: Arc<ValidDates>,
    fetcher: RequestSnapshotCache,
    cache: Arc<CacheLayer>,
    resolver: Arc<dyn TrackResolver>,
    search_delay: Duration,
    streak_max_weeks: usize,
}

impl ResolutionPipeline {
    pub fn new(
        valid_dates: Arc<ValidDates>,
        snapshots: Arc<dyn SnapshotFetch>,
        cache: Arc<CacheLayer>,
        resolver: Arc<dyn TrackResolver>,
        search_delay: Duration,
        streak_max_weeks: usize,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            valid_dates,
            fetcher: RequestSnapshotCache::new(snapshots),
            cache,
            resolver,
            search_delay,
            streak_max_weeks,
        }
    }

    /// Phase 1: resolve dates, fetch snapshots, extract candidates.
    ///
    /// Candidates come out in chart-date resolution order (ascending year),
    /// then snapshot rank order within a date. An unavailable snapshot skips
    /// its year; it never fails the run.
    pub async fn load_candidates(
        &self,
        week: u32,
        start_year: i32,
        end_year: i32,
    ) -> Vec<Candidate> {
        let dates_by_year =
            dates::resolve_chart_dates(week, start_year, end_year, &self.valid_dates);
        info!(
            run_id = %self.run_id,
            week,
            start_year,
            end_year,
            resolved_years = dates_by_year.len(),
            "chart dates resolved"
        );

        // Warm all distinct dates concurrently; the request fetcher
        // de-duplicates, so each date costs at most one fetch.
        let distinct: BTreeSet<NaiveDate> = dates_by_year.values().copied().collect();
        join_all(distinct.iter().map(|date| self.fetcher.fetch(*date))).await;

        let mut candidates = Vec::new();
        for (year, chart_date) in dates_by_year {
            match self.fetcher.fetch(chart_date).await {
                Some(snapshot) => {
                    for rank in snapshot.top_entries() {
                        candidates.push(Candidate {
                            year,
                            chart_date,
                            rank: rank.clone(),
                        });
                    }
                }
                None => {
                    warn!(run_id = %self.run_id, year, %chart_date, "skipping year: no chart snapshot");
                }
            }
        }
        candidates
    }

    /// Phases 2 and 3, then the duplicate set and the terminal event.
    ///
    /// Consumes the pipeline: one run per request.
    pub async fn run(self, candidates: Vec<Candidate>, tx: mpsc::Sender<PlaylistEvent>) {
        let total = candidates.len();
        if !emit(&tx, PlaylistEvent::Init { total }).await {
            return;
        }

        match self.resolve_all(&candidates, &tx).await {
            Ok(Completed) => {}
            Ok(Disconnected) => {
                info!(run_id = %self.run_id, "stream consumer disconnected; run abandoned");
            }
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "pipeline failed mid-stream");
                let _ = emit(
                    &tx,
                    PlaylistEvent::Error {
                        message: e.to_string(),
                    },
                )
                .await;
            }
        }
    }

    async fn resolve_all(
        &self,
        candidates: &[Candidate],
        tx: &mpsc::Sender<PlaylistEvent>,
    ) -> Result<RunEnd> {
        let total = candidates.len();
        let streaks = self.resolve_streaks(candidates).await;

        // Phase 3: strictly sequential so the inter-call delay bounds the
        // live-call rate and events come out in candidate order.
        let mut cache_hits = 0usize;
        let mut api_calls = 0usize;
        let mut resolved_uris: Vec<String> = Vec::new();

        for (index, candidate) in candidates.iter().enumerate() {
            let resolution = self.resolve_candidate(candidate).await;
            if resolution.from_cache {
                cache_hits += 1;
            }
            if resolution.live_call {
                api_calls += 1;
            }
            if let Some(track) = &resolution.track {
                resolved_uris.push(track.uri.clone());
            }

            let lookup_key = candidate.streak_lookup().lookup_key();
            let span = streaks
                .get(&lookup_key)
                .copied()
                .flatten()
                .ok_or_else(|| Error::Internal(format!("no streak computed for {lookup_key}")))?;

            let entry = candidate.to_entry(resolution.track, resolution.from_cache, span);
            let event = PlaylistEvent::Song {
                entry,
                progress: index + 1,
                total,
            };
            if !emit(tx, event).await {
                return Ok(Disconnected);
            }

            // Respect the catalog's rate limits: a fixed pause after every
            // live search, none after cache hits.
            if resolution.live_call && index + 1 < total {
                tokio::time::sleep(self.search_delay).await;
            }
        }

        let duplicates = duplicate_uris(&resolved_uris);
        if !emit(tx, PlaylistEvent::Duplicates { ids: duplicates }).await {
            return Ok(Disconnected);
        }

        let found = resolved_uris.len();
        info!(
            run_id = %self.run_id,
            total,
            found,
            cache_hits,
            api_calls,
            "playlist resolution complete"
        );
        let complete = PlaylistEvent::Complete {
            total_songs: total,
            found_songs: found,
            not_found_count: total - found,
            cache_hits,
            api_calls,
        };
        if !emit(tx, complete).await {
            return Ok(Disconnected);
        }
        Ok(Completed)
    }

    /// Phase 2: batched cache read, parallel computation of the misses,
    /// batched write-back.
    async fn resolve_streaks(
        &self,
        candidates: &[Candidate],
    ) -> HashMap<String, Option<StreakSpan>> {
        let lookups: Vec<StreakLookup> = candidates.iter().map(Candidate::streak_lookup).collect();
        let mut spans = self.cache.get_streaks_batch(&lookups).await;

        let misses: Vec<&StreakLookup> = lookups
            .iter()
            .filter(|lookup| spans.get(&lookup.lookup_key()) == Some(&None))
            .collect();
        if misses.is_empty() {
            return spans;
        }

        debug!(run_id = %self.run_id, misses = misses.len(), "computing streaks for cache misses");
        let computed: Vec<(StreakLookup, StreakSpan)> =
            join_all(misses.into_iter().map(|lookup| async move {
                let span = streaks::top5_streak(
                    &lookup.song,
                    &lookup.artist,
                    lookup.chart_date,
                    &self.valid_dates,
                    self.streak_max_weeks,
                    &self.fetcher,
                )
                .await;
                (lookup.clone(), span)
            }))
            .await;

        self.cache.put_streaks_batch(&computed).await;
        for (lookup, span) in computed {
            spans.insert(lookup.lookup_key(), Some(span));
        }
        spans
    }

    /// Cache-aside resolution of one candidate: positive cache, negative
    /// cache, then a live search on a full miss. Both live outcomes are
    /// written through; an upstream failure degrades to not-found without
    /// poisoning the negative cache.
    async fn resolve_candidate(&self, candidate: &Candidate) -> CandidateResolution {
        let song = &candidate.rank.song;
        let artist = &candidate.rank.artist;

        if let Some(track) = self.cache.get_track(song, artist).await {
            return CandidateResolution {
                track: Some(track),
                from_cache: true,
                live_call: false,
            };
        }

        if self.cache.is_not_found(song, artist).await {
            return CandidateResolution {
                track: None,
                from_cache: true,
                live_call: false,
            };
        }

        match self.resolver.resolve(song, artist, Some(candidate.year)).await {
            Ok(Some(track)) => {
                self.cache.put_track(song, artist, &track).await;
                CandidateResolution {
                    track: Some(track),
                    from_cache: false,
                    live_call: true,
                }
            }
            Ok(None) => {
                self.cache.mark_not_found(song, artist).await;
                CandidateResolution {
                    track: None,
                    from_cache: false,
                    live_call: true,
                }
            }
            Err(e) => {
                warn!(
                    run_id = %self.run_id,
                    song,
                    artist,
                    error = %e,
                    "catalog search failed; treating candidate as not found"
                );
                CandidateResolution {
                    track: None,
                    from_cache: false,
                    live_call: true,
                }
            }
        }
    }
}

use RunEnd::{Completed, Disconnected};

enum RunEnd {
    Completed,
    Disconnected,
}

/// Send one event; `false` means the consumer is gone.
async fn emit(tx: &mpsc::Sender<PlaylistEvent>, event: PlaylistEvent) -> bool {
    tx.send(event).await.is_ok()
}

/// Catalog ids that resolved for more than one candidate, sorted for
/// deterministic output.
fn duplicate_uris(uris: &[String]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for uri in uris {
        *counts.entry(uri).or_insert(0) += 1;
    }

    let mut duplicates: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(uri, _)| uri.to_string())
        .collect();
    duplicates.sort();
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_uris_reports_each_id_once() {
        let uris = vec![
            "catalog:track:a".to_string(),
            "catalog:track:b".to_string(),
            "catalog:track:a".to_string(),
            "catalog:track:c".to_string(),
        ];
        assert_eq!(duplicate_uris(&uris), vec!["catalog:track:a".to_string()]);
    }

    #[test]
    fn duplicate_uris_empty_when_all_unique() {
        let uris = vec!["a".to_string(), "b".to_string()];
        assert!(duplicate_uris(&uris).is_empty());
    }
}
