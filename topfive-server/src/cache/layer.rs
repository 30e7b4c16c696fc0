//! Cache-aside layer for resolved tracks and computed streaks
//!
//! Keys live in a version-tagged namespace so a schema change invalidates
//! old entries without an explicit migration. Resolved tracks are cached for
//! 90 days; "not found" markers for 7 days only, because catalogs gain
//! content over time; streaks have no TTL at all, chart history being
//! immutable.
//!
//! Every operation degrades to a transparent miss when no backing store is
//! configured or when the store errors; the cache is never allowed to fail
//! a request.

use crate::cache::store::CacheStore;
use crate::catalog::matcher::normalize;
use std::collections::HashMap;
use std::time::Duration;
use topfive_common::chart::{CatalogTrack, StreakLookup, StreakSpan};
use tracing::warn;

/// Bump to invalidate every cached record after a schema change.
const CACHE_SCHEMA_VERSION: &str = "v1";

const KEY_SEPARATOR: &str = ":::";
const NOT_FOUND_SUFFIX: &str = ":notfound";

const TRACK_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 90);
const NOT_FOUND_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Cache-aside store for catalog tracks and streaks.
pub struct CacheLayer {
    store: Option<CacheStore>,
}

impl CacheLayer {
    pub fn new(store: Option<CacheStore>) -> Self {
        if store.is_none() {
            warn!("no cache store configured - caching disabled, every lookup will miss");
        }
        Self { store }
    }

    /// A layer with no backing store; every operation is a no-op or miss.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Cache key for a resolved track, invariant under case and punctuation
    /// changes in either field.
    pub fn track_key(song: &str, artist: &str) -> String {
        format!(
            "{CACHE_SCHEMA_VERSION}:track:{}{KEY_SEPARATOR}{}",
            normalize(song),
            normalize(artist)
        )
    }

    fn streak_key(lookup: &StreakLookup) -> String {
        format!(
            "{CACHE_SCHEMA_VERSION}:streak:{}:{}{KEY_SEPARATOR}{}",
            lookup.chart_date,
            normalize(&lookup.song),
            normalize(&lookup.artist)
        )
    }

    pub async fn get_track(&self, song: &str, artist: &str) -> Option<CatalogTrack> {
        let store = self.store.as_ref()?;
        let value = store
            .get(&Self::track_key(song, artist))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "cache get failed");
                None
            })?;

        serde_json::from_str(&value).ok()
    }

    pub async fn put_track(&self, song: &str, artist: &str, track: &CatalogTrack) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let Ok(value) = serde_json::to_string(track) else {
            return;
        };
        if let Err(e) = store
            .put(&Self::track_key(song, artist), &value, Some(TRACK_TTL))
            .await
        {
            warn!(error = %e, "cache put failed");
        }
    }

    /// Record that a search returned zero candidates, so the next request
    /// skips the live call.
    pub async fn mark_not_found(&self, song: &str, artist: &str) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let key = format!("{}{NOT_FOUND_SUFFIX}", Self::track_key(song, artist));
        if let Err(e) = store.put(&key, "1", Some(NOT_FOUND_TTL)).await {
            warn!(error = %e, "cache put failed");
        }
    }

    pub async fn is_not_found(&self, song: &str, artist: &str) -> bool {
        let Some(store) = self.store.as_ref() else {
            return false;
        };
        let key = format!("{}{NOT_FOUND_SUFFIX}", Self::track_key(song, artist));
        match store.get(&key).await {
            Ok(value) => value.is_some(),
            Err(e) => {
                warn!(error = %e, "cache get failed");
                false
            }
        }
    }

    /// Batched streak read. The result maps every lookup's raw key to its
    /// cached span, `None` marking the misses that need computation.
    pub async fn get_streaks_batch(
        &self,
        lookups: &[StreakLookup],
    ) -> HashMap<String, Option<StreakSpan>> {
        let mut result: HashMap<String, Option<StreakSpan>> = lookups
            .iter()
            .map(|lookup| (lookup.lookup_key(), None))
            .collect();

        let Some(store) = self.store.as_ref() else {
            return result;
        };

        let keys: Vec<String> = lookups.iter().map(Self::streak_key).collect();
        let rows = match store.get_many(&keys).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "batched cache get failed");
                return result;
            }
        };

        for lookup in lookups {
            if let Some(value) = rows.get(&Self::streak_key(lookup)) {
                if let Ok(span) = serde_json::from_str(value) {
                    result.insert(lookup.lookup_key(), Some(span));
                }
            }
        }
        result
    }

    /// Batched streak write-back; streaks never expire.
    pub async fn put_streaks_batch(&self, entries: &[(StreakLookup, StreakSpan)]) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        let rows: Vec<(String, String, Option<Duration>)> = entries
            .iter()
            .filter_map(|(lookup, span)| {
                let value = serde_json::to_string(span).ok()?;
                Some((Self::streak_key(lookup), value, None))
            })
            .collect();

        if let Err(e) = store.put_many(&rows).await {
            warn!(error = %e, "batched cache put failed");
        }
    }

    /// Drop every cached streak; `None` when no store is configured.
    pub async fn flush_streaks(&self) -> Option<u64> {
        let store = self.store.as_ref()?;
        match store.delete_like("%:streak:%").await {
            Ok(deleted) => Some(deleted),
            Err(e) => {
                warn!(error = %e, "streak cache flush failed");
                Some(0)
            }
        }
    }
}
