//! Cache store and cache layer behavior

mod helpers;

use helpers::{date, track};
use std::time::Duration;
use topfive_common::chart::{StreakLookup, StreakSpan};
use topfive_server::cache::{CacheLayer, CacheStore};

fn lookup(chart_date: &str, song: &str, artist: &str) -> StreakLookup {
    StreakLookup {
        chart_date: date(chart_date),
        song: song.to_string(),
        artist: artist.to_string(),
    }
}

async fn memory_layer() -> CacheLayer {
    CacheLayer::new(Some(CacheStore::open_in_memory().await.unwrap()))
}

#[test]
fn track_key_invariant_under_case_and_punctuation() {
    assert_eq!(
        CacheLayer::track_key("Song!", "Artist."),
        CacheLayer::track_key("song", "artist")
    );
    assert_eq!(
        CacheLayer::track_key("Livin' La Vida Loca", "RICKY MARTIN"),
        CacheLayer::track_key("livin la vida loca", "ricky martin")
    );
}

#[test]
fn track_key_distinguishes_song_and_artist_boundaries() {
    assert_ne!(
        CacheLayer::track_key("one", "two"),
        CacheLayer::track_key("one two", "")
    );
}

#[tokio::test]
async fn track_round_trip() {
    let layer = memory_layer().await;
    assert!(layer.get_track("Smooth", "Santana").await.is_none());

    let resolved = track("catalog:track:smooth");
    layer.put_track("Smooth", "Santana", &resolved).await;

    // Lookups normalize, so a differently-punctuated spelling still hits.
    let hit = layer.get_track("smooth!", "SANTANA").await;
    assert_eq!(hit, Some(resolved));
}

#[tokio::test]
async fn negative_cache_is_separate_from_tracks() {
    let layer = memory_layer().await;
    assert!(!layer.is_not_found("Ghost Song", "Nobody").await);

    layer.mark_not_found("Ghost Song", "Nobody").await;
    assert!(layer.is_not_found("Ghost Song", "Nobody").await);
    assert!(layer.get_track("Ghost Song", "Nobody").await.is_none());
}

#[tokio::test]
async fn streak_batch_round_trip_reports_misses_as_none() {
    let layer = memory_layer().await;

    let known_a = lookup("1999-05-08", "Smooth", "Santana");
    let known_b = lookup("1999-05-08", "Maria", "Blondie");
    let unknown = lookup("2001-02-03", "Other", "Other");

    layer
        .put_streaks_batch(&[
            (known_a.clone(), StreakSpan { before: 3, after: 1 }),
            (known_b.clone(), StreakSpan { before: 1, after: 0 }),
        ])
        .await;

    let result = layer
        .get_streaks_batch(&[known_a.clone(), known_b.clone(), unknown.clone()])
        .await;

    assert_eq!(
        result.get(&known_a.lookup_key()),
        Some(&Some(StreakSpan { before: 3, after: 1 }))
    );
    assert_eq!(
        result.get(&known_b.lookup_key()),
        Some(&Some(StreakSpan { before: 1, after: 0 }))
    );
    assert_eq!(result.get(&unknown.lookup_key()), Some(&None));
}

#[tokio::test]
async fn flush_streaks_leaves_tracks_alone() {
    let layer = memory_layer().await;

    let resolved = track("catalog:track:smooth");
    layer.put_track("Smooth", "Santana", &resolved).await;
    let entry = lookup("1999-05-08", "Smooth", "Santana");
    layer
        .put_streaks_batch(&[(entry.clone(), StreakSpan { before: 2, after: 0 })])
        .await;

    assert_eq!(layer.flush_streaks().await, Some(1));

    let streaks = layer.get_streaks_batch(&[entry.clone()]).await;
    assert_eq!(streaks.get(&entry.lookup_key()), Some(&None));
    assert!(layer.get_track("Smooth", "Santana").await.is_some());
}

#[tokio::test]
async fn disabled_layer_degrades_to_misses() {
    let layer = CacheLayer::disabled();
    assert!(!layer.is_enabled());

    layer.put_track("Smooth", "Santana", &track("catalog:track:smooth")).await;
    assert!(layer.get_track("Smooth", "Santana").await.is_none());

    layer.mark_not_found("Smooth", "Santana").await;
    assert!(!layer.is_not_found("Smooth", "Santana").await);

    let entry = lookup("1999-05-08", "Smooth", "Santana");
    let streaks = layer.get_streaks_batch(&[entry.clone()]).await;
    assert_eq!(streaks.get(&entry.lookup_key()), Some(&None));

    assert_eq!(layer.flush_streaks().await, None);
}

#[tokio::test]
async fn expired_entries_read_as_misses() {
    let store = CacheStore::open_in_memory().await.unwrap();

    store.put("live", "value", None).await.unwrap();
    store.put("dead", "value", Some(Duration::ZERO)).await.unwrap();

    assert_eq!(store.get("live").await.unwrap().as_deref(), Some("value"));
    assert_eq!(store.get("dead").await.unwrap(), None);

    let many = store
        .get_many(&["live".to_string(), "dead".to_string()])
        .await
        .unwrap();
    assert_eq!(many.len(), 1);
    assert!(many.contains_key("live"));
}

#[tokio::test]
async fn purge_removes_only_expired_rows() {
    let store = CacheStore::open_in_memory().await.unwrap();

    store.put("live", "value", None).await.unwrap();
    store.put("dead", "value", Some(Duration::ZERO)).await.unwrap();

    assert_eq!(store.purge_expired().await.unwrap(), 1);
    assert_eq!(store.get("live").await.unwrap().as_deref(), Some("value"));
}

#[tokio::test]
async fn put_many_writes_every_entry() {
    let store = CacheStore::open_in_memory().await.unwrap();

    store
        .put_many(&[
            ("a".to_string(), "1".to_string(), None),
            ("b".to_string(), "2".to_string(), None),
            ("c".to_string(), "3".to_string(), None),
        ])
        .await
        .unwrap();

    let many = store
        .get_many(&["a".to_string(), "b".to_string(), "c".to_string()])
        .await
        .unwrap();
    assert_eq!(many.len(), 3);
    assert_eq!(many.get("b").map(String::as_str), Some("2"));
}
