//! Candidate match scoring
//!
//! Scores catalog search candidates against the expected song, artist, and
//! chart year. Weights: title 50, artist 35, year proximity 15. A best match
//! below [`MIN_CONFIDENCE_SCORE`] is still used, favoring playlist
//! completeness over precision, but is logged as low-confidence.

use crate::catalog::client::CandidateTrack;

/// Score threshold (out of 100) under which a match is logged as
/// low-confidence.
pub const MIN_CONFIDENCE_SCORE: f64 = 40.0;

const TITLE_WEIGHT: f64 = 50.0;
const ARTIST_WEIGHT: f64 = 35.0;
const YEAR_WEIGHT: f64 = 15.0;

/// Normalize for comparison: lowercase, strip punctuation, collapse
/// whitespace, trim.
pub fn normalize(s: &str) -> String {
    let stripped: String = s
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']' | '\'' | '"' | '!' | '?' | '.' | ','))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// String similarity in [0, 1]: 1 on normalized equality, 0.9 when one
/// normalized string contains the other, otherwise the Jaccard overlap of
/// the whitespace-tokenized word sets.
pub fn similarity(a: &str, b: &str) -> f64 {
    let norm_a = normalize(a);
    let norm_b = normalize(b);

    if norm_a == norm_b {
        return 1.0;
    }
    if norm_a.is_empty() || norm_b.is_empty() {
        return 0.0;
    }
    if norm_a.contains(&norm_b) || norm_b.contains(&norm_a) {
        return 0.9;
    }

    let words_a: std::collections::HashSet<&str> = norm_a.split(' ').collect();
    let words_b: std::collections::HashSet<&str> = norm_b.split(' ').collect();
    let intersection = words_a.intersection(&words_b).count() as f64;
    let union = words_a.union(&words_b).count() as f64;

    intersection / union
}

/// The primary artist of a chart credit: everything before the first
/// separator (comma, ampersand, "feat." or "featuring", case-insensitive).
pub fn primary_artist(artist: &str) -> &str {
    // ASCII lowering keeps byte offsets aligned with the original string;
    // the separators themselves are all ASCII.
    let lower = artist.to_ascii_lowercase();
    let mut cut = artist.len();
    for sep in [",", "&", "feat.", "featuring"] {
        if let Some(pos) = lower.find(sep) {
            cut = cut.min(pos);
        }
    }
    artist[..cut].trim()
}

/// Score a candidate against the expectation, out of 100.
pub fn score_candidate(
    candidate: &CandidateTrack,
    expected_song: &str,
    expected_artist: &str,
    expected_year: Option<i32>,
) -> f64 {
    let mut score = similarity(&candidate.name, expected_song) * TITLE_WEIGHT;

    // Artist: best of the joined credit string and each individual artist
    // against the primary expected artist.
    let joined = candidate.artist_names().join(" ");
    let primary = primary_artist(expected_artist);
    let artist_sim = candidate
        .artists
        .iter()
        .map(|a| similarity(&a.name, primary))
        .fold(similarity(&joined, expected_artist), f64::max);
    score += artist_sim * ARTIST_WEIGHT;

    // Year proximity only contributes when both years are known; full score
    // at zero difference, linearly decaying to nothing at ten years.
    if let (Some(expected), Some(release)) = (expected_year, candidate.release_year()) {
        let diff = (release - expected).abs() as f64;
        score += (1.0 - diff / 10.0).max(0.0) * YEAR_WEIGHT;
    }

    score
}

/// Pick the highest-scoring candidate; the earlier candidate wins ties.
pub fn best_match<'a>(
    candidates: &'a [CandidateTrack],
    expected_song: &str,
    expected_artist: &str,
    expected_year: Option<i32>,
) -> Option<(&'a CandidateTrack, f64)> {
    let mut best: Option<(&CandidateTrack, f64)> = None;
    for candidate in candidates {
        let score = score_candidate(candidate, expected_song, expected_artist, expected_year);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::client::{CandidateAlbum, CandidateArtist};

    fn candidate(name: &str, artists: &[&str], release_date: Option<&str>) -> CandidateTrack {
        CandidateTrack {
            uri: format!("catalog:track:{}", name.to_lowercase().replace(' ', "-")),
            name: name.to_string(),
            artists: artists
                .iter()
                .map(|a| CandidateArtist {
                    name: a.to_string(),
                })
                .collect(),
            album: CandidateAlbum {
                name: "Test Album".to_string(),
                release_date: release_date.map(str::to_string),
                images: Vec::new(),
            },
        }
    }

    #[test]
    fn normalize_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(normalize("Hey, Jude!"), "hey jude");
        assert_eq!(normalize("  (Live)   Version "), "live version");
        assert_eq!(normalize("Don't Stop"), "dont stop");
    }

    #[test]
    fn similarity_tiers() {
        assert_eq!(similarity("Hello", "hello!"), 1.0);
        assert_eq!(similarity("Hello (Remastered)", "Hello Remastered Deluxe"), 0.9);
        // "one two three" vs "one two four": overlap 2 of 4 words.
        assert_eq!(similarity("one two three", "one two four"), 0.5);
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn primary_artist_splits_on_credit_separators() {
        assert_eq!(primary_artist("Santana feat. Rob Thomas"), "Santana");
        assert_eq!(primary_artist("Simon & Garfunkel"), "Simon");
        assert_eq!(primary_artist("Beyonce, Jay-Z"), "Beyonce");
        assert_eq!(primary_artist("Adele"), "Adele");
    }

    #[test]
    fn exact_title_and_artist_score_85_without_year() {
        let c = candidate("Smooth", &["Santana"], None);
        let score = score_candidate(&c, "Smooth", "Santana", Some(1999));
        assert_eq!(score, 85.0);
    }

    #[test]
    fn year_proximity_decays_linearly() {
        let same_year = candidate("Smooth", &["Santana"], Some("1999-06-29"));
        assert_eq!(score_candidate(&same_year, "Smooth", "Santana", Some(1999)), 100.0);

        let five_off = candidate("Smooth", &["Santana"], Some("2004-01-01"));
        let score = score_candidate(&five_off, "Smooth", "Santana", Some(1999));
        assert!((score - 92.5).abs() < 1e-9);

        let distant = candidate("Smooth", &["Santana"], Some("2019-01-01"));
        assert_eq!(score_candidate(&distant, "Smooth", "Santana", Some(1999)), 85.0);
    }

    #[test]
    fn individual_artist_beats_joined_credit() {
        // The joined credit "Santana Rob Thomas" is a poor match for the
        // full expectation, but the individual artist matches its primary
        // token exactly.
        let c = candidate("Smooth", &["Santana", "Rob Thomas"], None);
        let score = score_candidate(&c, "Smooth", "Santana feat. Rob Thomas", None);
        assert_eq!(score, 85.0);
    }

    #[test]
    fn best_match_prefers_higher_score_and_earlier_ties() {
        let candidates = vec![
            candidate("Smooth Operator", &["Sade"], None),
            candidate("Smooth", &["Santana"], None),
            candidate("Smooth", &["Santana"], None),
        ];
        let (best, score) = best_match(&candidates, "Smooth", "Santana", None).unwrap();
        assert_eq!(score, 85.0);
        // Ties break to the earlier candidate.
        assert!(std::ptr::eq(best, &candidates[1]));
    }

    #[test]
    fn best_match_empty_candidates() {
        assert!(best_match(&[], "Smooth", "Santana", None).is_none());
    }
}
