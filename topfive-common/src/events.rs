//! Playlist event protocol
//!
//! The resolution pipeline reports progress as an ordered sequence of named
//! events delivered incrementally over SSE. The set is closed: consumers
//! match exhaustively, so a new event kind cannot be silently dropped.
//!
//! Sequence per run: one `init`, zero or more `song` in candidate order, one
//! `duplicates`, then exactly one terminal `complete` or `error`. The stream
//! closes immediately after the terminal event.

use crate::chart::ChartEntry;
use serde::{Deserialize, Serialize};

/// Progress events for one playlist resolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlaylistEvent {
    /// Stream opened; `total` is the number of candidates that will be
    /// processed.
    Init { total: usize },

    /// One resolved candidate.
    Song {
        #[serde(flatten)]
        entry: ChartEntry,
        progress: usize,
        total: usize,
    },

    /// Catalog track ids that resolved for more than one candidate.
    Duplicates { ids: Vec<String> },

    /// Terminal summary of a successful run.
    #[serde(rename_all = "camelCase")]
    Complete {
        total_songs: usize,
        found_songs: usize,
        not_found_count: usize,
        cache_hits: usize,
        api_calls: usize,
    },

    /// Terminal failure; distinct from a per-candidate not-found.
    Error { message: String },
}

impl PlaylistEvent {
    /// Event name used on the wire (the SSE `event:` field).
    pub fn event_type(&self) -> &'static str {
        match self {
            PlaylistEvent::Init { .. } => "init",
            PlaylistEvent::Song { .. } => "song",
            PlaylistEvent::Duplicates { .. } => "duplicates",
            PlaylistEvent::Complete { .. } => "complete",
            PlaylistEvent::Error { .. } => "error",
        }
    }

    /// True for `complete` and `error`; no events follow a terminal one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlaylistEvent::Complete { .. } | PlaylistEvent::Error { .. }
        )
    }
}
