//! Per-tag catalog search.
//!
//! One search per tag; each failure is logged and skipped so the remaining
//! tags still contribute.

use tracing::{debug, info};

use crate::catalog::{CatalogApi, Track};

/// Tracks requested per tag.
pub const SEARCH_LIMIT_PER_TAG: u32 = 10;

/// Everything collected by the search stage.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// All returned tracks, in tag order
    pub tracks: Vec<Track>,
    /// Every track ID, duplicates included
    pub track_ids: Vec<String>,
    /// First-artist ID of every track that has one
    pub artist_ids: Vec<String>,
    /// Tags whose search failed
    pub failed_tags: Vec<String>,
}

impl SearchOutcome {
    /// True when there is nothing to recommend from.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() || self.track_ids.is_empty()
    }
}

/// Run one search per tag against `catalog`.
pub fn search_tags(catalog: &dyn CatalogApi, tags: &[String]) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();

    for tag in tags {
        match catalog.search_tracks(tag, SEARCH_LIMIT_PER_TAG) {
            Ok(tracks) => {
                debug!(tag = %tag, found = tracks.len(), "tag search");
                for track in tracks {
                    outcome.track_ids.push(track.id.clone());
                    if let Some(artist_id) = &track.first_artist_id {
                        outcome.artist_ids.push(artist_id.clone());
                    }
                    outcome.tracks.push(track);
                }
            }
            Err(e) => {
                debug!(tag = %tag, "tag search failed: {}", e);
                outcome.failed_tags.push(tag.clone());
            }
        }
    }

    info!(
        tags = tags.len(),
        tracks = outcome.tracks.len(),
        failed = outcome.failed_tags.len(),
        "search stage done"
    );
    outcome
}
