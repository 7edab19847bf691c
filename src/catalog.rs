//! Music catalog abstraction.
//!
//! The [`CatalogApi`] trait is the only thing the search stage and the
//! recommendation chain know about the external catalog.  The Spotify Web
//! API implementation lives in [`crate::spotify`]; tests substitute fakes.

use std::fmt;

use crate::error::Result;
use crate::spotify_auth::CredentialMode;

/// Spotify track and artist IDs are base-62 strings of exactly this length.
pub const CATALOG_ID_LEN: usize = 22;

// ── Common record type ───────────────────────────────────────────────────────

/// A track as shown to the user.  Lives for one request only.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// 22-character catalog ID
    pub id: String,
    pub name: String,
    /// Artist names joined with ", "
    pub artist: String,
    /// Outbound link to the track page
    pub url: String,
    /// 30 s preview clip, when the catalog offers one
    pub preview_url: Option<String>,
    /// ID of the first credited artist, used for artist seeding
    pub first_artist_id: Option<String>,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} — {}", self.name, self.artist)
    }
}

// ── Recommendation request ───────────────────────────────────────────────────

/// What a recommendation request is seeded with.
#[derive(Debug, Clone, PartialEq)]
pub enum Seeds {
    Tracks(Vec<String>),
    Artists(Vec<String>),
    Genres(Vec<String>),
}

impl Seeds {
    /// Query parameter name for this seed type.
    pub fn param_name(&self) -> &'static str {
        match self {
            Seeds::Tracks(_) => "seed_tracks",
            Seeds::Artists(_) => "seed_artists",
            Seeds::Genres(_) => "seed_genres",
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            Seeds::Tracks(v) | Seeds::Artists(v) | Seeds::Genres(v) => v,
        }
    }

    pub fn joined(&self) -> String {
        self.values().join(",")
    }
}

/// Target audio features passed along with the seeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetParams {
    pub valence: f32,
    pub energy: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    pub seeds: Seeds,
    pub limit: u32,
    pub market: String,
    pub target: TargetParams,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

/// A catalog that can search tracks and produce seeded recommendations.
pub trait CatalogApi {
    /// Short display name, e.g. "Spotify (user)".
    fn name(&self) -> &str;

    /// Free-text track search.
    fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>>;

    /// Seeded recommendations.  An empty vector is a valid answer.
    fn recommendations(&self, request: &RecommendationRequest) -> Result<Vec<Track>>;
}

/// The catalog clients available for one request, by credential mode.
pub struct CatalogClients<'a> {
    pub user: Option<&'a dyn CatalogApi>,
    pub app: Option<&'a dyn CatalogApi>,
}

impl<'a> CatalogClients<'a> {
    pub fn get(&self, mode: CredentialMode) -> Option<&'a dyn CatalogApi> {
        match mode {
            CredentialMode::User => self.user,
            CredentialMode::App => self.app,
        }
    }

    /// Available modes, user first.
    pub fn modes(&self) -> Vec<CredentialMode> {
        let mut modes = Vec::with_capacity(2);
        if self.user.is_some() {
            modes.push(CredentialMode::User);
        }
        if self.app.is_some() {
            modes.push(CredentialMode::App);
        }
        modes
    }

    /// The client used for search and the connection check.
    pub fn primary(&self) -> Option<&'a dyn CatalogApi> {
        self.user.or(self.app)
    }
}

/// A connected set of catalog clients, built once and borrowed per request.
pub trait CatalogSession {
    fn clients(&self) -> CatalogClients<'_>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeds_param_names() {
        assert_eq!(Seeds::Tracks(vec![]).param_name(), "seed_tracks");
        assert_eq!(Seeds::Artists(vec![]).param_name(), "seed_artists");
        assert_eq!(Seeds::Genres(vec![]).param_name(), "seed_genres");
    }

    #[test]
    fn test_seeds_joined() {
        let seeds = Seeds::Genres(vec!["chill".into(), "ambient".into()]);
        assert_eq!(seeds.joined(), "chill,ambient");
    }

    #[test]
    fn test_track_display() {
        let track = Track {
            id: "0".repeat(CATALOG_ID_LEN),
            name: "Song".into(),
            artist: "A, B".into(),
            url: "https://open.spotify.com/track/x".into(),
            preview_url: None,
            first_artist_id: None,
        };
        assert_eq!(track.to_string(), "Song — A, B");
    }
}
