//! Recommendation retrieval with tiered fallback.
//!
//! Three tiers of decreasing specificity (track seeds, artist seeds, genre
//! seeds), each tried with the user-scoped client first and the app-scoped
//! client second.  The tier/credential order is computed up front by
//! [`plan_attempts`] and walked by [`recommend_with_fallback`], which stops
//! at the first attempt that yields tracks.  Errors from any attempt count
//! as "no tracks".

use std::fmt;

use tracing::{debug, info};

use crate::catalog::{
    CatalogClients, RecommendationRequest, Seeds, TargetParams, Track, CATALOG_ID_LEN,
};
use crate::search::SearchOutcome;
use crate::sentiment::Label;
use crate::spotify_auth::CredentialMode;

/// Seed IDs kept after cleaning.
pub const SEED_POOL: usize = 5;
/// Seeds actually sent per request.
pub const SEEDS_PER_QUERY: usize = 3;
/// Tracks requested from the recommendation endpoint.
pub const RECOMMENDATION_LIMIT: u32 = 30;

/// Genre seeds the catalog is known to accept, in matching order.
const GENRE_ALLOW_LIST: &[&str] = &[
    "chill", "ambient", "pop", "rock", "piano", "dance", "electronic", "hip-hop", "jazz",
    "classical",
];

// ── Seeds and targets ────────────────────────────────────────────────────────

/// Valence/energy preset for a sentiment label, chosen by label prefix.
pub fn target_params(label: Label) -> TargetParams {
    let name = label.as_str();
    if name.starts_with("pos") {
        TargetParams { valence: 0.75, energy: 0.70 }
    } else if name.starts_with("neg") {
        TargetParams { valence: 0.30, energy: 0.35 }
    } else {
        TargetParams { valence: 0.50, energy: 0.45 }
    }
}

/// Keep well-formed IDs, first occurrence only, at most `k`.
pub fn clean_ids(ids: &[String], k: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(k);
    for id in ids {
        if out.len() >= k {
            break;
        }
        if id.chars().count() == CATALOG_ID_LEN && !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

/// Map search tags onto allow-listed genre seeds by substring, at most
/// [`SEEDS_PER_QUERY`], first occurrence wins.
pub fn genres_from_tags(tags: &[String]) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.to_lowercase();
        for genre in GENRE_ALLOW_LIST {
            if tag.contains(genre) && !genres.iter().any(|g| g == genre) {
                genres.push(genre.to_string());
            }
        }
    }
    genres.truncate(SEEDS_PER_QUERY);
    genres
}

/// Cleaned seed candidates for every tier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedSets {
    pub tracks: Vec<String>,
    pub artists: Vec<String>,
    pub genres: Vec<String>,
}

impl SeedSets {
    pub fn build(search: &SearchOutcome, tags: &[String]) -> Self {
        Self {
            tracks: clean_ids(&search.track_ids, SEED_POOL),
            artists: clean_ids(&search.artist_ids, SEED_POOL),
            genres: genres_from_tags(tags),
        }
    }

    /// The seeds for one tier, capped for the query; `None` when empty.
    pub fn seeds_for(&self, tier: Tier) -> Option<Seeds> {
        let pool = match tier {
            Tier::Tracks => &self.tracks,
            Tier::Artists => &self.artists,
            Tier::Genres => &self.genres,
        };
        if pool.is_empty() {
            return None;
        }
        let capped: Vec<String> = pool.iter().take(SEEDS_PER_QUERY).cloned().collect();
        Some(match tier {
            Tier::Tracks => Seeds::Tracks(capped),
            Tier::Artists => Seeds::Artists(capped),
            Tier::Genres => Seeds::Genres(capped),
        })
    }
}

// ── Attempt plan ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Tracks,
    Artists,
    Genres,
}

impl Tier {
    pub const ORDER: [Tier; 3] = [Tier::Tracks, Tier::Artists, Tier::Genres];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Tracks => "track seeds",
            Tier::Artists => "artist seeds",
            Tier::Genres => "genre seeds",
        })
    }
}

/// One (seed tier, credential mode) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub tier: Tier,
    pub mode: CredentialMode,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {} credentials", self.tier, self.mode.as_str())
    }
}

/// Ordered attempts: tiers with seeds, each with every available mode.
pub fn plan_attempts(seeds: &SeedSets, modes: &[CredentialMode]) -> Vec<Attempt> {
    Tier::ORDER
        .iter()
        .filter(|tier| seeds.seeds_for(**tier).is_some())
        .flat_map(|&tier| modes.iter().map(move |&mode| Attempt { tier, mode }))
        .collect()
}

// ── Chain ────────────────────────────────────────────────────────────────────

/// What happened on one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptStatus {
    Found(usize),
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub attempt: Attempt,
    pub status: AttemptStatus,
}

/// Result of walking the chain.  `winner` is `None` when every tier came up
/// empty; `tracks` is then empty too.
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    pub tracks: Vec<Track>,
    pub winner: Option<Attempt>,
    pub log: Vec<AttemptRecord>,
}

impl ChainOutcome {
    pub fn succeeded(&self) -> bool {
        self.winner.is_some()
    }
}

/// Walk the attempt plan and return the first non-empty recommendation list.
pub fn recommend_with_fallback(
    clients: &CatalogClients<'_>,
    seeds: &SeedSets,
    label: Label,
    market: &str,
) -> ChainOutcome {
    let target = target_params(label);
    let plan = plan_attempts(seeds, &clients.modes());
    let mut outcome = ChainOutcome::default();

    for attempt in plan {
        let (Some(client), Some(seed_values)) =
            (clients.get(attempt.mode), seeds.seeds_for(attempt.tier))
        else {
            continue;
        };

        let request = RecommendationRequest {
            seeds: seed_values,
            limit: RECOMMENDATION_LIMIT,
            market: market.to_string(),
            target,
        };

        let status = match client.recommendations(&request) {
            Ok(tracks) if !tracks.is_empty() => {
                let found = tracks.len();
                info!(attempt = %attempt, found, "recommendations found");
                outcome.tracks = tracks;
                outcome.winner = Some(attempt);
                AttemptStatus::Found(found)
            }
            Ok(_) => {
                debug!(attempt = %attempt, "no recommendations");
                AttemptStatus::Empty
            }
            Err(e) => {
                debug!(attempt = %attempt, "recommendation request failed: {}", e);
                AttemptStatus::Failed(e.to_string())
            }
        };

        outcome.log.push(AttemptRecord { attempt, status });
        if outcome.succeeded() {
            break;
        }
    }

    outcome
}
