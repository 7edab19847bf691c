//! Final shaping of the track list: dedup, shuffle, truncate.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::catalog::Track;

/// Drop later entries whose (name, artist) pair was already seen.
pub fn dedup_tracks(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert((t.name.clone(), t.artist.clone())))
        .collect()
}

/// Dedup, shuffle with `rng`, keep the first `limit`.
pub fn normalize_with_rng<R: Rng + ?Sized>(
    tracks: Vec<Track>,
    limit: usize,
    rng: &mut R,
) -> Vec<Track> {
    let mut unique = dedup_tracks(tracks);
    unique.shuffle(rng);
    unique.truncate(limit);
    unique
}

/// [`normalize_with_rng`] with the thread-local RNG; order differs per call.
pub fn normalize(tracks: Vec<Track>, limit: usize) -> Vec<Track> {
    normalize_with_rng(tracks, limit, &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::track;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample() -> Vec<Track> {
        vec![
            track("1", "Song", "A", None),
            track("2", "Song", "A", None),
            track("3", "Song", "B", None),
            track("4", "Other", "A", None),
            track("5", "Song", "A, B", None),
        ]
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let unique = dedup_tracks(sample());
        let ids: Vec<&str> = unique.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "4", "5"]);
    }

    #[test]
    fn test_normalize_truncates_and_has_no_duplicate_pairs() {
        let mut tracks = Vec::new();
        for i in 0..40 {
            tracks.push(track(&i.to_string(), &format!("Song {}", i % 20), "X", None));
        }
        let mut rng = StdRng::seed_from_u64(7);
        let out = normalize_with_rng(tracks, 15, &mut rng);
        assert_eq!(out.len(), 15);

        let pairs: HashSet<(String, String)> =
            out.iter().map(|t| (t.name.clone(), t.artist.clone())).collect();
        assert_eq!(pairs.len(), out.len());
    }

    #[test]
    fn test_normalize_is_a_permutation_of_unique_entries() {
        let mut rng = StdRng::seed_from_u64(42);
        let out = normalize_with_rng(sample(), 15, &mut rng);
        let mut ids: Vec<String> = out.iter().map(|t| t.id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "3", "4", "5"]);
    }

    #[test]
    fn test_normalize_empty() {
        assert!(normalize(Vec::new(), 15).is_empty());
    }
}
