//! Track evidence gathering.
//!
//! Pairs every canonical user track with its nearest canonical candidate
//! track and aggregates the pairings into `MatchEvidence`. Matching is greedy
//! per user track: one candidate track may serve several user tracks.

use rustc_hash::FxHashSet;

use crate::index::ProfileIndex;
use crate::models::{MatchEvidence, MatchPair};
use crate::normalize::canonicalize;
use crate::scoring::{
    evidence_similarity, MIN_TRACK_SIMILARITY, PERFECT_MATCH_SIMILARITY, STRONG_MATCH_SIMILARITY,
};

/// Canonicalize titles, keeping the first occurrence of each canonical form.
fn canonical_titles<'a, I>(titles: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = FxHashSet::default();
    titles
        .into_iter()
        .map(canonicalize)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Gather evidence for `artist` from the index against one candidate's tracks.
pub fn gather_evidence(
    index: &ProfileIndex,
    artist: &str,
    candidate_tracks: &[String],
) -> MatchEvidence {
    let user_tracks = index.tracks_for(artist);
    match_tracks(
        user_tracks.iter().map(String::as_str),
        user_tracks.len(),
        candidate_tracks,
    )
}

/// Core matcher. `total_user_tracks` is the size of the user's track set
/// before canonical de-duplication.
pub fn match_tracks<'a, I>(
    user_tracks: I,
    total_user_tracks: usize,
    candidate_tracks: &[String],
) -> MatchEvidence
where
    I: IntoIterator<Item = &'a str>,
{
    if total_user_tracks == 0 || candidate_tracks.is_empty() {
        return MatchEvidence::empty(total_user_tracks);
    }

    let user = canonical_titles(user_tracks);
    let candidates = canonical_titles(candidate_tracks.iter().map(String::as_str));

    let mut pairs = Vec::new();
    let mut strong = 0;
    let mut perfect = 0;
    let mut total_similarity = 0.0;

    for u in &user {
        let mut best: Option<(&String, f64)> = None;
        for c in &candidates {
            let sim = evidence_similarity(u, c);
            let best_sim = best.map_or(0.0, |(_, s)| s);
            if sim > best_sim && sim > MIN_TRACK_SIMILARITY {
                best = Some((c, sim));
            }
        }

        if let Some((c, sim)) = best {
            if sim > PERFECT_MATCH_SIMILARITY {
                perfect += 1;
            } else if sim > STRONG_MATCH_SIMILARITY {
                strong += 1;
            }
            total_similarity += sim;
            pairs.push(MatchPair {
                user_track: u.clone(),
                candidate_track: c.clone(),
                similarity: sim,
            });
        }
    }

    let match_count = pairs.len();
    let average = if match_count > 0 {
        total_similarity / match_count as f64
    } else {
        0.0
    };
    let best_score = pairs.iter().map(|p| p.similarity).fold(0.0, f64::max);

    MatchEvidence {
        total_user_tracks,
        match_count,
        strong_match_count: strong,
        perfect_match_count: perfect,
        average_score_of_matches: average,
        best_match_score: best_score,
        matched_pairs: pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::HistoryRecord;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn index() -> ProfileIndex {
        ProfileIndex::from_records(vec![
            HistoryRecord::new("Artist", "Idol"),
            HistoryRecord::new("Artist", "Yoru ni Kakeru"),
            HistoryRecord::new("Artist", "Gunjo (Live)"),
            HistoryRecord::new("Artist", "Completely Different"),
        ])
    }

    #[test]
    fn test_empty_candidate_tracks() {
        let evidence = gather_evidence(&index(), "Artist", &[]);
        assert_eq!(evidence.total_user_tracks, 4);
        assert_eq!(evidence.match_count, 0);
        assert_eq!(evidence.average_score_of_matches, 0.0);
        assert_eq!(evidence.best_match_score, 0.0);
        assert!(evidence.matched_pairs.is_empty());
    }

    #[test]
    fn test_unknown_artist() {
        let evidence = gather_evidence(&index(), "Nobody", &strings(&["idol"]));
        assert_eq!(evidence.total_user_tracks, 0);
        assert_eq!(evidence.match_ratio(), 0.0);
    }

    #[test]
    fn test_canonical_matches() {
        let candidate = strings(&[
            "IDOL (Radio Edit)",
            "yoru ni kakeru",
            "Gunjo",
            "Unrelated Song",
        ]);
        let evidence = gather_evidence(&index(), "artist", &candidate);
        assert_eq!(evidence.match_count, 3);
        assert_eq!(evidence.perfect_match_count, 3);
        assert_eq!(evidence.strong_match_count, 0);
        assert!((evidence.average_score_of_matches - 1.0).abs() < 1e-12);
        assert!((evidence.best_match_score - 1.0).abs() < 1e-12);
        assert!((evidence.match_ratio() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_substring_floor() {
        let evidence = match_tracks(["idol"], 1, &strings(&["idol tv size version 2"]));
        // "- ... version" is not stripped without a hyphen, containment applies
        assert_eq!(evidence.match_count, 1);
        assert!((evidence.matched_pairs[0].similarity - 0.85).abs() < 1e-12);
        assert_eq!(evidence.strong_match_count, 0);
        assert_eq!(evidence.perfect_match_count, 0);
    }

    #[test]
    fn test_below_threshold_unmatched() {
        let evidence = match_tracks(["abcdef"], 1, &strings(&["uvwxyz"]));
        assert_eq!(evidence.match_count, 0);
        assert_eq!(evidence.best_match_score, 0.0);
    }

    #[test]
    fn test_greedy_reuse_of_candidate_track() {
        let evidence = match_tracks(["hello world", "hello world!"], 2, &strings(&["hello world"]));
        assert_eq!(evidence.match_count, 2);
        assert!(evidence
            .matched_pairs
            .iter()
            .all(|p| p.candidate_track == "hello world"));
    }

    #[test]
    fn test_strong_bucket() {
        // One edit in 12 characters: 0.9166..., strong but not perfect
        let evidence = match_tracks(["abcdefghijkl"], 1, &strings(&["abcdefghijkx"]));
        assert_eq!(evidence.match_count, 1);
        assert_eq!(evidence.strong_match_count, 1);
        assert_eq!(evidence.perfect_match_count, 0);
    }
}
