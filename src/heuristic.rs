//! Weighted multi-factor fallback scorer.
//!
//! Used when neither an identifier nor strong track evidence settles the
//! verification. Each factor is confined to [0, 1] and the weights sum to 1,
//! so the weighted total is also in [0, 1].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{CandidateProfile, MatchPair, ScoreBreakdown, VerifyError};
use crate::normalize::case_fold;
use crate::scoring::{heuristic_similarity, similarity, MIN_TRACK_SIMILARITY};

/// Album pairings need this similarity to count
pub const MIN_ALBUM_SIMILARITY: f64 = 0.7;

/// Name score when the query carries a leading marker the candidate lacks
pub const MARKER_PENALTY_SCORE: f64 = 0.3;

/// Leading characters that make an artist name distinct from its bare form
/// (e.g. "*luna" is not "luna").
pub const NAME_MARKERS: &[char] = &['*'];

// ============================================================================
// Weights
// ============================================================================

/// Relative weight of each factor. Immutable once a scorer is built;
/// construct a new `HeuristicScorer` for different tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    pub track: f64,
    pub album: f64,
    pub name: f64,
    pub listeners: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            track: 0.50,
            album: 0.30,
            name: 0.15,
            listeners: 0.05,
        }
    }
}

impl HeuristicWeights {
    pub fn sum(&self) -> f64 {
        self.track + self.album + self.name + self.listeners
    }

    /// All weights must be finite and non-negative and sum to 1.
    pub fn validate(&self) -> Result<(), VerifyError> {
        let all = [self.track, self.album, self.name, self.listeners];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(VerifyError::InvalidWeights {
                reason: "weights must be finite and non-negative".to_string(),
            });
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(VerifyError::InvalidWeights {
                reason: format!("weights must sum to 1.0, got {:.6}", sum),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Scorer
// ============================================================================

/// Everything the heuristic needs about one (artist, candidate) pair.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicInput<'a> {
    pub query: &'a str,
    pub candidate: &'a CandidateProfile,
    pub user_tracks: &'a BTreeSet<String>,
    pub user_albums: &'a BTreeSet<String>,
    pub candidate_tracks: &'a [String],
    pub candidate_albums: &'a [String],
}

#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    weights: HeuristicWeights,
}

impl HeuristicScorer {
    pub fn new(weights: HeuristicWeights) -> Result<Self, VerifyError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &HeuristicWeights {
        &self.weights
    }

    /// Score one candidate and return the per-factor breakdown.
    pub fn score(&self, input: &HeuristicInput<'_>) -> ScoreBreakdown {
        let (track, track_matches) = track_score(input.user_tracks, input.candidate_tracks);
        let album = album_score(input.user_albums, input.candidate_albums);
        let name = name_score(input.query, &input.candidate.name);
        let listeners = listener_score(input.candidate.listeners);

        let w = &self.weights;
        let total = (track * w.track + album * w.album + name * w.name + listeners * w.listeners)
            .clamp(0.0, 1.0);

        ScoreBreakdown {
            total,
            track,
            album,
            name,
            listeners,
            listener_count: input.candidate.listeners,
            track_matches,
        }
    }
}

// ============================================================================
// Factor Scores
// ============================================================================

/// Summed best-match similarity divided by the number of user tracks;
/// unmatched user tracks contribute 0.
pub fn track_score(
    user_tracks: &BTreeSet<String>,
    candidate_tracks: &[String],
) -> (f64, Vec<MatchPair>) {
    if user_tracks.is_empty() || candidate_tracks.is_empty() {
        return (0.0, Vec::new());
    }

    let mut matches = Vec::new();
    let mut total = 0.0;

    for user in user_tracks {
        let mut best: Option<(&String, f64)> = None;
        for candidate in candidate_tracks {
            let sim = heuristic_similarity(user, candidate);
            if sim > best.map_or(0.0, |(_, s)| s) && sim > MIN_TRACK_SIMILARITY {
                best = Some((candidate, sim));
            }
        }
        if let Some((candidate, sim)) = best {
            total += sim;
            matches.push(MatchPair {
                user_track: user.clone(),
                candidate_track: candidate.clone(),
                similarity: sim,
            });
        }
    }

    ((total / user_tracks.len() as f64).min(1.0), matches)
}

/// For each user album, the first candidate album above 0.7 similarity
/// counts; the sum is divided by the number of user albums.
pub fn album_score(user_albums: &BTreeSet<String>, candidate_albums: &[String]) -> f64 {
    if user_albums.is_empty() || candidate_albums.is_empty() {
        return 0.0;
    }

    let total: f64 = user_albums
        .iter()
        .filter_map(|user| {
            candidate_albums
                .iter()
                .map(|candidate| similarity(user, candidate))
                .find(|&sim| sim > MIN_ALBUM_SIMILARITY)
        })
        .sum();

    (total / user_albums.len() as f64).min(1.0)
}

/// Case-insensitive name similarity with a penalty for dropped markers.
pub fn name_score(query: &str, candidate: &str) -> f64 {
    let query = case_fold(query);
    let candidate = case_fold(candidate);

    if query == candidate {
        return 1.0;
    }

    if query.starts_with(NAME_MARKERS) && !candidate.starts_with(NAME_MARKERS) {
        let bare: String = query.chars().filter(|c| !NAME_MARKERS.contains(c)).collect();
        if bare == candidate {
            return MARKER_PENALTY_SCORE;
        }
    }

    similarity(&query, &candidate)
}

/// Logarithmic plausibility: ~1,000,000 listeners saturates to 1.0.
pub fn listener_score(listeners: u64) -> f64 {
    if listeners == 0 {
        return 0.0;
    }
    ((listeners as f64 + 1.0).log10() / 6.0).min(1.0)
}
