//! Verification cascade.
//!
//! Tries, in order: exact external-identifier match, tiered track evidence,
//! and the weighted heuristic fallback. The first tier that clears its bar
//! decides the result.
//!
//! ```text
//! Start → TryIdentifier → TryTrackEvidence → Heuristic → Done
//! ```

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::evidence::gather_evidence;
use crate::heuristic::{HeuristicInput, HeuristicScorer, HeuristicWeights};
use crate::index::ProfileIndex;
use crate::models::{
    CandidateProfile, DebugInfo, MatchEvidence, ScoreBreakdown, VerificationMethod,
    VerificationResult, VerifyError,
};
use crate::normalize::fold_key;
use crate::scoring::{tier_score, STRONG_TRACK_GATE};

/// Confidence assigned to an exact identifier match
pub const IDENTIFIER_CONFIDENCE: f64 = 0.99;

/// Heuristic totals above this are reported as `TRACK_BASED`
pub const TRACK_BASED_CUTOFF: f64 = 0.7;

// ============================================================================
// Candidate Track Source
// ============================================================================

/// Fetches a candidate's top tracks and albums from an external catalog.
///
/// Implementations own their timeout/retry policy. Any failure (not found,
/// timeout, bad response) must be reported as an empty list; the cascade
/// never sees an error from this capability.
pub trait CandidateTrackSource {
    fn top_tracks(&self, candidate: &CandidateProfile) -> Vec<String>;
    fn top_albums(&self, candidate: &CandidateProfile) -> Vec<String>;
}

/// Case-fold, trim and drop blank names from a fetched list.
fn clean_fetched(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|n| fold_key(&n))
        .filter(|n| !n.is_empty())
        .collect()
}

// ============================================================================
// Verifier
// ============================================================================

/// One artist name and the candidates found for it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationJob {
    pub artist: String,
    pub candidates: Vec<CandidateProfile>,
}

/// Verification engine. Holds the immutable listening-history index and the
/// heuristic scorer; share one instance by reference across threads.
#[derive(Debug, Clone)]
pub struct Verifier {
    index: ProfileIndex,
    heuristic: HeuristicScorer,
}

/// Winner of the track-evidence tier.
struct TrackEvidenceWinner {
    slot: usize,
    evidence: MatchEvidence,
    confidence: f64,
}

impl Verifier {
    pub fn new(index: ProfileIndex) -> Self {
        Self {
            index,
            heuristic: HeuristicScorer::default(),
        }
    }

    pub fn with_weights(
        index: ProfileIndex,
        weights: HeuristicWeights,
    ) -> Result<Self, VerifyError> {
        Ok(Self {
            index,
            heuristic: HeuristicScorer::new(weights)?,
        })
    }

    pub fn index(&self) -> &ProfileIndex {
        &self.index
    }

    /// Decide which candidate (if any) is `artist`.
    ///
    /// Fails only when `candidates` is empty. Without a `source`, track and
    /// album evidence are unavailable and the decision rests on identifiers,
    /// names and listener counts.
    pub fn verify(
        &self,
        artist: &str,
        candidates: &[CandidateProfile],
        source: Option<&dyn CandidateTrackSource>,
    ) -> Result<VerificationResult, VerifyError> {
        if candidates.is_empty() {
            return Err(VerifyError::EmptyCandidateList {
                artist: artist.to_string(),
            });
        }

        info!(
            "Verifying artist '{}' among {} candidates",
            artist,
            candidates.len()
        );

        // Tier 1: exact identifier
        if let Some(result) = self.try_identifier(artist, candidates) {
            return Ok(result);
        }

        // Tier 2: tiered track evidence
        let candidate_tracks: Vec<Vec<String>> = candidates
            .iter()
            .map(|c| source.map(|s| clean_fetched(s.top_tracks(c))).unwrap_or_default())
            .collect();

        if let Some(winner) = self.try_track_evidence(artist, candidates, &candidate_tracks) {
            if winner.confidence >= STRONG_TRACK_GATE {
                let chosen = &candidates[winner.slot];
                info!(
                    "Strong track evidence for '{}': {} (confidence {:.3})",
                    artist, chosen.name, winner.confidence
                );
                return Ok(VerificationResult {
                    artist_name: artist.to_string(),
                    chosen_profile: chosen.clone(),
                    confidence_score: winner.confidence,
                    verification_method: VerificationMethod::StrongTrackMatch,
                    all_candidates: candidates.to_vec(),
                    track_matches: winner.evidence.matched_pairs.clone(),
                    debug_info: DebugInfo::StrongTrackEvidence {
                        evidence: winner.evidence,
                    },
                });
            }
        }

        // Tier 3: weighted heuristic over every candidate
        Ok(self.heuristic_fallback(artist, candidates, &candidate_tracks, source))
    }

    fn try_identifier(
        &self,
        artist: &str,
        candidates: &[CandidateProfile],
    ) -> Option<VerificationResult> {
        if !self.index.has_external_ids() {
            debug!("Identifier matching unavailable: history carries no identifiers");
            return None;
        }
        let Some(user_id) = self.index.external_id_for(artist) else {
            debug!("No identifier in history for '{}'", artist);
            return None;
        };

        let chosen = candidates
            .iter()
            .find(|c| c.external_id.as_deref().map(str::trim) == Some(user_id))?;

        info!("Identifier match for '{}': {} ({})", artist, chosen.name, user_id);
        Some(VerificationResult {
            artist_name: artist.to_string(),
            chosen_profile: chosen.clone(),
            confidence_score: IDENTIFIER_CONFIDENCE,
            verification_method: VerificationMethod::IdentifierMatch,
            all_candidates: candidates.to_vec(),
            track_matches: Vec::new(),
            debug_info: DebugInfo::IdentifierMatch {
                user_id: user_id.to_string(),
                matched_id: chosen.external_id.clone().unwrap_or_default(),
            },
        })
    }

    /// Best tier score across candidates with a non-empty track list.
    /// Ties keep the earlier candidate; a zero score never wins.
    fn try_track_evidence(
        &self,
        artist: &str,
        candidates: &[CandidateProfile],
        candidate_tracks: &[Vec<String>],
    ) -> Option<TrackEvidenceWinner> {
        let mut best: Option<TrackEvidenceWinner> = None;

        for (slot, (candidate, tracks)) in candidates.iter().zip(candidate_tracks).enumerate() {
            if tracks.is_empty() {
                continue;
            }
            let evidence = gather_evidence(&self.index, artist, tracks);
            let confidence = tier_score(&evidence);

            debug!(
                "Track evidence for {}: {} perfect, {} strong, {}/{} matched, confidence {:.3}",
                candidate.name,
                evidence.perfect_match_count,
                evidence.strong_match_count,
                evidence.match_count,
                evidence.total_user_tracks,
                confidence
            );

            let best_confidence = best.as_ref().map_or(0.0, |b| b.confidence);
            if confidence > best_confidence {
                best = Some(TrackEvidenceWinner {
                    slot,
                    evidence,
                    confidence,
                });
            }
        }

        best
    }

    fn heuristic_fallback(
        &self,
        artist: &str,
        candidates: &[CandidateProfile],
        candidate_tracks: &[Vec<String>],
        source: Option<&dyn CandidateTrackSource>,
    ) -> VerificationResult {
        let user_tracks = self.index.tracks_for(artist);
        let user_albums = self.index.albums_for(artist);

        let mut scored: Vec<(usize, ScoreBreakdown)> = candidates
            .iter()
            .zip(candidate_tracks)
            .enumerate()
            .map(|(slot, (candidate, tracks))| {
                let albums = match source {
                    Some(s) if !user_albums.is_empty() => clean_fetched(s.top_albums(candidate)),
                    _ => Vec::new(),
                };
                let breakdown = self.heuristic.score(&HeuristicInput {
                    query: artist,
                    candidate,
                    user_tracks,
                    user_albums,
                    candidate_tracks: tracks,
                    candidate_albums: &albums,
                });
                (slot, breakdown)
            })
            .collect();

        // Stable: equal totals keep input order
        scored.sort_by(|a, b| b.1.total.total_cmp(&a.1.total));

        for (rank, (slot, breakdown)) in scored.iter().take(3).enumerate() {
            debug!(
                "[{}] {} ({} listeners) - score {:.3} (track {:.3}, album {:.3}, name {:.3}, listeners {:.3})",
                rank + 1,
                candidates[*slot].name,
                breakdown.listener_count,
                breakdown.total,
                breakdown.track,
                breakdown.album,
                breakdown.name,
                breakdown.listeners
            );
        }

        let (slot, breakdown) = scored.swap_remove(0);
        let chosen = &candidates[slot];
        let method = if breakdown.total > TRACK_BASED_CUTOFF {
            VerificationMethod::TrackBased
        } else {
            VerificationMethod::HeuristicBased
        };

        info!(
            "Heuristic choice for '{}': {} (score {:.3}, {})",
            artist, chosen.name, breakdown.total, method
        );

        VerificationResult {
            artist_name: artist.to_string(),
            chosen_profile: chosen.clone(),
            confidence_score: breakdown.total,
            verification_method: method,
            all_candidates: candidates.to_vec(),
            track_matches: breakdown.track_matches.clone(),
            debug_info: DebugInfo::Heuristic { breakdown },
        }
    }

    /// Verify a batch in parallel. Output order matches `jobs`;
    /// `on_complete` runs once per finished job.
    pub fn verify_many<F>(
        &self,
        jobs: &[VerificationJob],
        source: Option<&(dyn CandidateTrackSource + Sync)>,
        on_complete: F,
    ) -> Vec<Result<VerificationResult, VerifyError>>
    where
        F: Fn() + Sync,
    {
        jobs.par_iter()
            .map(|job| {
                let source = source.map(|s| s as &dyn CandidateTrackSource);
                let result = self.verify(&job.artist, &job.candidates, source);
                on_complete();
                result
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
