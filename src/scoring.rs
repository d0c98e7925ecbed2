//! Scoring functions for artist verification.
//!
//! This module contains:
//! - String similarity primitives shared by every scorer
//! - Adaptive tiered confidence for track evidence

use strsim::normalized_levenshtein;

use crate::models::MatchEvidence;

// ============================================================================
// Score Thresholds
// ============================================================================

/// Minimum similarity for a track pairing to count as a match
pub const MIN_TRACK_SIMILARITY: f64 = 0.6;

/// Similarity above which a match is "strong"
pub const STRONG_MATCH_SIMILARITY: f64 = 0.90;

/// Similarity above which a match is "perfect"
pub const PERFECT_MATCH_SIMILARITY: f64 = 0.98;

/// Tier score at which track evidence alone decides the verification
pub const STRONG_TRACK_GATE: f64 = 0.85;

/// Floor applied when one canonical title contains the other (evidence path)
const EVIDENCE_SUBSTRING_FLOOR: f64 = 0.85;

/// Floor applied when one raw title contains the other (heuristic path)
const HEURISTIC_SUBSTRING_FLOOR: f64 = 0.8;

// ============================================================================
// String Similarity
// ============================================================================

/// Edit-distance similarity in [0, 1], computed over Unicode scalar values.
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b)
}

fn contains_either(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

/// Similarity between two canonical titles for strong evidence.
/// Exact equality forces 1.0; containment lifts the score to at least 0.85.
pub fn evidence_similarity(user: &str, candidate: &str) -> f64 {
    let ratio = similarity(user, candidate);
    if user == candidate {
        1.0
    } else if contains_either(user, candidate) {
        ratio.max(EVIDENCE_SUBSTRING_FLOOR)
    } else {
        ratio
    }
}

/// Similarity between two stored titles for the heuristic fallback.
/// Milder than `evidence_similarity`: containment only lifts to 0.8.
pub fn heuristic_similarity(user: &str, candidate: &str) -> f64 {
    let ratio = similarity(user, candidate);
    if contains_either(user, candidate) {
        ratio.max(HEURISTIC_SUBSTRING_FLOOR)
    } else {
        ratio
    }
}

// ============================================================================
// Tiered Track Confidence
// ============================================================================

/// Catalog-size-aware entry bars for the confidence tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveThresholds {
    pub perfect: usize,
    pub strong: usize,
    pub min_matches: usize,
    pub required_ratio: f64,
}

impl AdaptiveThresholds {
    /// Scale the absolute count requirements down for users with fewer
    /// than ten known tracks by this artist.
    pub fn for_catalog(total_user_tracks: usize) -> Self {
        let factor = (total_user_tracks as f64 / 10.0).min(1.0);
        let scaled = |n: f64, floor: usize| ((n * factor).round() as usize).max(floor);
        Self {
            perfect: scaled(3.0, 1),
            strong: scaled(5.0, 2),
            min_matches: scaled(3.0, 1),
            required_ratio: if total_user_tracks > 50 { 0.2 } else { 0.3 },
        }
    }
}

/// Convert track evidence into a confidence in [0, 0.95].
///
/// Tiers are tried in order and the first one whose bar is cleared wins:
///
/// | tier | condition | range |
/// |------|-----------|-------|
/// | a | perfect ≥ bar and ratio ≥ required | 0.90 – 0.95 |
/// | b | strong ≥ bar | 0.87 – 0.95 |
/// | c | matches ≥ bar, ratio > 0.3, avg > 0.85 | 0.85 – 0.90 |
/// | d | ≤ 5 user tracks, ≥ 1 match, avg ≥ 0.95 | 0.85 – 0.90 |
/// | e | any match | ≤ 0.75 |
///
/// Anything below 0.85 is insufficient evidence and defers to the
/// heuristic fallback.
pub fn tier_score(evidence: &MatchEvidence) -> f64 {
    let total = evidence.total_user_tracks;
    if total == 0 {
        return 0.0;
    }

    let bars = AdaptiveThresholds::for_catalog(total);
    let ratio = evidence.match_ratio();
    let avg = evidence.average_score_of_matches;

    // Tier a: perfect matches with enough coverage
    if evidence.perfect_match_count >= bars.perfect && ratio >= bars.required_ratio {
        let mut base = 0.90;
        let perfect_boost = (evidence.perfect_match_count as f64 * 0.01).min(0.05);
        if total < 5 && ratio >= 0.5 {
            base += 0.02;
        }
        return (base + perfect_boost).min(0.95);
    }

    // Tier b: many strong matches
    if evidence.strong_match_count >= bars.strong {
        let ratio_boost = (ratio * 0.08).min(0.08);
        return (0.87 + ratio_boost).min(0.95);
    }

    // Tier c: good coverage of high-quality matches
    if evidence.match_count >= bars.min_matches && ratio > 0.3 && avg > 0.85 {
        let quality_boost = (avg - 0.85) * 0.2;
        let coverage_boost = ((ratio - 0.3) * 0.071).min(0.05);
        return (0.85 + quality_boost + coverage_boost).min(0.90);
    }

    // Tier d: tiny catalog, near-exact matches
    if total <= 5 && evidence.match_count >= 1 && avg >= 0.95 {
        let quality_boost = (avg - 0.95) * 0.5;
        let ratio_boost = ratio * 0.05;
        return (0.85 + quality_boost + ratio_boost).min(0.90);
    }

    // Tier e: insufficient evidence, capped below the gate
    if evidence.match_count > 0 {
        return (avg * ratio * 0.8).min(0.75);
    }

    0.0
}

// ============================================================================
// TESTS
// ============================================================================
