//! Core data models for artist verification.
//!
//! This module contains the candidate profile, evidence, and result types
//! shared by every stage of the verification cascade.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by the verification engine.
///
/// Low confidence is never an error; a verification call only fails when
/// there is nothing to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("no candidates provided for artist '{artist}'")]
    EmptyCandidateList { artist: String },

    #[error("invalid heuristic weights: {reason}")]
    InvalidWeights { reason: String },
}

// ============================================================================
// Candidate Models
// ============================================================================

/// External search result for an artist name (one per catalog hit).
///
/// Deserialization is lenient: a missing name or URL becomes an empty string
/// and a listener count that is not a number becomes 0.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_listeners")]
    pub listeners: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    /// Catalog identity (e.g. a MusicBrainz ID). Empty strings are dropped.
    #[serde(
        default,
        alias = "mbid",
        deserialize_with = "lenient_identifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_id: Option<String>,
}

impl CandidateProfile {
    pub fn new(name: impl Into<String>, listeners: u64) -> Self {
        Self {
            name: name.into(),
            listeners,
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        let id = id.trim();
        self.external_id = (!id.is_empty()).then(|| id.to_string());
        self
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_string(deserializer)?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

fn lenient_listeners<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_listeners(&value))
}

/// Interpret a raw listener count. Negative, fractional garbage and
/// non-numeric strings all degrade to 0.
pub fn parse_listeners(value: &serde_json::Value) -> u64 {
    let parsed = match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64)),
        serde_json::Value::String(s) => {
            let s = s.trim().replace(',', "");
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| *f > 0.0).map(|f| f as u64))
        }
        _ => None,
    };
    match parsed {
        Some(n) => n,
        None => {
            if !value.is_null() {
                tracing::warn!("Invalid listener count {}, treating as 0", value);
            }
            0
        }
    }
}

// ============================================================================
// Evidence Models
// ============================================================================

/// A user track paired with its best-matching candidate track, both in the
/// form they were compared in (canonical for track evidence).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchPair {
    pub user_track: String,
    pub candidate_track: String,
    pub similarity: f64,
}

/// Aggregate track-matching evidence for one (artist, candidate) pair.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchEvidence {
    pub total_user_tracks: usize,
    pub match_count: usize,
    /// Matches with similarity in (0.90, 0.98]
    pub strong_match_count: usize,
    /// Matches with similarity > 0.98
    pub perfect_match_count: usize,
    pub average_score_of_matches: f64,
    pub best_match_score: f64,
    pub matched_pairs: Vec<MatchPair>,
}

impl MatchEvidence {
    /// Evidence with no matches against `total_user_tracks` known tracks.
    pub fn empty(total_user_tracks: usize) -> Self {
        Self {
            total_user_tracks,
            ..Self::default()
        }
    }

    /// Fraction of user tracks that found an acceptable match.
    pub fn match_ratio(&self) -> f64 {
        if self.total_user_tracks == 0 {
            0.0
        } else {
            (self.match_count as f64 / self.total_user_tracks as f64).min(1.0)
        }
    }
}

// ============================================================================
// Result Models
// ============================================================================

/// Which tier of the cascade produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationMethod {
    IdentifierMatch,
    StrongTrackMatch,
    TrackBased,
    HeuristicBased,
}

impl VerificationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationMethod::IdentifierMatch => "IDENTIFIER_MATCH",
            VerificationMethod::StrongTrackMatch => "STRONG_TRACK_MATCH",
            VerificationMethod::TrackBased => "TRACK_BASED",
            VerificationMethod::HeuristicBased => "HEURISTIC_BASED",
        }
    }
}

impl std::fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-factor scores for one candidate from the heuristic fallback.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total: f64,
    pub track: f64,
    pub album: f64,
    pub name: f64,
    pub listeners: f64,
    pub listener_count: u64,
    pub track_matches: Vec<MatchPair>,
}

/// Structured audit trail attached to every result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DebugInfo {
    IdentifierMatch { user_id: String, matched_id: String },
    StrongTrackEvidence { evidence: MatchEvidence },
    Heuristic { breakdown: ScoreBreakdown },
}

/// Outcome of verifying one artist name against its candidates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub artist_name: String,
    pub chosen_profile: CandidateProfile,
    pub confidence_score: f64,
    pub verification_method: VerificationMethod,
    pub all_candidates: Vec<CandidateProfile>,
    pub track_matches: Vec<MatchPair>,
    pub debug_info: DebugInfo,
}
