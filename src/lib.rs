//! Artist identity verification library - shared modules for the CLI and callers.

pub mod catalog;
pub mod evidence;
pub mod heuristic;
pub mod index;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod safety;
pub mod scoring;
pub mod verify;

pub use heuristic::{HeuristicScorer, HeuristicWeights};
pub use index::{HistoryRecord, ProfileIndex};
pub use models::{
    CandidateProfile, MatchEvidence, MatchPair, VerificationMethod, VerificationResult,
    VerifyError,
};
pub use verify::{CandidateTrackSource, VerificationJob, Verifier};
