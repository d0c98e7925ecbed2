//! Static candidate catalog.
//!
//! Holds pre-fetched search results and top tracks/albums so a batch can be
//! verified offline, e.g. from a JSON snapshot of earlier catalog lookups.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::models::CandidateProfile;
use crate::normalize::fold_key;
use crate::verify::{CandidateTrackSource, VerificationJob};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub candidates: Vec<CandidateProfile>,
}

/// Candidate lists per queried artist plus top tracks/albums per candidate
/// name.
///
/// ```json
/// {
///   "artists": { "YOASOBI": { "candidates": [{ "name": "YOASOBI", "listeners": 713328 }] } },
///   "top_tracks": { "YOASOBI": ["Idol", "Yoru ni Kakeru"] },
///   "top_albums": { "YOASOBI": ["THE BOOK"] }
/// }
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    pub artists: BTreeMap<String, CatalogEntry>,
    #[serde(default)]
    pub top_tracks: FxHashMap<String, Vec<String>>,
    #[serde(default)]
    pub top_albums: FxHashMap<String, Vec<String>>,
}

impl StaticCatalog {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// One job per queried artist, sorted by artist name.
    pub fn jobs(&self) -> Vec<VerificationJob> {
        self.artists
            .iter()
            .map(|(artist, entry)| VerificationJob {
                artist: artist.clone(),
                candidates: entry.candidates.clone(),
            })
            .collect()
    }

    /// Keep only the artists named in `filter` (case-insensitive).
    pub fn retain_artists(&mut self, filter: &[String]) {
        let wanted: Vec<String> = filter.iter().map(|a| fold_key(a)).collect();
        self.artists.retain(|artist, _| wanted.contains(&fold_key(artist)));
    }
}

impl CandidateTrackSource for StaticCatalog {
    fn top_tracks(&self, candidate: &CandidateProfile) -> Vec<String> {
        self.top_tracks.get(&candidate.name).cloned().unwrap_or_default()
    }

    fn top_albums(&self, candidate: &CandidateProfile) -> Vec<String> {
        self.top_albums.get(&candidate.name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "artists": {
            "YOASOBI": { "candidates": [
                { "name": "YOASOBI", "listeners": 713328, "url": "https://last.fm/music/YOASOBI" },
                { "name": "ヨアソビ", "listeners": "110" }
            ] },
            "*luna": { "candidates": [ { "name": "*luna", "listeners": 17154 } ] },
            "Nobody": {}
        },
        "top_tracks": { "YOASOBI": ["Idol", "Yoru ni Kakeru"] },
        "top_albums": { "YOASOBI": ["THE BOOK"] }
    }"#;

    #[test]
    fn test_parse_and_jobs() {
        let catalog = StaticCatalog::from_json_str(SAMPLE).unwrap();
        let jobs = catalog.jobs();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].artist, "*luna");
        assert!(jobs.iter().any(|j| j.artist == "Nobody" && j.candidates.is_empty()));
        let yoasobi = jobs.iter().find(|j| j.artist == "YOASOBI").unwrap();
        assert_eq!(yoasobi.candidates[1].listeners, 110);
    }

    #[test]
    fn test_source_lookup() {
        let catalog = StaticCatalog::from_json_str(SAMPLE).unwrap();
        let known = CandidateProfile::new("YOASOBI", 1);
        let unknown = CandidateProfile::new("ヨアソビ", 1);
        assert_eq!(catalog.top_tracks(&known).len(), 2);
        assert_eq!(catalog.top_albums(&known), vec!["THE BOOK".to_string()]);
        assert!(catalog.top_tracks(&unknown).is_empty());
    }

    #[test]
    fn test_retain_artists() {
        let mut catalog = StaticCatalog::from_json_str(SAMPLE).unwrap();
        catalog.retain_artists(&["yoasobi".to_string(), " NOBODY ".to_string()]);
        let names: Vec<String> = catalog.jobs().into_iter().map(|j| j.artist).collect();
        assert_eq!(names, vec!["Nobody".to_string(), "YOASOBI".to_string()]);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(StaticCatalog::from_json_str("{ not json").is_err());
    }
}
