//! Listening-history index with case-insensitive artist lookup.
//!
//! Built once from already-extracted history records and immutable after
//! construction, so a single index can be shared across verification
//! threads without locking.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::normalize::fold_key;

// ============================================================================
// Input Records
// ============================================================================

/// One listening-history row: (artist, track, album?, external id?).
///
/// Accepts the plain field names as well as the field names used by
/// streaming-history exports and scrobble dumps.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HistoryRecord {
    #[serde(
        default,
        alias = "artistName",
        alias = "master_metadata_album_artist_name"
    )]
    pub artist: Option<String>,
    #[serde(default, alias = "trackName", alias = "master_metadata_track_name")]
    pub track: Option<String>,
    #[serde(default, alias = "master_metadata_album_album_name")]
    pub album: Option<String>,
    #[serde(default, alias = "artist_mbid", alias = "mbid")]
    pub external_id: Option<String>,
}

impl HistoryRecord {
    pub fn new(artist: &str, track: &str) -> Self {
        Self {
            artist: Some(artist.to_string()),
            track: Some(track.to_string()),
            ..Self::default()
        }
    }

    pub fn with_album(mut self, album: &str) -> Self {
        self.album = Some(album.to_string());
        self
    }

    pub fn with_external_id(mut self, id: &str) -> Self {
        self.external_id = Some(id.to_string());
        self
    }
}

// ============================================================================
// Profile Index
// ============================================================================

/// Everything known about one artist from the user's history.
#[derive(Clone, Debug, Default)]
pub struct ArtistProfile {
    pub tracks: BTreeSet<String>,
    pub albums: BTreeSet<String>,
    pub external_id: Option<String>,
}

/// Two-level artist index: exact spelling first, case-folded spelling second.
///
/// Spellings that fold to the same key share one `ArtistProfile`, so
/// "YOASOBI" and "yoasobi" in the history are merged.
#[derive(Clone, Debug, Default)]
pub struct ProfileIndex {
    profiles: Vec<ArtistProfile>,
    /// Exact (trimmed) artist spelling → profile slot
    exact: FxHashMap<String, usize>,
    /// Case-folded artist name → profile slot
    folded: FxHashMap<String, usize>,
    id_count: usize,
}

static EMPTY: BTreeSet<String> = BTreeSet::new();

impl ProfileIndex {
    /// Build the index from history records. Rows without an artist are
    /// skipped; rows without a track can still contribute an album or id.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = HistoryRecord>,
    {
        let mut index = ProfileIndex::default();

        for record in records {
            let artist = match record.artist.as_deref().map(str::trim) {
                Some(a) if !a.is_empty() => a.to_string(),
                _ => continue,
            };
            let slot = index.slot_for(&artist);
            let profile = &mut index.profiles[slot];

            if let Some(track) = non_empty(record.track.as_deref()) {
                profile.tracks.insert(fold_key(track));
            }
            if let Some(album) = non_empty(record.album.as_deref()) {
                profile.albums.insert(fold_key(album));
            }
            if let Some(id) = non_empty(record.external_id.as_deref()) {
                if !id.eq_ignore_ascii_case("nan") {
                    profile.external_id = Some(id.to_string());
                }
            }
        }

        index.id_count = index
            .profiles
            .iter()
            .filter(|p| p.external_id.is_some())
            .count();

        tracing::info!(
            "Indexed listening history: {} artists, {} unique tracks, {} external ids",
            index.artist_count(),
            index.track_count(),
            index.id_count
        );

        index
    }

    fn slot_for(&mut self, artist: &str) -> usize {
        if let Some(&slot) = self.exact.get(artist) {
            return slot;
        }
        let folded = fold_key(artist);
        let slot = match self.folded.get(&folded) {
            Some(&slot) => slot,
            None => {
                self.profiles.push(ArtistProfile::default());
                let slot = self.profiles.len() - 1;
                self.folded.insert(folded, slot);
                slot
            }
        };
        self.exact.insert(artist.to_string(), slot);
        slot
    }

    /// Look up an artist: exact spelling first, then case-folded.
    pub fn profile(&self, artist: &str) -> Option<&ArtistProfile> {
        let artist = artist.trim();
        let slot = match self.exact.get(artist) {
            Some(&slot) => slot,
            None => {
                let slot = *self.folded.get(&fold_key(artist))?;
                tracing::debug!("Case-insensitive artist match for '{}'", artist);
                slot
            }
        };
        self.profiles.get(slot)
    }

    /// Tracks the user listened to by this artist (empty if unknown).
    pub fn tracks_for(&self, artist: &str) -> &BTreeSet<String> {
        self.profile(artist).map(|p| &p.tracks).unwrap_or(&EMPTY)
    }

    /// Albums the user listened to by this artist (empty if unknown).
    pub fn albums_for(&self, artist: &str) -> &BTreeSet<String> {
        self.profile(artist).map(|p| &p.albums).unwrap_or(&EMPTY)
    }

    pub fn external_id_for(&self, artist: &str) -> Option<&str> {
        self.profile(artist).and_then(|p| p.external_id.as_deref())
    }

    /// Whether the ingested history carried any external identifiers at all.
    pub fn has_external_ids(&self) -> bool {
        self.id_count > 0
    }

    pub fn artist_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn track_count(&self) -> usize {
        self.profiles.iter().map(|p| p.tracks.len()).sum()
    }

    pub fn id_count(&self) -> usize {
        self.id_count
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> ProfileIndex {
        ProfileIndex::from_records(vec![
            HistoryRecord::new("YOASOBI", "Idol").with_album("THE BOOK"),
            HistoryRecord::new("YOASOBI", "  Yoru ni Kakeru ").with_album("THE BOOK"),
            HistoryRecord::new("yoasobi", "Gunjo"),
            HistoryRecord::new("Luna", "Moon Song").with_external_id("abc-123"),
            HistoryRecord::new("", "Orphan"),
        ])
    }

    #[test]
    fn test_case_insensitive_tracks() {
        let index = sample_index();
        let upper = index.tracks_for("YOASOBI");
        let lower = index.tracks_for("Yoasobi");
        assert!(!upper.is_empty());
        assert_eq!(upper, lower);
        assert_eq!(upper.len(), 3);
        assert!(upper.contains("yoru ni kakeru"));
    }

    #[test]
    fn test_spellings_share_profile() {
        let index = sample_index();
        assert_eq!(index.artist_count(), 2);
        assert!(index.tracks_for("yoasobi").contains("idol"));
        assert!(index.tracks_for("YOASOBI").contains("gunjo"));
    }

    #[test]
    fn test_case_folded_spellings() {
        let index = ProfileIndex::from_records(vec![
            HistoryRecord::new("Straße", "Lied"),
            HistoryRecord::new("STRASSE", "Weg"),
            HistoryRecord::new("ΣΑΣ", "Song"),
        ]);
        assert_eq!(index.artist_count(), 2);
        assert_eq!(index.tracks_for("strasse").len(), 2);
        assert_eq!(index.tracks_for("Straße"), index.tracks_for("STRASSE"));
        assert!(index.tracks_for("σασ").contains("song"));
        assert!(index.tracks_for("Σας").contains("song"));
    }

    #[test]
    fn test_albums_and_ids() {
        let index = sample_index();
        assert_eq!(index.albums_for("yoasobi").len(), 1);
        assert!(index.albums_for("YOASOBI").contains("the book"));
        assert_eq!(index.external_id_for("LUNA"), Some("abc-123"));
        assert_eq!(index.external_id_for("YOASOBI"), None);
        assert!(index.has_external_ids());
        assert_eq!(index.id_count(), 1);
    }

    #[test]
    fn test_unknown_artist_is_empty() {
        let index = sample_index();
        assert!(index.tracks_for("Nobody").is_empty());
        assert!(index.albums_for("Nobody").is_empty());
        assert_eq!(index.external_id_for("Nobody"), None);
    }

    #[test]
    fn test_nan_identifier_ignored() {
        let index =
            ProfileIndex::from_records(vec![HistoryRecord::new("A", "t").with_external_id("nan")]);
        assert!(!index.has_external_ids());
        assert_eq!(index.external_id_for("A"), None);
    }

    #[test]
    fn test_export_field_names() {
        let records: Vec<HistoryRecord> = serde_json::from_str(
            r#"[
                {"master_metadata_album_artist_name": "Artist",
                 "master_metadata_track_name": "Song",
                 "master_metadata_album_album_name": "Album"},
                {"artistName": "Artist", "trackName": "Other Song"},
                {"artist": "Artist", "track": null, "artist_mbid": "id-1"}
            ]"#,
        )
        .unwrap();
        let index = ProfileIndex::from_records(records);
        assert_eq!(index.tracks_for("artist").len(), 2);
        assert!(index.albums_for("Artist").contains("album"));
        assert_eq!(index.external_id_for("Artist"), Some("id-1"));
    }
}
