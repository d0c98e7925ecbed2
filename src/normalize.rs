//! Title canonicalization for track/album matching.
//! Used by both the evidence gatherer and the heuristic scorer.
//!
//! CRITICAL: Every comparison in the cascade depends on these functions.
//! Run tests after changes; `canonicalize` must stay idempotent.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Release metadata suffixes: "(Live at ...)", "(Radio Edit)", "(Remix ...)",
/// "(feat. ...)", "- ... Remix", "- ... Version".
///
/// Kept as one alternation so the leftmost qualifier wins and swallows
/// everything after it.
pub static METADATA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*(?:\(live.*\)|\(radio edit\)|\(remix.*\)|\(feat\..*\)|-.*remix.*|-.*version.*)",
    )
    .unwrap()
});

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Full Unicode case folding: "Straße" → "strasse", "ΣΑΣ" → "σασ".
pub fn case_fold(s: &str) -> String {
    caseless::default_case_fold_str(s)
}

/// Apply compatibility normalization (NFKC), fold case, and trim.
/// e.g., "ＹＯＡＳＯＢＩ" → "yoasobi", "ｶﾞ" → "ガ"
pub fn normalize(title: &str) -> String {
    let folded = case_fold(&title.nfkc().collect::<String>());
    folded.trim().to_string()
}

/// Strip live/radio-edit/remix/feat./version qualifiers from a title.
///
/// Patterns are matched against the NFKC form so full-width brackets and
/// dashes are caught too. Replacement repeats until nothing more matches,
/// which keeps the operation stable when a removal splices a new qualifier
/// together.
pub fn clean_metadata(title: &str) -> String {
    let mut result: String = title.nfkc().collect();
    loop {
        let next = METADATA_PATTERN.replace_all(&result, "").to_string();
        if next == result {
            break;
        }
        result = next;
    }
    result.trim().to_string()
}

/// Full canonical form: strip metadata, then normalize.
pub fn canonicalize(title: &str) -> String {
    normalize(&clean_metadata(title))
}

/// Case-fold and trim, the form titles and artist keys are stored in.
pub fn fold_key(s: &str) -> String {
    case_fold(s.trim())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("  Idol  "), "idol");
        assert_eq!(normalize("ＹＯＡＳＯＢＩ"), "yoasobi");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_half_width_katakana() {
        assert_eq!(normalize("ﾖｱｿﾋﾞ"), "ヨアソビ");
    }

    #[test]
    fn test_clean_metadata() {
        assert_eq!(clean_metadata("Song (Live at Budokan)"), "Song");
        assert_eq!(clean_metadata("Song (Radio Edit)"), "Song");
        assert_eq!(clean_metadata("Song (Remix by Someone)"), "Song");
        assert_eq!(clean_metadata("Song (feat. Other)"), "Song");
        assert_eq!(clean_metadata("Song - Club Remix"), "Song");
        assert_eq!(clean_metadata("Song - Acoustic Version"), "Song");
        assert_eq!(clean_metadata("SONG (LIVE)"), "SONG");
    }

    #[test]
    fn test_clean_metadata_keeps_plain_titles() {
        assert_eq!(clean_metadata("夜に駆ける"), "夜に駆ける");
        assert_eq!(clean_metadata("Don't Stop Me Now"), "Don't Stop Me Now");
        assert_eq!(clean_metadata("(Untitled)"), "(Untitled)");
    }

    #[test]
    fn test_clean_metadata_full_width() {
        assert_eq!(clean_metadata("Song（Live）"), "Song");
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("Idol (Radio Edit)"), "idol");
        assert_eq!(canonicalize("  IDOL  "), "idol");
        assert_eq!(canonicalize(""), "");
    }

    #[test]
    fn test_canonicalize_idempotent() {
        let samples = [
            "Idol (Radio Edit)",
            "Song（Live）",
            "(rad(radio edit)io edit)",
            "A - B - Remix - Version",
            "ＳＯＮＧ (feat. X) - Extended Version",
            "Straße",
            "   ",
            "夜に駆ける (Live)",
            "Track -",
        ];
        for s in samples {
            let once = canonicalize(s);
            assert_eq!(canonicalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_fold_key() {
        assert_eq!(fold_key("  Hello World "), "hello world");
        assert_eq!(fold_key("Straße"), fold_key("STRASSE"));
        assert_eq!(fold_key("ΣΑΣ"), fold_key("σασ"));
    }

    #[test]
    fn test_full_case_folding() {
        assert_eq!(normalize("Straße"), "strasse");
        assert_eq!(canonicalize("STRASSE (Live)"), canonicalize("Straße"));
        assert_eq!(normalize("ΣΑΣ"), "σασ");
        assert_eq!(normalize("σας"), "σασ");
    }
}
