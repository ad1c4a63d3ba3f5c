//! Canonicalization of track and artist strings before any scoring.
//!
//! Both sides of every comparison must go through the same function here;
//! scoring a raw string against a normalized one is a bug.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Bracketed segments, ASCII and CJK glyphs: "Song (Remix)", "歌【现场】".
static PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[\(（【][^\]\)）】]*[\]\)）】]").unwrap());

/// Trailing feature credits: "feat. X", "ft. X", "featuring X", "with X",
/// and CJK equivalents. CJK titles carry no word spacing, so the CJK
/// alternatives match without surrounding whitespace.
static FEAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\s+(?:feat\.?|ft\.?|featuring|with)\s+|\s*(?:伴唱|合唱)\s*).*$").unwrap()
});

/// Version/edition markers. Suffix-anchored: once a marker is found, it and
/// everything after it is discarded.
static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\s*[-–—]\s*live\b|\b(?:acoustic|piano|instrumental|demo|radio)\s+version\b|\bremaster(?:ed)?\b|\bremix\b|\blive\s+(?:at|from|in)\b|现场|伴奏|纯音乐|live版).*$",
    )
    .unwrap()
});

static PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Canonicalize a track title for matching. Total; empty in, empty out.
pub fn normalize_title(s: &str) -> String {
    let s: String = s.nfkd().collect();
    let s = PAREN_RE.replace_all(&s, "");
    let s = FEAT_RE.replace(&s, "");
    let s = VERSION_RE.replace(&s, "");
    finish(&s)
}

/// Canonicalize an artist name. Same pipeline as titles minus the
/// version-marker pass, which only makes sense for titles.
pub fn normalize_artist(s: &str) -> String {
    let s: String = s.nfkd().collect();
    let s = PAREN_RE.replace_all(&s, "");
    let s = FEAT_RE.replace(&s, "");
    finish(&s)
}

fn finish(s: &str) -> String {
    let s = PUNCT_RE.replace_all(s, "");
    SPACE_RE.replace_all(&s, " ").trim().to_lowercase()
}
