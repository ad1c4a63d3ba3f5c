use strsim::normalized_levenshtein;

/// Similarity between two already-normalized strings, 0..=100.
/// Symmetric; 100 iff the strings are identical.
pub fn text_similarity(a: &str, b: &str) -> u32 {
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    (normalized_levenshtein(a, b) * 100.0).round() as u32
}

/// Whether two track durations are close enough to count as a strong match.
pub fn duration_close(a_ms: u64, b_ms: u64, tolerance_ms: u64) -> bool {
    a_ms.abs_diff(b_ms) < tolerance_ms
}

/// Absolute duration gap, used to pick the closest candidate.
pub fn duration_gap_ms(a_ms: u64, b_ms: u64) -> u64 {
    a_ms.abs_diff(b_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_scores_100() {
        assert_eq!(text_similarity("dont stop me now", "dont stop me now"), 100);
        assert_eq!(text_similarity("恋爱", "恋爱"), 100);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("bohemian rhapsody", "bohemian rapsody"),
            ("yellow", "mellow"),
            ("a", "completely different"),
        ];
        for (a, b) in pairs {
            assert_eq!(text_similarity(a, b), text_similarity(b, a));
        }
    }

    #[test]
    fn test_decreases_with_edit_distance() {
        let base = "stairway to heaven";
        let close = text_similarity(base, "stairway to heavan");
        let far = text_similarity(base, "highway to hell");
        assert!(close > far);
        assert!(close < 100);
    }

    #[test]
    fn test_different_strings_below_100() {
        assert!(text_similarity("yellow", "mellow") < 100);
    }

    #[test]
    fn test_duration_close_boundary() {
        assert!(duration_close(200_000, 209_999, 10_000));
        assert!(!duration_close(200_000, 210_000, 10_000));
        assert!(duration_close(210_000, 200_001, 10_000));
    }

    #[test]
    fn test_duration_gap() {
        assert_eq!(duration_gap_ms(180_000, 183_000), 3_000);
        assert_eq!(duration_gap_ms(183_000, 180_000), 3_000);
    }
}
