//! Maps one source track to a destination track URI.
//!
//! Strategies run in a fixed order, cheapest and most precise first, each
//! trading precision for recall as source metadata diverges from the
//! destination catalog (translated titles, remix tags, alternate spellings).

use tracing::debug;

use crate::config::TransferConfig;
use crate::matcher::{duration_close, duration_gap_ms, text_similarity};
use crate::netease::SourceTrack;
use crate::normalize::{normalize_artist, normalize_title};
use crate::retry::{with_retries, RetryPolicy, Sleeper};
use crate::spotify::CandidateTrack;

use crate::error::Result;

/// Narrow limit for the precise quoted strategies.
const NARROW_LIMIT: u32 = 5;
/// Wider limit for the recall-oriented strategies.
const WIDE_LIMIT: u32 = 10;

/// The destination catalog's search surface. Implemented by
/// [`SpotifyClient`] and by in-memory fakes in tests.
///
/// [`SpotifyClient`]: crate::spotify::SpotifyClient
#[allow(async_fn_in_trait)]
pub trait TrackSearch {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<CandidateTrack>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The source track lacks a usable title or artist.
    MissingMetadata,
    /// No strategy produced any candidate.
    NoCandidates,
    /// Candidates existed but none passed the acceptance bar.
    BelowThreshold,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Resolved(String),
    Unresolved(UnresolvedReason),
}

impl MatchResult {
    pub fn is_resolved(&self) -> bool {
        matches!(self, MatchResult::Resolved(_))
    }
}

pub struct Resolver<'a> {
    config: &'a TransferConfig,
    sleeper: &'a dyn Sleeper,
    policy: RetryPolicy,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a TransferConfig, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            config,
            sleeper,
            policy: RetryPolicy {
                max_attempts: config.max_retries,
            },
        }
    }

    /// Run the strategy chain for one track, returning on the first hit.
    /// Fails only on a fatal error such as a rejected credential; transient
    /// search failures degrade into an unresolved result.
    pub async fn resolve<S: TrackSearch>(
        &self,
        track: &SourceTrack,
        search: &S,
    ) -> Result<MatchResult> {
        let title = track.title.trim();
        let primary = track
            .artists
            .first()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty());

        let Some(primary) = primary else {
            debug!("Track '{}' has no usable artist, skipping", track.title);
            return Ok(MatchResult::Unresolved(UnresolvedReason::MissingMetadata));
        };
        if title.is_empty() {
            return Ok(MatchResult::Unresolved(UnresolvedReason::MissingMetadata));
        }

        let mut had_candidates = false;

        // Strategy 1: exact quoted search with the raw title and primary artist.
        let query = format!(r#"track:"{}" artist:"{}""#, title, primary);
        let candidates = self.search_or_empty(search, &query, NARROW_LIMIT).await?;
        if let Some(uri) = self.closest_by_duration(&candidates, track) {
            debug!("Resolved '{}' by exact quoted search", title);
            return Ok(MatchResult::Resolved(uri));
        }

        // Strategy 2: quoted search over normalized strings.
        let norm_title = normalize_title(title);
        let norm_primary = normalize_artist(primary);
        if !norm_title.is_empty() && !norm_primary.is_empty() {
            let query = format!(r#"track:"{}" artist:"{}""#, norm_title, norm_primary);
            let candidates = self.search_or_empty(search, &query, NARROW_LIMIT).await?;
            if let Some(uri) = self.closest_by_duration(&candidates, track) {
                debug!("Resolved '{}' by normalized quoted search", title);
                return Ok(MatchResult::Resolved(uri));
            }
        }

        // Strategy 3: title-only search, artist left to the weighted score.
        if !norm_title.is_empty() {
            let query = format!(r#"track:"{}""#, norm_title);
            let candidates = self.search_or_empty(search, &query, WIDE_LIMIT).await?;
            had_candidates |= !candidates.is_empty();
            if let Some(uri) =
                self.pick_weighted(&candidates, track, &norm_title, 0.8, 0.2, true)
            {
                debug!("Resolved '{}' by title-only search", title);
                return Ok(MatchResult::Resolved(uri));
            }
        }

        // Strategy 4: retry the quoted search with each secondary artist.
        for artist in track.artists.iter().skip(1) {
            let artist = artist.trim();
            if artist.is_empty() {
                continue;
            }
            let query = format!(r#"track:"{}" artist:"{}""#, title, artist);
            let candidates = self.search_or_empty(search, &query, NARROW_LIMIT).await?;
            if let Some(uri) = self.closest_by_duration(&candidates, track) {
                debug!("Resolved '{}' via secondary artist '{}'", title, artist);
                return Ok(MatchResult::Resolved(uri));
            }
        }

        // Strategy 5: unquoted free-text search, weighted scoring.
        let query = format!("{} {}", title, primary);
        let candidates = self.search_or_empty(search, &query, WIDE_LIMIT).await?;
        had_candidates |= !candidates.is_empty();
        if let Some(uri) = self.pick_weighted(&candidates, track, &norm_title, 0.7, 0.3, false) {
            debug!("Resolved '{}' by free-text search", title);
            return Ok(MatchResult::Resolved(uri));
        }

        debug!("No match found for '{}'", title);
        let reason = if had_candidates {
            UnresolvedReason::BelowThreshold
        } else {
            UnresolvedReason::NoCandidates
        };
        Ok(MatchResult::Unresolved(reason))
    }

    async fn search_or_empty<S: TrackSearch>(
        &self,
        search: &S,
        query: &str,
        limit: u32,
    ) -> Result<Vec<CandidateTrack>> {
        match with_retries(&self.policy, self.sleeper, "track search", || {
            search.search(query, limit)
        })
        .await
        {
            Ok(candidates) => Ok(candidates),
            // A dead credential fails every strategy identically; stop here.
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                // The strategy simply yields nothing; the chain moves on.
                debug!("Search '{}' failed after retries: {}", query, e);
                Ok(Vec::new())
            }
        }
    }

    /// Pick the candidate with the closest duration if that gap is within
    /// tolerance, otherwise fall back to the search engine's top result.
    fn closest_by_duration(
        &self,
        candidates: &[CandidateTrack],
        track: &SourceTrack,
    ) -> Option<String> {
        let usable: Vec<&CandidateTrack> =
            candidates.iter().filter(|c| !c.title.is_empty()).collect();
        let closest = usable
            .iter()
            .min_by_key(|c| duration_gap_ms(c.duration_ms, track.duration_ms))?;

        if duration_close(
            closest.duration_ms,
            track.duration_ms,
            self.config.duration_tolerance_ms,
        ) {
            Some(closest.uri.clone())
        } else {
            usable.first().map(|c| c.uri.clone())
        }
    }

    /// Score candidates as `title_weight * title + artist_weight * artist`,
    /// returning the maximum if it clears the acceptance threshold. With
    /// `gate_title`, candidates below the title-similarity gate are discarded
    /// before scoring.
    fn pick_weighted(
        &self,
        candidates: &[CandidateTrack],
        track: &SourceTrack,
        norm_title: &str,
        title_weight: f64,
        artist_weight: f64,
        gate_title: bool,
    ) -> Option<String> {
        let mut best: Option<(f64, &CandidateTrack)> = None;

        for candidate in candidates {
            let cand_title = normalize_title(&candidate.title);
            if cand_title.is_empty() {
                continue;
            }
            let title_sim = text_similarity(norm_title, &cand_title);
            if gate_title && title_sim < self.config.title_gate {
                continue;
            }
            let artist_sim = best_artist_similarity(track, candidate);
            let score = title_weight * f64::from(title_sim) + artist_weight * f64::from(artist_sim);
            if best.is_none_or(|(s, _)| score > s) {
                best = Some((score, candidate));
            }
        }

        let (score, candidate) = best?;
        if score > self.config.accept_threshold {
            Some(candidate.uri.clone())
        } else {
            None
        }
    }
}

/// Max similarity over all source-artist x candidate-artist pairs. Artist
/// formatting differs wildly between catalogs, so only the best pairing counts.
fn best_artist_similarity(track: &SourceTrack, candidate: &CandidateTrack) -> u32 {
    let mut best = 0;
    for a in &track.artists {
        let a = normalize_artist(a);
        if a.is_empty() {
            continue;
        }
        for b in &candidate.artists {
            let b = normalize_artist(b);
            if b.is_empty() {
                continue;
            }
            best = best.max(text_similarity(&a, &b));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::retry::testing::RecordingSleeper;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeSearch {
        results: HashMap<String, Vec<CandidateTrack>>,
        queries: Mutex<Vec<String>>,
        always_fail: bool,
        fail_auth: bool,
    }

    impl FakeSearch {
        fn new() -> Self {
            Self {
                results: HashMap::new(),
                queries: Mutex::new(Vec::new()),
                always_fail: false,
                fail_auth: false,
            }
        }

        fn with(mut self, query: &str, candidates: Vec<CandidateTrack>) -> Self {
            self.results.insert(query.to_string(), candidates);
            self
        }

        fn query_count(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    impl TrackSearch for FakeSearch {
        async fn search(&self, query: &str, _limit: u32) -> Result<Vec<CandidateTrack>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail_auth {
                return Err(AppError::Auth("token revoked".into()));
            }
            if self.always_fail {
                return Err(AppError::SpotifyApi("search unavailable".into()));
            }
            Ok(self.results.get(query).cloned().unwrap_or_default())
        }
    }

    fn candidate(uri: &str, title: &str, artist: &str, duration_ms: u64) -> CandidateTrack {
        CandidateTrack {
            uri: uri.to_string(),
            title: title.to_string(),
            artists: vec![artist.to_string()],
            duration_ms,
        }
    }

    fn track(title: &str, artists: &[&str], duration_ms: u64) -> SourceTrack {
        SourceTrack {
            id: 1,
            title: title.to_string(),
            artists: artists.iter().map(|s| s.to_string()).collect(),
            duration_ms,
        }
    }

    fn resolver_parts() -> (TransferConfig, RecordingSleeper) {
        let config = TransferConfig {
            max_retries: 2,
            ..TransferConfig::default()
        };
        (config, RecordingSleeper::new())
    }

    #[tokio::test]
    async fn test_exact_quoted_match_resolves_in_first_pass() {
        let (config, sleeper) = resolver_parts();
        let search = FakeSearch::new().with(
            r#"track:"恋爱" artist:"周杰伦""#,
            vec![candidate("spotify:track:aaa", "恋爱", "周杰伦", 263_000)],
        );
        let resolver = Resolver::new(&config, &sleeper);

        let result = resolver.resolve(&track("恋爱", &["周杰伦"], 263_000), &search).await.unwrap();

        assert_eq!(result, MatchResult::Resolved("spotify:track:aaa".into()));
        // No fallback strategies were invoked.
        assert_eq!(search.query_count(), 1);
    }

    #[tokio::test]
    async fn test_duration_tiebreak_prefers_closest_within_tolerance() {
        let (config, sleeper) = resolver_parts();
        let search = FakeSearch::new().with(
            r#"track:"Song" artist:"A""#,
            vec![
                candidate("spotify:track:far", "Song", "A", 100_000),
                candidate("spotify:track:close", "Song", "A", 262_000),
            ],
        );
        let resolver = Resolver::new(&config, &sleeper);

        let result = resolver.resolve(&track("Song", &["A"], 260_000), &search).await.unwrap();

        assert_eq!(result, MatchResult::Resolved("spotify:track:close".into()));
    }

    #[tokio::test]
    async fn test_duration_tiebreak_falls_back_to_first_candidate() {
        let (config, sleeper) = resolver_parts();
        let search = FakeSearch::new().with(
            r#"track:"Song" artist:"A""#,
            vec![
                candidate("spotify:track:first", "Song", "A", 100_000),
                candidate("spotify:track:second", "Song", "A", 120_000),
            ],
        );
        let resolver = Resolver::new(&config, &sleeper);

        // Neither candidate is within 10s; the top result wins.
        let result = resolver.resolve(&track("Song", &["A"], 260_000), &search).await.unwrap();

        assert_eq!(result, MatchResult::Resolved("spotify:track:first".into()));
    }

    #[tokio::test]
    async fn test_normalized_search_catches_decorated_titles() {
        let (config, sleeper) = resolver_parts();
        // The raw title carries a live tag the catalog doesn't have.
        let search = FakeSearch::new().with(
            r#"track:"晴天" artist:"周杰伦""#,
            vec![candidate("spotify:track:bbb", "晴天", "周杰伦", 269_000)],
        );
        let resolver = Resolver::new(&config, &sleeper);

        let result = resolver
            .resolve(&track("晴天 (Live)", &["周杰伦"], 270_000), &search)
            .await
            .unwrap();

        assert_eq!(result, MatchResult::Resolved("spotify:track:bbb".into()));
        assert_eq!(search.query_count(), 2);
    }

    #[tokio::test]
    async fn test_title_only_strategy_accepts_above_threshold() {
        let (config, sleeper) = resolver_parts();
        // Title similarity 90, artist similarity 0: 0.8*90 + 0.2*0 = 72 > 65.
        let search = FakeSearch::new().with(
            r#"track:"aaaaaaaaaa""#,
            vec![candidate("spotify:track:ccc", "aaaaaaaaab", "qqq", 200_000)],
        );
        let resolver = Resolver::new(&config, &sleeper);

        let result = resolver
            .resolve(&track("aaaaaaaaaa", &["zzz"], 200_000), &search)
            .await
            .unwrap();

        assert_eq!(result, MatchResult::Resolved("spotify:track:ccc".into()));
    }

    #[tokio::test]
    async fn test_title_only_strategy_gates_low_title_similarity() {
        let (config, sleeper) = resolver_parts();
        // Title similarity 70 fails the 80 gate regardless of artist score.
        let search = FakeSearch::new().with(
            r#"track:"aaaaaaaaaa""#,
            vec![candidate("spotify:track:ddd", "aaaaaaabbb", "zzz", 200_000)],
        );
        let resolver = Resolver::new(&config, &sleeper);

        let result = resolver
            .resolve(&track("aaaaaaaaaa", &["zzz"], 200_000), &search)
            .await
            .unwrap();

        assert_eq!(
            result,
            MatchResult::Unresolved(UnresolvedReason::BelowThreshold)
        );
    }

    #[tokio::test]
    async fn test_secondary_artist_strategy() {
        let (config, sleeper) = resolver_parts();
        let search = FakeSearch::new().with(
            r#"track:"Duet" artist:"B""#,
            vec![candidate("spotify:track:eee", "Duet", "B", 180_000)],
        );
        let resolver = Resolver::new(&config, &sleeper);

        let result = resolver.resolve(&track("Duet", &["A", "B"], 180_000), &search).await.unwrap();

        assert_eq!(result, MatchResult::Resolved("spotify:track:eee".into()));
        let queries = search.queries.lock().unwrap();
        assert!(queries.last().unwrap().contains(r#"artist:"B""#));
    }

    #[tokio::test]
    async fn test_free_text_strategy_picks_best_weighted_score() {
        let (config, sleeper) = resolver_parts();
        let search = FakeSearch::new().with(
            "hello world abba",
            vec![
                candidate("spotify:track:poor", "different thing", "nobody", 180_000),
                candidate("spotify:track:best", "Hello World", "ABBA", 180_000),
            ],
        );
        let resolver = Resolver::new(&config, &sleeper);

        let result = resolver
            .resolve(&track("hello world", &["abba"], 180_000), &search)
            .await
            .unwrap();

        assert_eq!(result, MatchResult::Resolved("spotify:track:best".into()));
    }

    #[tokio::test]
    async fn test_missing_artist_metadata_short_circuits() {
        let (config, sleeper) = resolver_parts();
        let search = FakeSearch::new();
        let resolver = Resolver::new(&config, &sleeper);

        let result = resolver.resolve(&track("Orphan", &[], 180_000), &search).await.unwrap();

        assert_eq!(
            result,
            MatchResult::Unresolved(UnresolvedReason::MissingMetadata)
        );
        assert_eq!(search.query_count(), 0);
    }

    #[tokio::test]
    async fn test_search_errors_degrade_to_no_candidates() {
        let (config, sleeper) = resolver_parts();
        let mut search = FakeSearch::new();
        search.always_fail = true;
        let resolver = Resolver::new(&config, &sleeper);

        let result = resolver.resolve(&track("Song", &["A"], 180_000), &search).await.unwrap();

        assert_eq!(
            result,
            MatchResult::Unresolved(UnresolvedReason::NoCandidates)
        );
    }

    #[tokio::test]
    async fn test_revoked_token_is_fatal_not_unresolved() {
        let (config, sleeper) = resolver_parts();
        let mut search = FakeSearch::new();
        search.fail_auth = true;
        let resolver = Resolver::new(&config, &sleeper);

        let result = resolver.resolve(&track("Song", &["A"], 180_000), &search).await;

        assert!(matches!(result, Err(AppError::Auth(_))));
        // The dead token is neither retried nor re-queried by later strategies.
        assert_eq!(search.query_count(), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_candidates_anywhere() {
        let (config, sleeper) = resolver_parts();
        let search = FakeSearch::new();
        let resolver = Resolver::new(&config, &sleeper);

        let result = resolver.resolve(&track("Song", &["A"], 180_000), &search).await.unwrap();

        assert_eq!(
            result,
            MatchResult::Unresolved(UnresolvedReason::NoCandidates)
        );
        // Strategies 1, 2, 3, 5 each issued one query; no secondary artists.
        assert_eq!(search.query_count(), 4);
    }
}
