/// Tuning values for one migration run. Immutable once constructed; tests
/// override individual fields instead of mutating globals.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Page size for the NetEase bulk-track endpoint.
    pub fetch_page_size: usize,
    /// Chunk size for batch-by-ID backfill requests.
    pub id_lookup_chunk: usize,
    /// How many tracks to resolve between pacing pauses.
    pub search_batch_size: usize,
    /// Pause between search batches, for rate limiting.
    pub batch_pause_ms: u64,
    /// Spotify caps track-insert calls at 100 URIs.
    pub insert_chunk_size: usize,
    /// Spotify caps playlists at 10,000 tracks.
    pub max_playlist_size: usize,
    /// Minimum normalized-title similarity for title-only search results.
    pub title_gate: u32,
    /// Weighted-score acceptance threshold for fuzzy strategies.
    pub accept_threshold: f64,
    /// Durations closer than this are considered a strong match.
    pub duration_tolerance_ms: u64,
    /// Retry attempts per network call before giving up on it.
    pub max_retries: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            fetch_page_size: 1000,
            id_lookup_chunk: 200,
            search_batch_size: 50,
            batch_pause_ms: 1000,
            insert_chunk_size: 100,
            max_playlist_size: 10_000,
            title_gate: 80,
            accept_threshold: 65.0,
            duration_tolerance_ms: 10_000,
            max_retries: 3,
        }
    }
}
