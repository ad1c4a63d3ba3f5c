//! Reconstructs a complete, ordered track list from an upstream that
//! truncates, paginates, and occasionally stalls.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::error::Result;
use crate::netease::models::{PlaylistDetail, SourcePlaylist, SourceTrack};
use crate::retry::{with_retries, RetryPolicy, Sleeper};

/// The source catalog's read surface. Implemented by [`NeteaseClient`] and by
/// in-memory fakes in tests.
///
/// [`NeteaseClient`]: crate::netease::NeteaseClient
#[allow(async_fn_in_trait)]
pub trait PlaylistSource {
    async fn playlist_detail(&self, playlist_id: u64) -> Result<PlaylistDetail>;
    async fn track_page(
        &self,
        playlist_id: u64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SourceTrack>>;
    async fn tracks_by_id(&self, ids: &[u64]) -> Result<Vec<SourceTrack>>;
    async fn tracks_by_id_fallback(&self, ids: &[u64]) -> Result<Vec<SourceTrack>>;
}

pub struct PlaylistFetcher<'a, S> {
    source: &'a S,
    config: &'a TransferConfig,
    sleeper: &'a dyn Sleeper,
    policy: RetryPolicy,
}

impl<'a, S: PlaylistSource> PlaylistFetcher<'a, S> {
    pub fn new(source: &'a S, config: &'a TransferConfig, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            source,
            config,
            sleeper,
            policy: RetryPolicy {
                max_attempts: config.max_retries,
            },
        }
    }

    /// Return as complete a playlist as the upstream allows. Escalates through
    /// paginated bulk fetch, then ID backfill, then settles for whatever was
    /// accumulated. Only a failing detail call is fatal; everything past it
    /// degrades to a partial result.
    pub async fn fetch(&self, playlist_id: u64) -> Result<SourcePlaylist> {
        let detail = with_retries(&self.policy, self.sleeper, "playlist detail", || {
            self.source.playlist_detail(playlist_id)
        })
        .await?;
        let declared = &detail.track_ids;

        let mut tracks = self.fetch_paged(playlist_id).await;
        info!(
            "Bulk fetch returned {} tracks ({} declared)",
            tracks.len(),
            declared.len()
        );

        if tracks.len() < declared.len() {
            let have: HashSet<u64> = tracks.iter().map(|t| t.id).collect();
            let missing: Vec<u64> = declared
                .iter()
                .copied()
                .filter(|id| !have.contains(id))
                .collect();
            info!("Backfilling {} tracks by ID", missing.len());
            tracks.extend(self.backfill(&missing).await);
        }

        if !declared.is_empty() {
            tracks = restore_declared_order(tracks, declared);
        }

        if tracks.len() < declared.len() {
            warn!(
                "Playlist {} incomplete: retrieved {} of {} tracks",
                playlist_id,
                tracks.len(),
                declared.len()
            );
        }

        Ok(SourcePlaylist {
            title: detail.title,
            cover_url: detail.cover_url,
            declared_track_count: declared.len(),
            tracks,
        })
    }

    /// Strategy 1: walk the bulk endpoint at increasing offsets. Stops on a
    /// short page (end of list, or the API's silent cap around 800 tracks) or
    /// when a page adds nothing new (stalled or rate-limited upstream).
    async fn fetch_paged(&self, playlist_id: u64) -> Vec<SourceTrack> {
        let page_size = self.config.fetch_page_size;
        let mut all: Vec<SourceTrack> = Vec::new();
        let mut seen: HashSet<u64> = HashSet::new();
        let mut offset = 0;

        loop {
            let page = match with_retries(&self.policy, self.sleeper, "track page", || {
                self.source.track_page(playlist_id, page_size, offset)
            })
            .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!("Giving up on track page at offset {}: {}", offset, e);
                    break;
                }
            };

            let full_page = page.len() >= page_size;
            offset += page.len();

            let before = all.len();
            for track in page {
                if seen.insert(track.id) {
                    all.push(track);
                }
            }
            if all.len() == before {
                debug!("Track total stalled at {}, stopping pagination", all.len());
                break;
            }
            if !full_page {
                break;
            }
        }

        all
    }

    /// Strategy 2: direct lookups for the declared IDs the bulk endpoint never
    /// produced. A chunk that exhausts retries is skipped, not fatal.
    async fn backfill(&self, missing: &[u64]) -> Vec<SourceTrack> {
        let mut recovered = Vec::new();

        for chunk in missing.chunks(self.config.id_lookup_chunk) {
            let tracks = match with_retries(&self.policy, self.sleeper, "song detail", || {
                self.source.tracks_by_id(chunk)
            })
            .await
            {
                Ok(tracks) if !tracks.is_empty() => tracks,
                Ok(_) => {
                    debug!("Primary ID lookup empty for chunk, trying fallback route");
                    match with_retries(&self.policy, self.sleeper, "song detail fallback", || {
                        self.source.tracks_by_id_fallback(chunk)
                    })
                    .await
                    {
                        Ok(tracks) => tracks,
                        Err(e) => {
                            warn!("Skipping chunk of {} tracks: {}", chunk.len(), e);
                            continue;
                        }
                    }
                }
                Err(e) => {
                    warn!("Skipping chunk of {} tracks: {}", chunk.len(), e);
                    continue;
                }
            };
            recovered.extend(tracks);
        }

        recovered
    }
}

/// Reorder fetched tracks to the declared ID-list order. Tracks the upstream
/// never declared (API quirk) are appended in fetch order.
fn restore_declared_order(tracks: Vec<SourceTrack>, declared: &[u64]) -> Vec<SourceTrack> {
    let mut by_id: HashMap<u64, SourceTrack> = HashMap::with_capacity(tracks.len());
    let mut extras = Vec::new();
    let declared_set: HashSet<u64> = declared.iter().copied().collect();

    for track in tracks {
        if declared_set.contains(&track.id) {
            by_id.entry(track.id).or_insert(track);
        } else {
            extras.push(track);
        }
    }

    let mut ordered: Vec<SourceTrack> = declared
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect();
    ordered.extend(extras);
    ordered
}
