use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::error::{AppError, Result};
use crate::migrator::report::{BatchReport, PlaylistPreview, TransferOutcome};
use crate::netease::{PlaylistFetcher, PlaylistSource};
use crate::resolver::{MatchResult, Resolver, TrackSearch};
use crate::retry::{with_retries, RetryPolicy, Sleeper};
use crate::spotify::CreatedPlaylist;

/// The destination catalog's write surface, on top of its search surface.
/// Implemented by [`SpotifyClient`] and by in-memory fakes in tests.
///
/// [`SpotifyClient`]: crate::spotify::SpotifyClient
#[allow(async_fn_in_trait)]
pub trait Destination: TrackSearch {
    async fn current_user_id(&self) -> Result<String>;
    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<CreatedPlaylist>;
    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()>;
    async fn upload_cover(&self, playlist_id: &str, jpeg_base64: &str) -> Result<()>;
}

/// User-supplied overrides for one transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
}

pub struct PlaylistMigrator<'a, S, D> {
    source: &'a S,
    destination: &'a D,
    config: TransferConfig,
    sleeper: &'a dyn Sleeper,
    policy: RetryPolicy,
}

impl<'a, S: PlaylistSource, D: Destination> PlaylistMigrator<'a, S, D> {
    pub fn new(
        source: &'a S,
        destination: &'a D,
        config: TransferConfig,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        let policy = RetryPolicy {
            max_attempts: config.max_retries,
        };
        Self {
            source,
            destination,
            config,
            sleeper,
            policy,
        }
    }

    /// Drive one end-to-end migration. Fatal only on an unusable source
    /// playlist, a rejected credential at any step, or a failed playlist
    /// creation; every other failure degrades into the outcome's
    /// missing/warning lists.
    pub async fn transfer(
        &self,
        playlist_id: u64,
        options: &TransferOptions,
    ) -> Result<TransferOutcome> {
        let fetcher = PlaylistFetcher::new(self.source, &self.config, self.sleeper);
        let playlist = fetcher.fetch(playlist_id).await?;
        if playlist.tracks.is_empty() {
            return Err(AppError::NoTracks);
        }

        let user_id = self.destination.current_user_id().await?;

        let name = options
            .name
            .clone()
            .unwrap_or_else(|| format!("{} (NetEase)", playlist.title));
        let description = options.description.clone().unwrap_or_else(|| {
            format!(
                "Imported from NetEase Cloud Music on {}",
                Local::now().format("%Y-%m-%d")
            )
        });

        // No destination container means nothing can be transferred.
        let created = with_retries(&self.policy, self.sleeper, "create playlist", || {
            self.destination
                .create_playlist(&user_id, &name, &description, false)
        })
        .await?;

        let total_tracks = playlist.declared_track_count.max(playlist.tracks.len());
        let mut outcome = TransferOutcome::new(created.url.clone(), total_tracks);

        let mut tracks = playlist.tracks;
        if tracks.len() > self.config.max_playlist_size {
            let message = format!(
                "Destination caps playlists at {} tracks; dropping the last {}",
                self.config.max_playlist_size,
                tracks.len() - self.config.max_playlist_size
            );
            warn!("{}", message);
            outcome.warnings.push(message);
            tracks.truncate(self.config.max_playlist_size);
        }

        let uris = self.resolve_all(&tracks, &mut outcome).await?;

        for (index, chunk) in uris.chunks(self.config.insert_chunk_size).enumerate() {
            match with_retries(&self.policy, self.sleeper, "add tracks", || {
                self.destination.add_tracks(&created.id, chunk)
            })
            .await
            {
                Ok(()) => outcome.transferred.extend_from_slice(chunk),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    // Already-added chunks stay added; keep going.
                    warn!("Insert chunk {} failed: {}", index + 1, e);
                    outcome.warnings.push(format!(
                        "Failed to add chunk {} ({} tracks)",
                        index + 1,
                        chunk.len()
                    ));
                }
            }
        }

        let cover_ref = options.cover_url.clone().or(playlist.cover_url);
        if let Some(cover_ref) = cover_ref {
            if let Err(e) = self.transfer_cover(&created.id, &cover_ref).await {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("Cover upload failed: {}", e);
                outcome.warnings.push(format!("Cover upload failed: {}", e));
            }
        }

        outcome.calculate_success_rate();
        info!(
            "Transfer complete: {}/{} tracks ({:.1}% success rate)",
            outcome.transferred.len(),
            outcome.total_tracks,
            outcome.success_rate
        );

        Ok(outcome)
    }

    /// Resolve every track in source order, batched for rate-limit pacing.
    /// The pauses change timing only, never order or content.
    async fn resolve_all(
        &self,
        tracks: &[crate::netease::SourceTrack],
        outcome: &mut TransferOutcome,
    ) -> Result<Vec<String>> {
        let resolver = Resolver::new(&self.config, self.sleeper);
        let mut uris = Vec::new();

        let pb = ProgressBar::new(tracks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("#>-"),
        );

        let batch_count = tracks.len().div_ceil(self.config.search_batch_size);
        for (batch_index, batch) in tracks.chunks(self.config.search_batch_size).enumerate() {
            let mut matched = 0;
            for track in batch {
                let resolved = match resolver.resolve(track, self.destination).await {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        pb.finish_and_clear();
                        return Err(e);
                    }
                };
                match resolved {
                    MatchResult::Resolved(uri) => {
                        matched += 1;
                        uris.push(uri);
                    }
                    MatchResult::Unresolved(reason) => {
                        debug!("'{}' unresolved: {:?}", track.title, reason);
                        outcome.missing.push(track.title.clone());
                    }
                }
                pb.inc(1);
            }
            outcome.batch_reports.push(BatchReport {
                batch_index,
                attempted: batch.len(),
                matched,
            });
            if batch_index + 1 < batch_count {
                self.sleeper
                    .sleep(Duration::from_millis(self.config.batch_pause_ms))
                    .await;
            }
        }

        pb.finish_and_clear();
        Ok(uris)
    }

    /// Fetch, encode, and upload as one retried unit; a transient failure in
    /// any of the three gets a fresh attempt at all of them.
    async fn transfer_cover(&self, playlist_id: &str, cover_ref: &str) -> Result<()> {
        with_retries(&self.policy, self.sleeper, "cover transfer", || async move {
            let encoded = encode_cover(cover_ref).await?;
            self.destination.upload_cover(playlist_id, &encoded).await
        })
        .await
    }
}

/// Base64 JPEG payload for the destination's image-upload endpoint. Inline
/// data URIs already carry base64; remote references are fetched first.
async fn encode_cover(cover_ref: &str) -> Result<String> {
    if let Some(rest) = cover_ref.strip_prefix("data:") {
        return rest
            .split_once(',')
            .map(|(_, data)| data.to_string())
            .ok_or_else(|| AppError::SpotifyApi("malformed data URI for cover".into()));
    }

    let bytes = reqwest::get(cover_ref)
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    Ok(BASE64.encode(&bytes))
}

/// The read-only surface exposed upward: what a transfer would migrate.
pub async fn preview<S: PlaylistSource>(
    source: &S,
    config: &TransferConfig,
    sleeper: &dyn Sleeper,
    playlist_id: u64,
    preview_limit: usize,
) -> Result<PlaylistPreview> {
    let playlist = PlaylistFetcher::new(source, config, sleeper)
        .fetch(playlist_id)
        .await?;
    let total_tracks = playlist.declared_track_count.max(playlist.tracks.len());
    let mut tracks = playlist.tracks;
    tracks.truncate(preview_limit);

    Ok(PlaylistPreview {
        title: playlist.title,
        cover_url: playlist.cover_url,
        total_tracks,
        tracks,
    })
}
