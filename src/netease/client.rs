use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{AppError, Result};
use crate::netease::fetcher::PlaylistSource;
use crate::netease::models::{DetailResponse, PlaylistDetail, SongsResponse, SourceTrack};

const NETEASE_API_BASE: &str = "https://music.163.com/api";

/// NetEase rejects requests without browser-ish headers.
const USER_AGENT: &str = "Mozilla/5.0";
const REFERER: &str = "https://music.163.com/";

/// Parse a NetEase playlist URL and extract the playlist ID.
/// Supports formats:
/// - https://music.163.com/#/playlist?id=24381616
/// - https://music.163.com/playlist?id=24381616&userid=...
/// - a bare numeric ID
pub fn parse_playlist_url(input: &str) -> Result<u64> {
    let trimmed = input.trim();

    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed
            .parse()
            .map_err(|_| AppError::InvalidPlaylistUrl(input.to_string()));
    }

    // The web player puts the route behind a fragment ("#/playlist?id=..."),
    // which hides the query from the URL parser.
    let cleaned = trimmed.replace("#/", "");
    let url =
        Url::parse(&cleaned).map_err(|_| AppError::InvalidPlaylistUrl(input.to_string()))?;

    url.query_pairs()
        .find(|(key, _)| key == "id")
        .and_then(|(_, value)| value.parse().ok())
        .ok_or_else(|| AppError::InvalidPlaylistUrl(input.to_string()))
}

pub struct NeteaseClient {
    http_client: Client,
}

impl NeteaseClient {
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Referer", REFERER)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::NeteaseApi(format!(
                "request to {} failed with status {}",
                url,
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    fn check_code(code: i64, what: &str) -> Result<()> {
        if code != 200 {
            return Err(AppError::NeteaseApi(format!("{} returned code {}", what, code)));
        }
        Ok(())
    }

    async fn songs_from(&self, url: &str, what: &str) -> Result<Vec<SourceTrack>> {
        let response: SongsResponse = self.get_json(url).await?;
        Self::check_code(response.code, what)?;
        Ok(response
            .songs
            .into_iter()
            .filter_map(|raw| raw.into_source())
            .collect())
    }
}

impl Default for NeteaseClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaylistSource for NeteaseClient {
    async fn playlist_detail(&self, playlist_id: u64) -> Result<PlaylistDetail> {
        let url = format!("{}/v6/playlist/detail?id={}", NETEASE_API_BASE, playlist_id);
        let response: DetailResponse = self.get_json(&url).await?;
        Self::check_code(response.code, "playlist detail")?;

        let playlist = response
            .playlist
            .or(response.result)
            .ok_or_else(|| AppError::NeteaseApi("detail response without playlist".into()))?;

        debug!(
            "Playlist {}: {} declared track IDs",
            playlist_id,
            playlist.track_ids.len()
        );

        Ok(PlaylistDetail {
            title: playlist.name,
            cover_url: playlist.cover_img_url,
            track_ids: playlist.track_ids.into_iter().map(|t| t.id).collect(),
        })
    }

    async fn track_page(
        &self,
        playlist_id: u64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SourceTrack>> {
        let url = format!(
            "{}/playlist/track/all?id={}&limit={}&offset={}",
            NETEASE_API_BASE, playlist_id, limit, offset
        );
        self.songs_from(&url, "track page").await
    }

    async fn tracks_by_id(&self, ids: &[u64]) -> Result<Vec<SourceTrack>> {
        let c: Vec<String> = ids.iter().map(|id| format!("{{\"id\":{}}}", id)).collect();
        let url = format!(
            "{}/v3/song/detail?c=[{}]",
            NETEASE_API_BASE,
            urlencoding::encode(&c.join(","))
        );
        self.songs_from(&url, "song detail").await
    }

    async fn tracks_by_id_fallback(&self, ids: &[u64]) -> Result<Vec<SourceTrack>> {
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/song/detail?ids=[{}]", NETEASE_API_BASE, joined);
        self.songs_from(&url, "song detail (fallback)").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_web_player_url() {
        let id = parse_playlist_url("https://music.163.com/#/playlist?id=24381616").unwrap();
        assert_eq!(id, 24381616);
    }

    #[test]
    fn test_parse_plain_url_with_extra_params() {
        let id =
            parse_playlist_url("https://music.163.com/playlist?id=24381616&userid=99").unwrap();
        assert_eq!(id, 24381616);
    }

    #[test]
    fn test_parse_bare_id() {
        assert_eq!(parse_playlist_url("24381616").unwrap(), 24381616);
        assert_eq!(parse_playlist_url("  24381616  ").unwrap(), 24381616);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_playlist_url("not a url"),
            Err(AppError::InvalidPlaylistUrl(_))
        ));
        assert!(matches!(
            parse_playlist_url("https://music.163.com/#/playlist"),
            Err(AppError::InvalidPlaylistUrl(_))
        ));
        assert!(matches!(
            parse_playlist_url(""),
            Err(AppError::InvalidPlaylistUrl(_))
        ));
    }
}
