use reqwest::Client;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::migrator::Destination;
use crate::resolver::TrackSearch;
use crate::spotify::models::{
    ApiPlaylist, ApiUser, CandidateTrack, CreatedPlaylist, SearchResponse,
};

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Thin wrapper over the Spotify Web API, driven by a user-supplied bearer
/// token. The OAuth dance happens outside this program.
pub struct SpotifyClient {
    http_client: Client,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(access_token: &str) -> Self {
        Self {
            http_client: Client::new(),
            access_token: access_token.to_string(),
        }
    }
}

impl TrackSearch for SpotifyClient {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<CandidateTrack>> {
        let limit = limit.to_string();
        let response = self
            .http_client
            .get(format!("{}/search", SPOTIFY_API_BASE))
            .bearer_auth(&self.access_token)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Auth("Spotify token rejected".into()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::SpotifyApi(format!(
                "search failed ({}): {}",
                status, error_text
            )));
        }

        let search_response: SearchResponse = response.json().await?;
        Ok(search_response
            .tracks
            .map(|t| t.items)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| t.into_candidate())
            .collect())
    }
}

impl Destination for SpotifyClient {
    async fn current_user_id(&self) -> Result<String> {
        let response = self
            .http_client
            .get(format!("{}/me", SPOTIFY_API_BASE))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Auth(format!(
                "Spotify token rejected (status {})",
                response.status()
            )));
        }

        let user: ApiUser = response.json().await?;
        Ok(user.id)
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<CreatedPlaylist> {
        let response = self
            .http_client
            .post(format!("{}/users/{}/playlists", SPOTIFY_API_BASE, user_id))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "name": name,
                "public": public,
                "description": description,
            }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Auth("Spotify token rejected".into()));
        }
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::SpotifyApi(format!(
                "failed to create playlist: {}",
                error_text
            )));
        }

        let playlist: ApiPlaylist = response.json().await?;
        let url = playlist
            .external_urls
            .and_then(|u| u.spotify)
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", playlist.id));

        info!("Created Spotify playlist: {}", name);

        Ok(CreatedPlaylist {
            id: playlist.id,
            url,
        })
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        if uris.is_empty() {
            return Ok(());
        }

        let response = self
            .http_client
            .post(format!(
                "{}/playlists/{}/tracks",
                SPOTIFY_API_BASE, playlist_id
            ))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "uris": uris }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Auth("Spotify token rejected".into()));
        }
        if response.status().is_success() {
            info!("Added {} tracks to playlist", uris.len());
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Failed to add tracks to playlist: {}", error_text);
            Err(AppError::SpotifyApi(format!(
                "failed to add tracks: {}",
                error_text
            )))
        }
    }

    async fn upload_cover(&self, playlist_id: &str, jpeg_base64: &str) -> Result<()> {
        let response = self
            .http_client
            .put(format!(
                "{}/playlists/{}/images",
                SPOTIFY_API_BASE, playlist_id
            ))
            .bearer_auth(&self.access_token)
            .header("Content-Type", "image/jpeg")
            .body(jpeg_base64.to_string())
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Auth("Spotify token rejected".into()));
        }
        if response.status().is_success() {
            info!("Uploaded playlist cover image");
            Ok(())
        } else {
            Err(AppError::SpotifyApi(format!(
                "cover upload failed with status {}",
                response.status()
            )))
        }
    }
}
