use serde::Deserialize;

/// One destination search result, kept only long enough to score it.
#[derive(Debug, Clone)]
pub struct CandidateTrack {
    pub uri: String,
    pub title: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
}

/// The destination playlist that tracks get inserted into.
#[derive(Debug, Clone)]
pub struct CreatedPlaylist {
    pub id: String,
    pub url: String,
}

// Wire shapes for the Spotify Web API.

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub tracks: Option<SearchTracks>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchTracks {
    #[serde(default)]
    pub items: Vec<ApiTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiTrack {
    pub uri: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<ApiArtist>,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiArtist {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUser {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPlaylist {
    pub id: String,
    pub external_urls: Option<ApiExternalUrls>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiExternalUrls {
    pub spotify: Option<String>,
}

impl ApiTrack {
    /// Candidates missing a URI or title are malformed and skipped, never fatal.
    pub(crate) fn into_candidate(self) -> Option<CandidateTrack> {
        let uri = self.uri?;
        let title = self.name.unwrap_or_default();
        if title.is_empty() {
            return None;
        }
        Some(CandidateTrack {
            uri,
            title,
            artists: self.artists.into_iter().filter_map(|a| a.name).collect(),
            duration_ms: self.duration_ms,
        })
    }
}
