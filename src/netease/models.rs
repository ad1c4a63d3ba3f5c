use serde::Deserialize;

/// One track as retrieved from NetEase. Artists preserve source order, primary
/// first; the list may be empty when the upstream metadata is broken, in which
/// case the resolver reports the track as unresolved.
#[derive(Debug, Clone)]
pub struct SourceTrack {
    pub id: u64,
    pub title: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
}

/// A fully reconstructed source playlist, owned by one migration run.
#[derive(Debug, Clone)]
pub struct SourcePlaylist {
    pub title: String,
    pub cover_url: Option<String>,
    /// Length of the upstream track-ID list. Advisory; may exceed what the
    /// fetcher could actually retrieve.
    pub declared_track_count: usize,
    pub tracks: Vec<SourceTrack>,
}

/// Playlist metadata and the declared track-ID list, from the detail endpoint.
#[derive(Debug, Clone)]
pub struct PlaylistDetail {
    pub title: String,
    pub cover_url: Option<String>,
    pub track_ids: Vec<u64>,
}

// Wire shapes. The v6 API uses "ar"/"dt", older routes use "artists"/"duration".

#[derive(Debug, Deserialize)]
pub(crate) struct DetailResponse {
    pub code: i64,
    pub playlist: Option<RawPlaylist>,
    pub result: Option<RawPlaylist>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlaylist {
    pub name: String,
    #[serde(rename = "coverImgUrl")]
    pub cover_img_url: Option<String>,
    #[serde(rename = "trackIds", default)]
    pub track_ids: Vec<RawTrackId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTrackId {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SongsResponse {
    pub code: i64,
    #[serde(default)]
    pub songs: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTrack {
    pub id: u64,
    pub name: Option<String>,
    #[serde(default, alias = "artists")]
    pub ar: Vec<RawArtist>,
    #[serde(default, alias = "duration")]
    pub dt: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawArtist {
    pub name: Option<String>,
}

impl RawTrack {
    /// A track with no usable title cannot even be reported as missing, so it
    /// is dropped here. Empty artist lists are kept; the resolver records them.
    pub(crate) fn into_source(self) -> Option<SourceTrack> {
        let title = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if title.is_empty() {
            return None;
        }
        let artists: Vec<String> = self
            .ar
            .into_iter()
            .filter_map(|a| a.name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Some(SourceTrack {
            id: self.id,
            title,
            artists,
            duration_ms: self.dt,
        })
    }
}
