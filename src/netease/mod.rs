pub mod client;
pub mod fetcher;
pub mod models;

pub use client::{parse_playlist_url, NeteaseClient};
pub use fetcher::{PlaylistFetcher, PlaylistSource};
pub use models::{PlaylistDetail, SourcePlaylist, SourceTrack};
