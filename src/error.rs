use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not a NetEase playlist URL: {0}")]
    InvalidPlaylistUrl(String),

    #[error("NetEase API error: {0}")]
    NeteaseApi(String),

    #[error("Spotify API error: {0}")]
    SpotifyApi(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Playlist has no retrievable tracks")]
    NoTracks,

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Fatal errors abort the whole transfer. Everything else is absorbed by
    /// the component that hit it and recorded in the outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::InvalidPlaylistUrl(_) | AppError::Auth(_) | AppError::NoTracks
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
