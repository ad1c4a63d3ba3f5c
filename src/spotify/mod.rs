pub mod client;
pub mod models;

pub use client::SpotifyClient;
pub use models::{CandidateTrack, CreatedPlaylist};
