pub mod config;
pub mod error;
pub mod matcher;
pub mod migrator;
pub mod netease;
pub mod normalize;
pub mod resolver;
pub mod retry;
pub mod spotify;

pub use config::TransferConfig;
pub use error::{AppError, Result};
pub use migrator::{preview, Destination, PlaylistMigrator, TransferOptions, TransferOutcome};
pub use netease::{parse_playlist_url, NeteaseClient, SourcePlaylist, SourceTrack};
pub use resolver::{MatchResult, Resolver, TrackSearch, UnresolvedReason};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use spotify::{CandidateTrack, SpotifyClient};
