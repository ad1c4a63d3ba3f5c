use serde::{Deserialize, Serialize};

use crate::netease::SourceTrack;

/// Per-batch resolution statistics, in batch order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_index: usize,
    pub attempted: usize,
    pub matched: usize,
}

/// The final result of one migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub playlist_url: String,
    /// URIs actually inserted into the destination playlist, in source order.
    pub transferred: Vec<String>,
    /// Original titles of tracks that could not be resolved.
    pub missing: Vec<String>,
    /// Best-known true track count: the declared ID-list length when the
    /// fetch undercounted, so shortfalls stay visible in the success rate.
    pub total_tracks: usize,
    pub batch_reports: Vec<BatchReport>,
    /// Recoverable failures absorbed along the way (truncation, failed insert
    /// chunks, cover upload).
    pub warnings: Vec<String>,
    pub success_rate: f64,
}

impl TransferOutcome {
    pub fn new(playlist_url: String, total_tracks: usize) -> Self {
        Self {
            playlist_url,
            transferred: Vec::new(),
            missing: Vec::new(),
            total_tracks,
            batch_reports: Vec::new(),
            warnings: Vec::new(),
            success_rate: 0.0,
        }
    }

    pub fn calculate_success_rate(&mut self) {
        if self.total_tracks > 0 {
            self.success_rate =
                (self.transferred.len() as f64 / self.total_tracks as f64) * 100.0;
        }
    }
}

/// What the preview operation returns: enough to show the user what a
/// transfer would migrate, without touching the destination.
#[derive(Debug, Clone)]
pub struct PlaylistPreview {
    pub title: String,
    pub cover_url: Option<String>,
    /// True total, which may exceed the capped preview list below.
    pub total_tracks: usize,
    pub tracks: Vec<SourceTrack>,
}
