pub mod orchestrator;
pub mod report;

pub use orchestrator::{preview, Destination, PlaylistMigrator, TransferOptions};
pub use report::{BatchReport, PlaylistPreview, TransferOutcome};
