//! Error types for the tenant pipeline.

use chatrelay_voice::VoiceError;
use thiserror::Error;

/// Failure reading the live feed. Ends the tenant's ingestion.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned status {0}")]
    Status(u16),

    #[error("malformed feed event: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

/// A command that could not be carried out.
///
/// The display text is the reply shown to the user who issued the command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("You must be in a voice channel first!")]
    NotInVoiceChannel,

    #[error("Please provide a valid live id!")]
    MissingLiveId,

    #[error("Something went wrong while joining the voice channel.")]
    Connect(#[source] VoiceError),
}
