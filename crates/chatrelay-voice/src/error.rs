use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Voice connection failed: {0}")]
    Connect(String),

    #[error("Not connected to a voice channel")]
    NotConnected,
}
