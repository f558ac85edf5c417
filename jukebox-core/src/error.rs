//! Error types for jukebox-core.

use thiserror::Error;

/// Main error type for the jukebox-core library.
#[derive(Error, Debug)]
pub enum Error {
    // Config errors
    #[error("Failed to load config '{0}': {1}")]
    ConfigLoad(String, String),

    #[error("Failed to parse config '{0}': {1}")]
    ConfigParse(String, String),

    #[error("Config validation error in '{0}': {1}")]
    ConfigValidation(String, String),

    #[error("Failed to acquire cache lock")]
    CacheLock,

    // Download errors
    #[error("Invalid track URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to download {0}: {1}")]
    Download(String, String),

    #[error("Refusing to buffer unbounded stream for file playback: {0}")]
    StreamRejected(String),

    // Audio backend errors
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("No audio output device available")]
    NoAudioDevice,

    #[error("Sound resource not found: {0}")]
    SoundFileNotFound(String),

    #[error("Failed to play sound: {0}")]
    SoundPlayback(String),

    // Generic errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
