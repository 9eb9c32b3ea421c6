//! Error types for Intervue

use thiserror::Error;

/// Result type alias using Intervue's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in Intervue
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Completion failed: {0}")]
    Completion(String),

    #[error("Sentiment analysis failed: {0}")]
    Sentiment(String),

    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
