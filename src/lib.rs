//! Media Scribe - command-line tools for downloading and transcribing media
//!
//! This library backs three binaries. `scribe-download` fetches a stream from a URL and
//! extracts MP3 audio through yt-dlp. `scribe-transcribe` turns an audio file into
//! timestamped segments with a local Whisper model and prints them as JSON.
//! `scribe-url` chains the two for a YouTube, Instagram or TikTok link.

pub mod cli;
pub mod config;
pub mod download;
pub mod output;
pub mod pipeline;
pub mod transcribe;
pub mod utils;

pub use cli::{DownloadCli, PipelineCli, TranscribeCli};
pub use config::Config;
pub use download::{DownloadJob, DownloadRequest, FetchEngine};
pub use pipeline::{Pipeline, PipelineResult, Platform};
pub use transcribe::{SpeechEngine, Transcriber, TranscriptionRequest, TranscriptionResult};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Coarse classification of a failure, for callers that need more than success/failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection, TLS, HTTP or timeout problems
    Network,
    /// The URL or file is not something the engine can handle
    UnsupportedInput,
    /// Anything raised inside the delegated engine itself
    EngineInternal,
}

/// Error types specific to media-scribe
#[derive(thiserror::Error, Debug)]
pub enum ScribeError {
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Audio decoding failed: {0}")]
    AudioDecodingFailed(String),

    #[error("Model load failed for {path}: {message}")]
    ModelLoad { path: String, message: String },

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScribeError {
    /// Map the error onto the closed set of failure kinds
    pub fn kind(&self) -> FailureKind {
        match self {
            ScribeError::UnsupportedUrl(_)
            | ScribeError::UnsupportedInput(_)
            | ScribeError::AudioDecodingFailed(_) => FailureKind::UnsupportedInput,
            ScribeError::Network(_) => FailureKind::Network,
            ScribeError::DownloadFailed(_)
            | ScribeError::ModelLoad { .. }
            | ScribeError::TranscriptionFailed(_)
            | ScribeError::EngineUnavailable(_)
            | ScribeError::Io(_) => FailureKind::EngineInternal,
        }
    }
}

impl From<reqwest::Error> for ScribeError {
    fn from(err: reqwest::Error) -> Self {
        ScribeError::Network(err.to_string())
    }
}

/// Tagged result of one invocation
#[derive(Debug)]
pub enum Outcome<T> {
    Success { payload: T },
    Failure { kind: FailureKind, message: String },
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Build an outcome from an application-level result, recovering the kind
    /// when the underlying error is a [`ScribeError`]
    pub fn from_anyhow(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(payload) => Outcome::Success { payload },
            Err(err) => Outcome::Failure {
                kind: err
                    .downcast_ref::<ScribeError>()
                    .map(ScribeError::kind)
                    .unwrap_or(FailureKind::EngineInternal),
                message: format!("{:#}", err),
            },
        }
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}
