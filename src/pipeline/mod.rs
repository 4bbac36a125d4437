use serde::Serialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::config::DownloadConfig;
use crate::download::{run_download, DownloadJob, DownloadRequest, FetchEngine};
use crate::transcribe::{SpeechEngine, Transcriber, TranscriptionRequest, TranscriptionResult};
use crate::{Result, ScribeError};

/// File stem of the audio written into the scratch directory
const AUDIO_STEM: &str = "audio";

/// Platforms the URL pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Instagram,
    TikTok,
}

impl Platform {
    /// Identify the platform from the URL's host
    pub fn detect(url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_lowercase();
        let on = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

        if on("youtube.com") || on("youtu.be") {
            Some(Platform::YouTube)
        } else if on("instagram.com") {
            Some(Platform::Instagram)
        } else if on("tiktok.com") {
            Some(Platform::TikTok)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
        }
    }
}

/// Validate and parse a source URL
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|_| ScribeError::UnsupportedUrl(format!("Invalid URL format: {}", url)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ScribeError::UnsupportedUrl(format!(
            "URL must use HTTP or HTTPS: {}",
            url
        )));
    }

    Ok(parsed)
}

/// Check that a URL is well-formed and points at a supported platform
pub fn check_source(url: &str) -> Result<Platform> {
    let parsed = validate_url(url)?;
    Platform::detect(&parsed).ok_or_else(|| {
        ScribeError::UnsupportedUrl(format!(
            "{} is not a supported platform. Please provide a YouTube, Instagram, or TikTok URL",
            url
        ))
    })
}

/// Transcript of a URL, tagged with the platform it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub platform: Platform,
    #[serde(flatten)]
    pub transcript: TranscriptionResult,
}

/// Download-then-transcribe flow for a single URL
pub struct Pipeline<F, S> {
    fetcher: F,
    transcriber: Transcriber<S>,
    download: DownloadConfig,
    show_progress: bool,
}

impl<F: FetchEngine, S: SpeechEngine> Pipeline<F, S> {
    pub fn new(fetcher: F, transcriber: Transcriber<S>, download: DownloadConfig) -> Self {
        Self {
            fetcher,
            transcriber,
            download,
            show_progress: false,
        }
    }

    /// Show the download spinner
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Download the audio behind `url` into a scratch directory and transcribe it.
    /// The scratch directory is removed on return, whether or not the run succeeded.
    pub async fn transcribe_from_url(&self, url: &str, translate: bool) -> Result<PipelineResult> {
        let platform = check_source(url)?;
        tracing::info!(platform = platform.as_str(), translate, "Processing {}", url);

        let scratch = tempfile::Builder::new().prefix("media-scribe-").tempdir()?;
        let audio_path = self.download_audio(url, scratch.path()).await?;

        let size = fs_err::metadata(&audio_path).map(|m| m.len()).unwrap_or(0);
        tracing::info!(
            path = %audio_path.display(),
            size_mb = %format!("{:.2}", size as f64 / (1024.0 * 1024.0)),
            "Audio ready"
        );

        let transcript = self
            .transcriber
            .run(&TranscriptionRequest::new(audio_path, translate))
            .await?;

        Ok(PipelineResult {
            platform,
            transcript,
        })
    }

    async fn download_audio(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        let template = dir.join(format!("{}.%(ext)s", AUDIO_STEM));
        let request = DownloadRequest::new(url, template.to_string_lossy());
        let job = DownloadJob::from_request(&request, &self.download);

        let outcome = run_download(&self.fetcher, &job, self.show_progress).await?;
        locate_audio(outcome.output_path, dir)
    }
}

/// The path the engine reported, or else the first file in `dir` named after the audio stem
fn locate_audio(reported: Option<PathBuf>, dir: &Path) -> Result<PathBuf> {
    if let Some(path) = reported.filter(|p| p.is_file()) {
        return Ok(path);
    }

    let mut candidates: Vec<PathBuf> = fs_err::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map_or(false, |name| name.starts_with(AUDIO_STEM))
        })
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| ScribeError::DownloadFailed("downloaded file not found".to_string()))
}
