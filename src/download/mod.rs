use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub mod ytdlp;

pub use ytdlp::YtDlpEngine;

use crate::config::{DownloadConfig, InsecureTls};
use crate::Result;

/// Host patterns of short-video platforms that refuse media requests without a referer
pub const KNOWN_SHORT_VIDEO_HOSTS: &[&str] = &["tiktok.com", "vt.tiktok.com"];

/// Referer sent to the known short-video platforms
pub const SHORT_VIDEO_REFERER: &str = "https://www.tiktok.com/";

/// One download request, scoped to a single invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Source URL
    pub url: String,

    /// Destination path; may be an output template
    pub destination: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
        }
    }
}

/// Audio extraction step run after the fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcess {
    /// Target codec (mp3)
    pub codec: String,

    /// Target bitrate in kbps
    pub quality_kbps: u32,
}

/// TLS behaviour for this one job. Never applied process-wide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportConfig {
    pub verify_certificates: bool,
    pub legacy_server_connect: bool,
}

/// Fully assembled configuration for the fetch engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: String,
    pub output_template: String,
    pub format: String,
    pub post_process: PostProcess,
    headers: Vec<(String, String)>,
    pub socket_timeout: Duration,
    pub retries: u32,
    pub fragment_retries: u32,
    pub transport: TransportConfig,
}

/// What the engine reports back after a successful job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Final file path after post-processing, when the engine reported it
    pub output_path: Option<PathBuf>,
}

impl DownloadJob {
    /// Build the job configuration for a request
    pub fn from_request(request: &DownloadRequest, config: &DownloadConfig) -> Self {
        let known_site = is_known_short_video_host(&request.url);

        let mut headers = vec![
            ("User-Agent".to_string(), config.user_agent.clone()),
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language".to_string(), "en-us,en;q=0.5".to_string()),
            ("Sec-Fetch-Mode".to_string(), "navigate".to_string()),
        ];

        if known_site {
            tracing::debug!("Adding referer for short-video host: {}", request.url);
            headers.push(("Referer".to_string(), SHORT_VIDEO_REFERER.to_string()));
        }

        let verify_certificates = match config.insecure_tls {
            InsecureTls::All => false,
            InsecureTls::KnownSites => !known_site,
            InsecureTls::Never => true,
        };

        Self {
            url: request.url.clone(),
            output_template: request.destination.clone(),
            format: config.format.clone(),
            post_process: PostProcess {
                codec: config.audio_codec.clone(),
                quality_kbps: config.audio_quality_kbps,
            },
            headers,
            socket_timeout: Duration::from_secs(config.socket_timeout_secs),
            retries: config.retries,
            fragment_retries: config.fragment_retries,
            transport: TransportConfig {
                verify_certificates,
                legacy_server_connect: config.legacy_server_connect,
            },
        }
    }

    /// Request headers in the order they are sent
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Render the job as a yt-dlp argument vector
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            self.format.clone(),
            "--output".to_string(),
            self.output_template.clone(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.post_process.codec.clone(),
            "--audio-quality".to_string(),
            format!("{}K", self.post_process.quality_kbps),
        ];

        for (name, value) in &self.headers {
            args.push("--add-header".to_string());
            args.push(format!("{}:{}", name, value));
        }

        args.extend([
            "--socket-timeout".to_string(),
            self.socket_timeout.as_secs().to_string(),
            "--retries".to_string(),
            self.retries.to_string(),
            "--fragment-retries".to_string(),
            self.fragment_retries.to_string(),
        ]);

        if !self.transport.verify_certificates {
            args.push("--no-check-certificates".to_string());
        }
        if self.transport.legacy_server_connect {
            args.push("--legacy-server-connect".to_string());
        }

        // Report the final path once post-processing has moved the file
        args.extend([
            "--newline".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "--".to_string(),
            self.url.clone(),
        ]);

        args
    }
}

/// Whether the URL's host belongs to a known short-video platform.
/// Input that does not parse as a URL is matched as a raw string.
pub fn is_known_short_video_host(url: &str) -> bool {
    let host = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|h| h.to_lowercase()));

    let haystack = host.unwrap_or_else(|| url.to_lowercase());
    KNOWN_SHORT_VIDEO_HOSTS
        .iter()
        .any(|pattern| haystack.contains(pattern))
}

/// Engine that fetches a URL and extracts audio according to a job
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// Run the job to completion
    async fn fetch(&self, job: &DownloadJob) -> Result<FetchOutcome>;

    /// Name used in log lines
    fn engine_name(&self) -> &'static str;
}

/// Run one download job, writing status lines to stderr around it
pub async fn run_download(
    engine: &dyn FetchEngine,
    job: &DownloadJob,
    show_progress: bool,
) -> Result<FetchOutcome> {
    eprintln!("Downloading from: {}", job.url);
    tracing::info!(
        engine = engine.engine_name(),
        output = %job.output_template,
        referer = job.header("Referer").is_some(),
        verify_certificates = job.transport.verify_certificates,
        "Starting download"
    );

    let progress = if show_progress {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Downloading and extracting audio...");
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    } else {
        ProgressBar::hidden()
    };

    let result = engine.fetch(job).await;
    progress.finish_and_clear();

    let outcome = result?;
    eprintln!("Download completed successfully");
    if let Some(path) = &outcome.output_path {
        eprintln!("Saved to: {}", path.display());
    }

    Ok(outcome)
}
