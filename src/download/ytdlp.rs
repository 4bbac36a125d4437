use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use super::{DownloadJob, FetchEngine, FetchOutcome};
use crate::{Result, ScribeError};

/// Fetch engine backed by the yt-dlp executable
pub struct YtDlpEngine {
    yt_dlp_path: String,
    stream_progress: bool,
}

impl YtDlpEngine {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            stream_progress: false,
        }
    }

    /// Forward yt-dlp's own progress lines to stderr
    pub fn with_progress(mut self, stream_progress: bool) -> Self {
        self.stream_progress = stream_progress;
        self
    }

    fn args_for(&self, job: &DownloadJob) -> Vec<String> {
        let mut args = job.to_args();
        // --print implies --quiet; undo that so progress is still emitted
        if self.stream_progress {
            args.insert(0, "--no-quiet".to_string());
        }
        args
    }
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl FetchEngine for YtDlpEngine {
    async fn fetch(&self, job: &DownloadJob) -> Result<FetchOutcome> {
        let args = self.args_for(job);
        tracing::debug!("Running {} {}", self.yt_dlp_path, args.join(" "));

        let mut child = Command::new(&self.yt_dlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ScribeError::EngineUnavailable(format!(
                        "{} is not installed. Please install it: https://github.com/yt-dlp/yt-dlp",
                        self.yt_dlp_path
                    ))
                } else {
                    ScribeError::Io(e)
                }
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let forward = self.stream_progress;

        let read_stdout = async move {
            let mut printed = Vec::new();
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    if is_progress_line(&line) {
                        if forward {
                            eprintln!("{}", line);
                        }
                    } else {
                        printed.push(line);
                    }
                }
            }
            Ok::<_, std::io::Error>(printed)
        };

        let read_stderr = async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                stderr.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
        };

        let (printed, stderr) = tokio::try_join!(read_stdout, read_stderr)?;
        let status = child.wait().await?;

        for line in stderr.lines().filter(|l| l.starts_with("WARNING:")) {
            tracing::warn!("{}", line);
        }

        if !status.success() {
            return Err(classify_failure(&stderr));
        }

        Ok(FetchOutcome {
            output_path: parse_output_path(&printed),
        })
    }

    fn engine_name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Extractor and downloader status lines look like `[download]  45.0% of ...`
fn is_progress_line(line: &str) -> bool {
    line.trim_start().starts_with('[')
}

/// The final `--print after_move:filepath` line, if any
fn parse_output_path(printed: &[String]) -> Option<PathBuf> {
    printed
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .last()
        .map(PathBuf::from)
}

/// Turn yt-dlp's stderr into a classified error carrying its most relevant line
fn classify_failure(stderr: &str) -> ScribeError {
    let message = stderr
        .lines()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .map(|line| line.trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| stderr.trim().to_string());

    let message = if message.is_empty() {
        "yt-dlp exited with an error".to_string()
    } else {
        message
    };

    if message.contains("Unsupported URL") || message.contains("is not a valid URL") {
        ScribeError::UnsupportedUrl(message.trim_start_matches("Unsupported URL:").trim().to_string())
    } else if ["HTTP Error", "timed out", "Unable to download", "Connection", "SSL"]
        .iter()
        .any(|needle| message.contains(needle))
    {
        ScribeError::Network(message)
    } else {
        ScribeError::DownloadFailed(message)
    }
}
