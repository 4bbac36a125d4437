use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::ModelOptions;
use crate::config::Precision;
use crate::{Result, ScribeError};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";
const VAD_MODEL_URL: &str =
    "https://huggingface.co/ggml-org/whisper-vad/resolve/main/ggml-silero-v5.1.2.bin";
const VAD_MODEL_FILE: &str = "ggml-silero-v5.1.2.bin";

/// ggml filename for a model size and precision
pub fn model_filename(model: &str, precision: Precision) -> String {
    match precision {
        Precision::Int8 => format!("ggml-{}-q8_0.bin", model),
        Precision::Float16 => format!("ggml-{}.bin", model),
    }
}

/// Local paths of the speech and VAD models
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model: PathBuf,
    pub vad: PathBuf,
}

impl ModelFiles {
    pub fn in_dir(dir: &Path, options: &ModelOptions) -> Self {
        Self {
            model: dir.join(model_filename(&options.model, options.precision)),
            vad: dir.join(VAD_MODEL_FILE),
        }
    }
}

/// Make sure the model files exist, downloading what is missing when allowed
pub async fn ensure_models(
    files: &ModelFiles,
    options: &ModelOptions,
    need_vad: bool,
    auto_download: bool,
    show_progress: bool,
) -> Result<()> {
    let model_url = format!("{}/{}", MODEL_BASE_URL, model_filename(&options.model, options.precision));
    ensure_file(&model_url, &files.model, auto_download, show_progress).await?;

    if need_vad {
        ensure_file(VAD_MODEL_URL, &files.vad, auto_download, show_progress).await?;
    }

    Ok(())
}

/// Returns true if the file was downloaded, false if it already existed
async fn ensure_file(url: &str, path: &Path, auto_download: bool, show_progress: bool) -> Result<bool> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "model already present");
        return Ok(false);
    }

    if !auto_download {
        return Err(ScribeError::ModelLoad {
            path: path.display().to_string(),
            message: "model file not found and auto_download is disabled".to_string(),
        });
    }

    download(url, path, show_progress).await?;
    Ok(true)
}

async fn download(url: &str, path: &Path, show_progress: bool) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs_err::create_dir_all(parent)?;

    tracing::info!(url = %url, path = %path.display(), "downloading model");

    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(ScribeError::Network(format!(
            "model download failed with HTTP {}: {}",
            response.status(),
            url
        )));
    }

    let progress = if show_progress {
        let bar = ProgressBar::new(response.content_length().unwrap_or(0));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        {
            bar.set_style(style);
        }
        bar.set_message(
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    // Write next to the target so the final rename stays on one filesystem
    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress.set_position(downloaded);
    }
    file.flush()?;

    file.persist(path).map_err(|e| ScribeError::Io(e.error))?;
    progress.finish_and_clear();

    tracing::info!(path = %path.display(), size = downloaded, "model downloaded");
    Ok(())
}
