use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::{Result, ScribeError};

/// Sample rate Whisper expects
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Check that the input exists, is a file and is not empty
pub async fn validate_input(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ScribeError::UnsupportedInput(format!(
            "File does not exist: {}",
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(ScribeError::UnsupportedInput(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() == 0 {
        return Err(ScribeError::UnsupportedInput(format!(
            "File is empty: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Decode any audio or video file into 16 kHz mono f32 samples using ffmpeg
pub async fn decode_to_pcm(ffmpeg_path: &str, path: &Path) -> Result<Vec<f32>> {
    validate_input(path).await?;

    tracing::debug!("Decoding {} to 16 kHz mono PCM", path.display());

    let sample_rate = WHISPER_SAMPLE_RATE.to_string();
    let output = Command::new(ffmpeg_path)
        .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-i"])
        .arg(path)
        .args([
            "-vn", // No video
            "-ac", "1",
            "-ar", sample_rate.as_str(),
            "-f", "f32le",
            "-",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScribeError::EngineUnavailable(format!("{} is not installed", ffmpeg_path))
            } else {
                ScribeError::Io(e)
            }
        })?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        return Err(ScribeError::AudioDecodingFailed(error.trim().to_string()));
    }

    let samples = pcm_from_le_bytes(&output.stdout);
    if samples.is_empty() {
        return Err(ScribeError::UnsupportedInput(format!(
            "No audio stream found in {}",
            path.display()
        )));
    }

    Ok(samples)
}

/// Reinterpret little-endian f32 bytes; a trailing partial sample is dropped
pub fn pcm_from_le_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Duration in seconds of a 16 kHz sample buffer
pub fn duration_secs(samples: &[f32]) -> f64 {
    samples.len() as f64 / f64::from(WHISPER_SAMPLE_RATE)
}
