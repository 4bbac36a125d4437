use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration. Every field has a default, so an absent file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Download job settings
    pub download: DownloadConfig,

    /// Transcription settings
    pub transcription: TranscriptionConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// Format selector passed to yt-dlp
    pub format: String,

    /// Target audio codec for extraction
    pub audio_codec: String,

    /// Target audio bitrate in kbps
    pub audio_quality_kbps: u32,

    /// Socket timeout in seconds
    pub socket_timeout_secs: u64,

    /// Connection retries
    pub retries: u32,

    /// Retries per media fragment
    pub fragment_retries: u32,

    /// Browser user agent sent with every request
    pub user_agent: String,

    /// Which sources get certificate verification disabled
    pub insecure_tls: InsecureTls,

    /// Allow legacy TLS renegotiation for servers that still need it
    pub legacy_server_connect: bool,
}

/// Scope of the certificate-verification relaxation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsecureTls {
    /// Never verify certificates
    All,
    /// Skip verification only for known short-video hosts
    KnownSites,
    /// Always verify
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Whisper model size (tiny, base, small, medium, large-v3)
    pub model: String,

    /// Directory holding ggml model files; defaults to the user cache dir
    pub model_dir: Option<PathBuf>,

    /// Compute device
    pub device: Device,

    /// Numeric precision of the model weights
    pub precision: Precision,

    /// Beam search width
    pub beam_size: usize,

    /// Emit token-level timestamps
    pub word_timestamps: bool,

    /// Enable voice-activity filtering
    pub vad_filter: bool,

    /// Minimum silence, in milliseconds, that splits speech spans
    pub vad_min_silence_ms: u32,

    /// Inference threads (0 = available parallelism)
    pub threads: usize,

    /// ffmpeg executable used to decode input audio
    pub ffmpeg_path: String,

    /// Download missing model files automatically
    pub auto_download: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Int8,
    Float16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log line format
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            format: "bestaudio/best".to_string(),
            audio_codec: "mp3".to_string(),
            audio_quality_kbps: 192,
            socket_timeout_secs: 30,
            retries: 3,
            fragment_retries: 3,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            insecure_tls: InsecureTls::All,
            legacy_server_connect: true,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            model_dir: None,
            device: Device::Cpu,
            precision: Precision::Int8,
            beam_size: 5,
            word_timestamps: true,
            vad_filter: true,
            vad_min_silence_ms: 500,
            threads: 0,
            ffmpeg_path: "ffmpeg".to_string(),
            auto_download: true,
        }
    }
}

impl Config {
    /// Load configuration from the explicit path, the local file, or the user config dir.
    /// Falls back to defaults when no file exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::config_path(),
        };

        let Some(config_path) = config_path else {
            return Ok(Self::default());
        };

        tracing::debug!("Loading config from {}", config_path.display());

        let content = fs_err::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config = Self::from_yaml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    /// Locate an existing configuration file
    fn config_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        let user_config = dirs::config_dir()?.join("media-scribe").join("config.yaml");
        user_config.exists().then_some(user_config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.download.socket_timeout_secs == 0 {
            anyhow::bail!("download.socket_timeout_secs must be greater than 0");
        }

        if self.transcription.beam_size == 0 {
            anyhow::bail!("transcription.beam_size must be greater than 0");
        }

        if self.transcription.model.trim().is_empty() {
            anyhow::bail!("transcription.model must not be empty");
        }

        Ok(())
    }

    /// Directory that holds model files
    pub fn model_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.transcription.model_dir {
            return Ok(dir.clone());
        }

        let cache_dir = dirs::cache_dir()
            .context("Could not determine cache directory")?;

        Ok(cache_dir.join("media-scribe").join("models"))
    }
}
