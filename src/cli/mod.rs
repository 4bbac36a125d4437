use clap::{Args, Parser};
use std::path::PathBuf;

/// Options shared by both tools
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable progress indicators and status lines
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a YAML config file
    #[arg(long, value_name = "FILE", env = "MEDIA_SCRIBE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(
    name = "scribe-download",
    about = "Download a video or audio stream and extract it as MP3",
    version,
    long_about = "Downloads the media behind a URL with yt-dlp and extracts the audio track as MP3. \
                  Status goes to stderr; the file is written to OUTPUT (a yt-dlp output template is accepted)."
)]
pub struct DownloadCli {
    /// Source URL (YouTube, TikTok, Instagram, or anything yt-dlp understands)
    #[arg(value_name = "URL")]
    pub url: String,

    /// Destination path or output template
    #[arg(value_name = "OUTPUT")]
    pub output: String,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(Parser, Debug)]
#[command(
    name = "scribe-transcribe",
    about = "Transcribe an audio file with Whisper and print JSON segments",
    version,
    long_about = "Runs a local Whisper model over an audio file and prints a single JSON document \
                  with the text, detected language, duration and timestamped segments."
)]
pub struct TranscribeCli {
    /// Path to the audio (or video) file
    #[arg(value_name = "AUDIO_PATH")]
    pub audio_path: PathBuf,

    /// Translate the speech to English instead of transcribing it
    #[arg(long)]
    pub translate: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(Parser, Debug)]
#[command(
    name = "scribe-url",
    about = "Download the audio behind a video link and transcribe it",
    version,
    long_about = "Downloads the audio of a YouTube, Instagram or TikTok video into a scratch directory, \
                  transcribes it with a local Whisper model and prints a single JSON document. \
                  The downloaded audio is removed afterwards."
)]
pub struct PipelineCli {
    /// Video URL (http or https)
    #[arg(value_name = "URL")]
    pub url: String,

    /// Translate the speech to English instead of transcribing it
    #[arg(long)]
    pub translate: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}
