use clap::Parser;
use std::process::ExitCode;

use media_scribe::transcribe::{audio, ErrorResult, WhisperEngine};
use media_scribe::{output, utils};
use media_scribe::{Config, Outcome, TranscribeCli, Transcriber, TranscriptionRequest, TranscriptionResult};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = TranscribeCli::parse();

    let config = Config::load(cli.global.config.as_deref());
    let log_format = config
        .as_ref()
        .map(|c| c.logging.format)
        .unwrap_or_default();
    utils::init_tracing(cli.global.verbose, cli.global.quiet, log_format);

    let outcome = Outcome::from_anyhow(run(&cli, config).await);

    // Exactly one document goes to stdout, whatever happened
    let printed = match &outcome {
        Outcome::Success { payload } => output::print_to_console(payload),
        Outcome::Failure { kind, message } => {
            tracing::warn!(?kind, "transcription failed");
            output::print_to_console(&ErrorResult::new(message.clone()))
        }
    };

    if let Err(e) = printed {
        eprintln!("Failed to write output: {:#}", e);
        return ExitCode::from(1);
    }

    ExitCode::from(outcome.exit_code())
}

async fn run(cli: &TranscribeCli, config: anyhow::Result<Config>) -> anyhow::Result<TranscriptionResult> {
    let config = config?;
    let settings = &config.transcription;
    let request = TranscriptionRequest::new(cli.audio_path.clone(), cli.translate);

    // Reject bad input before spending time on model provisioning
    audio::validate_input(&request.audio_path).await?;

    let missing = utils::check_dependencies(&[(settings.ffmpeg_path.as_str(), "required for audio decoding")]).await;
    if !cli.global.quiet {
        utils::warn_missing(&missing);
    }

    let engine = WhisperEngine::provision(&config, !cli.global.quiet).await?;

    let transcriber = Transcriber::new(engine, settings.clone());
    Ok(transcriber.run(&request).await?)
}
