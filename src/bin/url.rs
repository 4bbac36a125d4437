use clap::Parser;
use std::process::ExitCode;

use media_scribe::download::YtDlpEngine;
use media_scribe::pipeline::check_source;
use media_scribe::transcribe::{ErrorResult, WhisperEngine};
use media_scribe::{output, utils};
use media_scribe::{Config, Outcome, Pipeline, PipelineCli, PipelineResult, Transcriber};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = PipelineCli::parse();

    let config = Config::load(cli.global.config.as_deref());
    let log_format = config
        .as_ref()
        .map(|c| c.logging.format)
        .unwrap_or_default();
    utils::init_tracing(cli.global.verbose, cli.global.quiet, log_format);

    let outcome = Outcome::from_anyhow(run(&cli, config).await);

    let printed = match &outcome {
        Outcome::Success { payload } => output::print_to_console(payload),
        Outcome::Failure { kind, message } => {
            tracing::warn!(?kind, "url transcription failed");
            output::print_to_console(&ErrorResult::new(message.clone()))
        }
    };

    if let Err(e) = printed {
        eprintln!("Failed to write output: {:#}", e);
        return ExitCode::from(1);
    }

    ExitCode::from(outcome.exit_code())
}

async fn run(cli: &PipelineCli, config: anyhow::Result<Config>) -> anyhow::Result<PipelineResult> {
    let config = config?;

    // Reject the URL before any model download
    check_source(&cli.url)?;

    let missing = utils::check_dependencies(&[
        (config.download.yt_dlp_path.as_str(), "required for downloading"),
        (config.transcription.ffmpeg_path.as_str(), "required for audio extraction and decoding"),
    ])
    .await;
    if !cli.global.quiet {
        utils::warn_missing(&missing);
    }

    let speech = WhisperEngine::provision(&config, !cli.global.quiet).await?;
    let fetcher = YtDlpEngine::new(config.download.yt_dlp_path.clone()).with_progress(cli.global.verbose);

    let pipeline = Pipeline::new(
        fetcher,
        Transcriber::new(speech, config.transcription.clone()),
        config.download.clone(),
    )
    .show_progress(!cli.global.quiet && !cli.global.verbose);

    Ok(pipeline.transcribe_from_url(&cli.url, cli.translate).await?)
}
