use clap::Parser;
use std::process::ExitCode;

use media_scribe::download::{run_download, DownloadJob, DownloadRequest, FetchOutcome, YtDlpEngine};
use media_scribe::utils;
use media_scribe::{Config, DownloadCli, Outcome};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match DownloadCli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are not failures; everything else is a usage error
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let config = Config::load(cli.global.config.as_deref());
    let log_format = config
        .as_ref()
        .map(|c| c.logging.format)
        .unwrap_or_default();
    utils::init_tracing(cli.global.verbose, cli.global.quiet, log_format);

    let outcome = Outcome::from_anyhow(run(&cli, config).await);

    if let Outcome::Failure { kind, message } = &outcome {
        tracing::warn!(?kind, "download failed");
        eprintln!(
            "{} {}",
            console::style("Error downloading video:").red().for_stderr(),
            message
        );
    }

    ExitCode::from(outcome.exit_code())
}

async fn run(cli: &DownloadCli, config: anyhow::Result<Config>) -> anyhow::Result<FetchOutcome> {
    let config = config?;

    let missing = utils::check_dependencies(&[
        (config.download.yt_dlp_path.as_str(), "required for downloading"),
        ("ffmpeg", "required for audio extraction"),
    ])
    .await;
    if !cli.global.quiet {
        utils::warn_missing(&missing);
    }

    let request = DownloadRequest::new(cli.url.clone(), cli.output.clone());
    let job = DownloadJob::from_request(&request, &config.download);
    let engine = YtDlpEngine::new(config.download.yt_dlp_path.clone()).with_progress(cli.global.verbose);

    // yt-dlp's own progress replaces the spinner in verbose mode
    let show_spinner = !cli.global.quiet && !cli.global.verbose;
    Ok(run_download(&engine, &job, show_spinner).await?)
}
