use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Round to two decimal places, ties to even on the exact binary value.
///
/// `{:.2}` formats the exact value correctly rounded, so 0.015 (stored as
/// 0.01499...) becomes 0.01 and 0.125 becomes 0.12. Scaling by 100 first would
/// round both up.
pub fn round_to_hundredths(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Default filter directive for the given verbosity flags
pub fn default_log_filter(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "media_scribe=debug"
    } else if quiet {
        "media_scribe=warn"
    } else {
        "media_scribe=info"
    }
}

/// Initialize tracing. Logs always go to stderr; stdout is reserved for program output.
pub fn init_tracing(verbose: bool, quiet: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_log_filter(verbose, quiet).into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

/// Check if the current environment has the external tools the binaries drive
pub async fn check_dependencies(tools: &[(&str, &str)]) -> Vec<String> {
    let mut missing = Vec::new();

    for (command, purpose) in tools {
        if !check_command_available(command).await {
            missing.push(format!("{} - {}", command, purpose));
        }
    }

    missing
}

/// Print missing-tool warnings to stderr without stopping the run
pub fn warn_missing(missing: &[String]) {
    if missing.is_empty() {
        return;
    }

    eprintln!("{}", console::style("Dependency check warnings:").yellow().for_stderr());
    for dep in missing {
        eprintln!("   • {}", dep);
    }
    eprintln!("   (Continuing anyway - tools may be available)");
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    // ffmpeg only understands -version
    let flag = if command.ends_with("ffmpeg") { "-version" } else { "--version" };

    Command::new(command)
        .arg(flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_hundredths() {
        assert_eq!(round_to_hundredths(3.2), 3.2);
        assert_eq!(round_to_hundredths(1.499), 1.5);
        assert_eq!(round_to_hundredths(2.344), 2.34);
        assert_eq!(round_to_hundredths(0.0), 0.0);
        assert_eq!(round_to_hundredths(12.3456), 12.35);
    }

    #[test]
    fn test_round_to_hundredths_ties() {
        assert_eq!(round_to_hundredths(0.015), 0.01);
        assert_eq!(round_to_hundredths(0.125), 0.12);
        assert_eq!(round_to_hundredths(1.125), 1.12);
        assert_eq!(round_to_hundredths(2.505), 2.5);
        assert_eq!(round_to_hundredths(0.375), 0.38);
        assert_eq!(round_to_hundredths(0.625), 0.62);

        // Durations are sample counts over 16 kHz
        assert_eq!(round_to_hundredths(240.0 / 16_000.0), 0.01);
        assert_eq!(round_to_hundredths(40_080.0 / 16_000.0), 2.5);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
        assert_eq!(format_duration(-1.0), "0s");
    }

    #[test]
    fn test_default_log_filter() {
        assert_eq!(default_log_filter(true, true), "media_scribe=debug");
        assert_eq!(default_log_filter(false, true), "media_scribe=warn");
        assert_eq!(default_log_filter(false, false), "media_scribe=info");
    }

    #[tokio::test]
    async fn test_check_dependencies_reports_missing() {
        let missing = check_dependencies(&[("definitely-not-a-real-tool", "testing")]).await;
        assert_eq!(missing, vec!["definitely-not-a-real-tool - testing".to_string()]);
    }
}
