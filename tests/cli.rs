use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn download_cmd() -> Command {
    let mut cmd = Command::cargo_bin("scribe-download").unwrap();
    cmd.env_remove("MEDIA_SCRIBE_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn url_cmd() -> Command {
    let mut cmd = Command::cargo_bin("scribe-url").unwrap();
    cmd.env_remove("MEDIA_SCRIBE_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn transcribe_cmd() -> Command {
    let mut cmd = Command::cargo_bin("scribe-transcribe").unwrap();
    cmd.env_remove("MEDIA_SCRIBE_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, yaml: &str) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn download_with_one_argument_is_a_usage_error() {
    download_cmd()
        .arg("https://www.youtube.com/watch?v=abc")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn download_with_three_arguments_is_a_usage_error() {
    download_cmd()
        .args(["https://www.youtube.com/watch?v=abc", "out.mp3", "extra"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn download_help_exits_cleanly() {
    download_cmd().arg("--help").assert().success();
}

#[test]
fn download_reports_missing_engine() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "download:\n  yt_dlp_path: /nonexistent/yt-dlp\n");

    download_cmd()
        .arg("--config")
        .arg(&config)
        .args(["https://www.youtube.com/watch?v=abc"])
        .arg(dir.path().join("out.mp3"))
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Downloading from: https://www.youtube.com/watch?v=abc"))
        .stderr(predicate::str::contains("Error downloading video:"));
}

#[cfg(unix)]
fn fake_yt_dlp(dir: &Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-yt-dlp");
    std::fs::write(
        &script,
        r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/args.txt"
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --version) echo 2024.01.01; exit 0;;
    --output) out="$2"; shift;;
  esac
  shift
done
printf 'ID3' > "$out"
echo "[download] 100% of 3.00B in 00:00:00"
echo "$out"
"#,
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[cfg(unix)]
#[test]
fn download_success_writes_file_and_no_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fake_yt_dlp(dir.path());
    let config = write_config(
        dir.path(),
        &format!("download:\n  yt_dlp_path: {}\n", engine.display()),
    );
    let output = dir.path().join("clip.mp3");

    download_cmd()
        .arg("--config")
        .arg(&config)
        .arg("https://vt.tiktok.com/ZSabc/")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Download completed successfully"))
        .stderr(predicate::str::contains(format!("Saved to: {}", output.display())))
        .stderr(predicate::str::contains("[download]").not());

    assert!(output.exists());

    let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert!(args.contains("Referer:https://www.tiktok.com/"));
    assert!(args.contains("--no-check-certificates"));
    assert!(args.contains("--audio-format mp3"));
}

#[cfg(unix)]
#[test]
fn download_omits_referer_for_other_hosts() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fake_yt_dlp(dir.path());
    let config = write_config(
        dir.path(),
        &format!("download:\n  yt_dlp_path: {}\n", engine.display()),
    );

    download_cmd()
        .arg("--config")
        .arg(&config)
        .arg("https://www.youtube.com/watch?v=abc")
        .arg(dir.path().join("clip.mp3"))
        .assert()
        .success();

    let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert!(!args.contains("Referer"));
}

#[cfg(unix)]
#[test]
fn download_verbose_streams_engine_progress() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fake_yt_dlp(dir.path());
    let config = write_config(
        dir.path(),
        &format!("download:\n  yt_dlp_path: {}\n", engine.display()),
    );
    let output = dir.path().join("clip.mp3");

    download_cmd()
        .arg("--config")
        .arg(&config)
        .arg("-v")
        .arg("https://www.youtube.com/watch?v=abc")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("[download] 100%"))
        .stderr(predicate::str::contains(format!("Saved to: {}", output.display())));

    let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert!(args.starts_with("--no-quiet"));
}

fn single_json_document(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8(stdout.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines.len(), 1, "expected exactly one document, got: {text}");
    serde_json::from_str(lines[0]).unwrap()
}

#[test]
fn transcribe_missing_file_prints_error_document() {
    let dir = tempfile::tempdir().unwrap();
    let assert = transcribe_cmd()
        .arg(dir.path().join("missing.mp3"))
        .arg("--translate")
        .assert()
        .code(1);

    let doc = single_json_document(&assert.get_output().stdout);
    assert!(!doc["error"].as_str().unwrap().is_empty());
    assert_eq!(doc["text"], "");
    assert_eq!(doc["segments"], serde_json::json!([]));
}

#[test]
fn transcribe_bad_config_prints_error_document() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "transcription:\n  beam_size: 0\n");

    let assert = transcribe_cmd()
        .arg("--config")
        .arg(&config)
        .arg(dir.path().join("audio.mp3"))
        .assert()
        .code(1);

    let doc = single_json_document(&assert.get_output().stdout);
    assert!(doc["error"].as_str().unwrap().contains("beam_size"));
}

#[test]
fn url_rejects_malformed_url_with_error_document() {
    let assert = url_cmd().arg("youtube.com/watch?v=abc").assert().code(1);

    let doc = single_json_document(&assert.get_output().stdout);
    assert!(doc["error"].as_str().unwrap().contains("Invalid URL format"));
    assert_eq!(doc["text"], "");
    assert_eq!(doc["segments"], serde_json::json!([]));
}

#[test]
fn url_rejects_unsupported_platform() {
    let assert = url_cmd().arg("https://vimeo.com/123").arg("--translate").assert().code(1);

    let doc = single_json_document(&assert.get_output().stdout);
    assert!(doc["error"]
        .as_str()
        .unwrap()
        .contains("Please provide a YouTube, Instagram, or TikTok URL"));
}
