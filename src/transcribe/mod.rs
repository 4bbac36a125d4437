use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod audio;
pub mod model;
pub mod whisper;

pub use whisper::WhisperEngine;

use crate::config::{Device, Precision, TranscriptionConfig};
use crate::utils::round_to_hundredths;
use crate::Result;

/// One transcription request, scoped to a single invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionRequest {
    /// Audio file to transcribe
    pub audio_path: PathBuf,

    /// Translate to English instead of transcribing in the source language
    pub translate: bool,
}

impl TranscriptionRequest {
    pub fn new(audio_path: impl Into<PathBuf>, translate: bool) -> Self {
        Self {
            audio_path: audio_path.into(),
            translate,
        }
    }
}

/// Decoding task requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Transcribe,
    Translate,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Transcribe => "transcribe",
            Task::Translate => "translate",
        }
    }
}

/// Which model to load and where it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOptions {
    pub model: String,
    pub device: Device,
    pub precision: Precision,
}

impl ModelOptions {
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            model: config.model.clone(),
            device: config.device,
            precision: config.precision,
        }
    }
}

/// Voice-activity filtering parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VadOptions {
    pub min_silence_ms: u32,
}

/// Per-request decoding parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub task: Task,
    pub beam_size: usize,
    pub word_timestamps: bool,
    /// `None` disables voice-activity filtering
    pub vad: Option<VadOptions>,
    pub threads: usize,
}

impl DecodeOptions {
    pub fn for_request(request: &TranscriptionRequest, config: &TranscriptionConfig) -> Self {
        let task = if request.translate {
            Task::Translate
        } else {
            Task::Transcribe
        };

        let threads = if config.threads > 0 {
            config.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        };

        Self {
            task,
            beam_size: config.beam_size,
            word_timestamps: config.word_timestamps,
            vad: config.vad_filter.then_some(VadOptions {
                min_silence_ms: config.vad_min_silence_ms,
            }),
            threads,
        }
    }
}

/// Segment as produced by the engine, before trimming and rounding
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub text: String,
}

/// Summary metadata reported by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionInfo {
    /// Detected (or forced) source language code
    pub language: String,
    /// Audio duration in seconds
    pub duration: f64,
}

/// Lazy, consume-once sequence of decoded segments
pub type SegmentStream = Box<dyn Iterator<Item = RawSegment> + Send>;

/// Engine output for one audio file
pub struct Transcription {
    pub info: TranscriptionInfo,
    pub segments: SegmentStream,
}

/// Speech-to-text engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Decode an audio file with the given options
    async fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<Transcription>;
}

/// Timestamped span of decoded speech, as emitted in the JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl From<RawSegment> for Segment {
    fn from(raw: RawSegment) -> Self {
        Self {
            start: round_to_hundredths(raw.start),
            end: round_to_hundredths(raw.end),
            text: raw.text.trim().to_string(),
        }
    }
}

/// Success document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub language: String,
    pub duration: f64,
    pub segments: Vec<Segment>,
    pub translated: bool,
}

/// Failure document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
    pub text: String,
    pub segments: Vec<Segment>,
}

impl ErrorResult {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error: if message.trim().is_empty() {
                "unknown error".to_string()
            } else {
                message
            },
            text: String::new(),
            segments: Vec::new(),
        }
    }
}

/// Runs one request against a speech engine and shapes the result
pub struct Transcriber<E> {
    engine: E,
    config: TranscriptionConfig,
}

impl<E: SpeechEngine> Transcriber<E> {
    pub fn new(engine: E, config: TranscriptionConfig) -> Self {
        Self { engine, config }
    }

    pub async fn run(&self, request: &TranscriptionRequest) -> Result<TranscriptionResult> {
        let options = DecodeOptions::for_request(request, &self.config);
        tracing::info!(
            path = %request.audio_path.display(),
            task = options.task.as_str(),
            beam_size = options.beam_size,
            vad = options.vad.is_some(),
            "Starting transcription"
        );

        let Transcription { info, segments } = self
            .engine
            .transcribe(&request.audio_path, &options)
            .await?;

        let mut texts = Vec::new();
        let segments: Vec<Segment> = segments
            .map(Segment::from)
            .inspect(|segment| texts.push(segment.text.clone()))
            .collect();

        tracing::info!(
            language = %info.language,
            segments = segments.len(),
            duration = %crate::utils::format_duration(info.duration),
            "Transcription complete"
        );

        Ok(TranscriptionResult {
            text: texts.join(" "),
            language: info.language,
            duration: round_to_hundredths(info.duration),
            segments,
            translated: request.translate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScribeError;

    fn transcription(segments: Vec<RawSegment>, language: &str, duration: f64) -> Transcription {
        Transcription {
            info: TranscriptionInfo {
                language: language.to_string(),
                duration,
            },
            segments: Box::new(segments.into_iter()),
        }
    }

    fn raw(start: f64, end: f64, text: &str) -> RawSegment {
        RawSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_decode_options_follow_translate_flag() {
        let config = TranscriptionConfig::default();

        let opts = DecodeOptions::for_request(&TranscriptionRequest::new("a.mp3", false), &config);
        assert_eq!(opts.task, Task::Transcribe);
        assert_eq!(opts.beam_size, 5);
        assert!(opts.word_timestamps);
        assert_eq!(opts.vad, Some(VadOptions { min_silence_ms: 500 }));
        assert!(opts.threads > 0);

        let opts = DecodeOptions::for_request(&TranscriptionRequest::new("a.mp3", true), &config);
        assert_eq!(opts.task, Task::Translate);
    }

    #[test]
    fn test_vad_can_be_disabled() {
        let config = TranscriptionConfig {
            vad_filter: false,
            ..TranscriptionConfig::default()
        };
        let opts = DecodeOptions::for_request(&TranscriptionRequest::new("a.mp3", false), &config);
        assert_eq!(opts.vad, None);
    }

    #[tokio::test]
    async fn test_run_matches_reference_document() {
        let mut engine = MockSpeechEngine::new();
        engine
            .expect_transcribe()
            .withf(|path, opts| path == Path::new("talk.mp3") && opts.task == Task::Transcribe)
            .times(1)
            .returning(|_, _| {
                Ok(transcription(
                    vec![raw(0.0, 1.5, "hello"), raw(1.5, 3.2, "world")],
                    "en",
                    3.2,
                ))
            });

        let transcriber = Transcriber::new(engine, TranscriptionConfig::default());
        let result = transcriber
            .run(&TranscriptionRequest::new("talk.mp3", false))
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"text":"hello world","language":"en","duration":3.2,"segments":[{"start":0.0,"end":1.5,"text":"hello"},{"start":1.5,"end":3.2,"text":"world"}],"translated":false}"#
        );
    }

    #[tokio::test]
    async fn test_run_trims_rounds_and_keeps_order() {
        let mut engine = MockSpeechEngine::new();
        engine.expect_transcribe().returning(|_, _| {
            Ok(transcription(
                vec![
                    raw(0.0, 2.345678, "  first part "),
                    raw(2.345678, 4.001, " second"),
                    raw(4.5, 7.129, "third  "),
                ],
                "de",
                7.1299,
            ))
        });

        let transcriber = Transcriber::new(engine, TranscriptionConfig::default());
        let result = transcriber
            .run(&TranscriptionRequest::new("x.wav", false))
            .await
            .unwrap();

        assert_eq!(result.text, "first part second third");
        assert_eq!(result.language, "de");
        assert_eq!(result.duration, 7.13);

        let texts: Vec<&str> = result.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["first part", "second", "third"]);
        assert_eq!(result.segments[0].end, 2.35);
        assert_eq!(result.segments[1].start, 2.35);
        assert_eq!(result.segments[1].end, 4.0);

        for pair in result.segments.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
        for segment in &result.segments {
            assert!(segment.start <= segment.end);
            assert_eq!(segment.start, (segment.start * 100.0).round() / 100.0);
        }
    }

    #[tokio::test]
    async fn test_translate_flag_reaches_engine_and_document() {
        let mut engine = MockSpeechEngine::new();
        engine
            .expect_transcribe()
            .withf(|_, opts| opts.task == Task::Translate)
            .times(1)
            .returning(|_, _| Ok(transcription(vec![raw(0.0, 1.0, "hi")], "fr", 1.0)));

        let transcriber = Transcriber::new(engine, TranscriptionConfig::default());
        let result = transcriber
            .run(&TranscriptionRequest::new("x.wav", true))
            .await
            .unwrap();
        assert!(result.translated);
    }

    #[tokio::test]
    async fn test_engine_failure_propagates() {
        let mut engine = MockSpeechEngine::new();
        engine
            .expect_transcribe()
            .returning(|_, _| Err(ScribeError::AudioDecodingFailed("invalid data found".into())));

        let transcriber = Transcriber::new(engine, TranscriptionConfig::default());
        let err = transcriber
            .run(&TranscriptionRequest::new("broken.mp3", false))
            .await
            .unwrap_err();

        let doc = ErrorResult::new(err.to_string());
        assert_eq!(doc.error, "Audio decoding failed: invalid data found");
        assert!(doc.text.is_empty());
        assert!(doc.segments.is_empty());
    }

    #[test]
    fn test_error_result_never_empty() {
        assert_eq!(ErrorResult::new("").error, "unknown error");
        assert_eq!(
            serde_json::to_string(&ErrorResult::new("boom")).unwrap(),
            r#"{"error":"boom","text":"","segments":[]}"#
        );
    }
}
