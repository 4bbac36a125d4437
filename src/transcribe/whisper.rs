use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperVadParams,
};

use super::audio;
use super::model::{ensure_models, ModelFiles};
use super::{DecodeOptions, ModelOptions, RawSegment, SpeechEngine, Task, Transcription, TranscriptionInfo};
use crate::config::{Config, Device};
use crate::{Result, ScribeError};

/// Whisper engine backed by whisper.cpp. The model is loaded once per engine.
pub struct WhisperEngine {
    ctx: Arc<WhisperContext>,
    vad_model_path: Option<String>,
    ffmpeg_path: String,
}

/// whisper.cpp takes model paths as C strings
fn model_path_str<'a>(path: &'a Path, what: &str) -> Result<&'a str> {
    path.to_str().ok_or_else(|| ScribeError::ModelLoad {
        path: path.display().to_string(),
        message: format!("{what} path contains invalid UTF-8"),
    })
}

impl WhisperEngine {
    /// Determines sampling strategy based on beam size
    fn sampling_strategy(beam_size: i32) -> SamplingStrategy {
        if beam_size > 1 {
            SamplingStrategy::BeamSearch {
                beam_size,
                patience: -1.0,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        }
    }

    /// Load the ggml model at `model_path`
    pub fn load(
        model_path: &Path,
        device: Device,
        vad_model_path: Option<PathBuf>,
        ffmpeg_path: impl Into<String>,
    ) -> Result<Self> {
        let path_str = model_path_str(model_path, "model")?;
        let vad_model_path = vad_model_path
            .as_deref()
            .map(|path| model_path_str(path, "VAD model").map(str::to_string))
            .transpose()?;

        tracing::info!(path = %model_path.display(), ?device, "loading whisper model");

        let mut params = WhisperContextParameters::default();
        params.use_gpu = device == Device::Gpu;

        let ctx = WhisperContext::new_with_params(path_str, params).map_err(|e| {
            ScribeError::ModelLoad {
                path: model_path.display().to_string(),
                message: format!("{e:?}"),
            }
        })?;

        tracing::info!("whisper model loaded");

        Ok(Self {
            ctx: Arc::new(ctx),
            vad_model_path,
            ffmpeg_path: ffmpeg_path.into(),
        })
    }

    /// Fetch missing model files for `config`, then load the model on a blocking thread
    pub async fn provision(config: &Config, show_progress: bool) -> anyhow::Result<Self> {
        let settings = &config.transcription;
        let model = ModelOptions::from_config(settings);
        let files = ModelFiles::in_dir(&config.model_dir()?, &model);
        ensure_models(
            &files,
            &model,
            settings.vad_filter,
            settings.auto_download,
            show_progress,
        )
        .await?;

        let vad_path = settings.vad_filter.then(|| files.vad.clone());
        let ffmpeg_path = settings.ffmpeg_path.clone();
        let engine = tokio::task::spawn_blocking(move || {
            Self::load(&files.model, model.device, vad_path, ffmpeg_path)
        })
        .await
        .map_err(|e| ScribeError::TranscriptionFailed(format!("model load task failed: {e}")))??;

        Ok(engine)
    }

    /// Run inference over 16 kHz mono samples. Blocks the calling thread.
    fn decode(
        ctx: &WhisperContext,
        samples: &[f32],
        options: &DecodeOptions,
        vad_model_path: Option<&str>,
    ) -> Result<(String, Vec<RawSegment>)> {
        let _span = tracing::debug_span!("inference", samples = samples.len()).entered();

        let beam_size = i32::try_from(options.beam_size)
            .map_err(|_| ScribeError::TranscriptionFailed("beam size too large".to_string()))?;
        let threads = i32::try_from(options.threads).unwrap_or(i32::MAX);

        let mut state = ctx.create_state().map_err(|e| {
            ScribeError::TranscriptionFailed(format!("failed to create whisper state: {e:?}"))
        })?;

        let mut params = FullParams::new(Self::sampling_strategy(beam_size));
        params.set_n_threads(threads);
        params.set_translate(options.task == Task::Translate);
        params.set_language(None); // auto-detect
        params.set_token_timestamps(options.word_timestamps);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        if let (Some(vad), Some(vad_model)) = (options.vad, vad_model_path) {
            let mut vad_params = WhisperVadParams::new();
            vad_params.set_min_silence_duration(i32::try_from(vad.min_silence_ms).unwrap_or(i32::MAX));
            params.enable_vad(true);
            params.set_vad_model_path(Some(vad_model));
            params.set_vad_params(vad_params);
        }

        let start = std::time::Instant::now();
        state
            .full(params, samples)
            .map_err(|e| ScribeError::TranscriptionFailed(format!("whisper inference failed: {e:?}")))?;

        let language = whisper_rs::get_lang_str(state.full_lang_id_from_state())
            .unwrap_or("unknown")
            .to_string();

        let mut segments = Vec::new();
        for segment in state.as_iter() {
            let text = segment
                .to_str_lossy()
                .map_err(|e| ScribeError::TranscriptionFailed(format!("{e:?}")))?;
            // whisper timestamps are in centiseconds
            segments.push(RawSegment {
                start: segment.start_timestamp() as f64 / 100.0,
                end: segment.end_timestamp() as f64 / 100.0,
                text: text.into_owned(),
            });
        }

        tracing::debug!(
            segments = segments.len(),
            inference_ms = start.elapsed().as_millis(),
            "inference completed"
        );

        Ok((language, segments))
    }
}

#[async_trait]
impl SpeechEngine for WhisperEngine {
    async fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<Transcription> {
        let samples = audio::decode_to_pcm(&self.ffmpeg_path, audio_path).await?;
        let duration = audio::duration_secs(&samples);

        let ctx = Arc::clone(&self.ctx);
        let options = options.clone();
        let vad_model = self.vad_model_path.clone();

        let (language, segments) = tokio::task::spawn_blocking(move || {
            Self::decode(&ctx, &samples, &options, vad_model.as_deref())
        })
        .await
        .map_err(|e| ScribeError::TranscriptionFailed(format!("inference task failed: {e}")))??;

        Ok(Transcription {
            info: TranscriptionInfo { language, duration },
            segments: Box::new(segments.into_iter()),
        })
    }
}
