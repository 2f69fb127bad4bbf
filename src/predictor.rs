//! The prediction service.
//!
//! [`Predictor`] is the single inference endpoint: it validates a
//! [`PredictRequest`], derives the conditioning tensors (frame-aligned lyric
//! tokens, style embedding, latent seed), runs the CFM sampler and VAE
//! decoder, and writes the waveform to a fresh temporary directory.
//!
//! Constructing the predictor is the one-time setup phase; the
//! [`ModelBundle`] it holds is immutable for the process lifetime and
//! `predict` can be called any number of times afterwards. Collaborator
//! failures propagate unchanged; there are no retries and no cleanup of
//! the output directory (that is the caller's or platform's job).

use std::path::{Path, PathBuf};

use candle_core::Tensor;
use serde::Deserialize;

use crate::audio;
use crate::config::{max_frames, PredictorConfig, SAMPLE_RATE, SUPPORTED_LENGTHS};
use crate::lyric;
use crate::model::{reference_latent, ModelBundle};
use crate::{Error, Result};

/// Minimum duration of a reference audio clip, in seconds.
pub const MIN_REF_AUDIO_SECS: f32 = 10.0;

/// A single generation request.
///
/// Exactly one of `ref_prompt` / `ref_audio_path` must be provided; empty
/// strings count as absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictRequest {
    /// Lyric to generate a song for, format: `[00:00.00]lyrics`.
    pub lyric: String,

    /// Length of the generated song in seconds.
    pub audio_length: u32,

    /// Text prompt to use as style reference.
    pub ref_prompt: Option<String>,

    /// Audio clip to use as style reference. Must be longer than
    /// [`MIN_REF_AUDIO_SECS`].
    pub ref_audio_path: Option<PathBuf>,
}

impl Default for PredictRequest {
    fn default() -> Self {
        Self {
            lyric: String::new(),
            audio_length: 95,
            ref_prompt: None,
            ref_audio_path: None,
        }
    }
}

/// The style reference a request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleReference {
    Text(String),
    Audio(PathBuf),
}

impl PredictRequest {
    /// Resolve the style reference, enforcing the exactly-one invariant.
    pub fn style_reference(&self) -> Result<StyleReference> {
        let prompt = self.ref_prompt.as_deref().filter(|p| !p.is_empty());
        let audio = self
            .ref_audio_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty());

        match (prompt, audio) {
            (Some(prompt), None) => Ok(StyleReference::Text(prompt.to_string())),
            (None, Some(audio)) => Ok(StyleReference::Audio(audio.to_path_buf())),
            (Some(_), Some(_)) => Err(Error::InvalidInput(
                "only one of ref_prompt or ref_audio_path should be provided".into(),
            )),
            (None, None) => Err(Error::InvalidInput(
                "either ref_prompt or ref_audio_path should be provided".into(),
            )),
        }
    }
}

/// Check the requested audio length and map it to the latent frame count.
fn validate_audio_length(audio_length_s: u32) -> Result<usize> {
    if !SUPPORTED_LENGTHS.contains(&audio_length_s) {
        return Err(Error::InvalidInput(format!(
            "audio_length must be one of {SUPPORTED_LENGTHS:?} seconds, got {audio_length_s}"
        )));
    }
    max_frames(audio_length_s).ok_or_else(|| {
        Error::InvalidInput(format!("no frame count for audio_length {audio_length_s}"))
    })
}

/// The inference endpoint. Holds the loaded [`ModelBundle`].
pub struct Predictor {
    bundle: ModelBundle,
    config: PredictorConfig,
}

impl Predictor {
    /// Wrap a loaded model bundle. This is the setup phase: once the
    /// predictor exists it is ready to serve requests.
    pub fn new(bundle: ModelBundle, config: PredictorConfig) -> Self {
        Self { bundle, config }
    }

    /// Run a single prediction, returning the path of the generated WAV.
    pub fn predict(&self, request: &PredictRequest) -> Result<PathBuf> {
        let style_reference = request.style_reference()?;
        let frames = validate_audio_length(request.audio_length)?;
        if let StyleReference::Audio(path) = &style_reference {
            self.check_reference_audio(path)?;
        }

        tracing::info!(
            audio_length_s = request.audio_length,
            frames,
            chunked = self.config.chunked,
            "starting prediction"
        );

        let (token_ids, start_time) = lyric::tokenize_lyrics(
            &request.lyric,
            self.bundle.tokenizer.as_ref(),
            request.audio_length,
            frames,
        )?;
        let lrc_tokens = Tensor::from_vec(token_ids, (1, frames), &self.bundle.device)?;

        let style = match &style_reference {
            StyleReference::Text(prompt) => self.bundle.muq.embed_text(prompt)?,
            StyleReference::Audio(path) => self.bundle.muq.embed_audio(path)?,
        };

        let cond = reference_latent(&self.bundle.device, frames)?;

        tracing::debug!(
            lrc = ?lrc_tokens.dims(),
            style = ?style.dims(),
            cond = ?cond.dims(),
            start_time,
            "conditioning ready"
        );

        let latents = self.bundle.cfm.sample(
            &cond,
            &lrc_tokens,
            frames,
            &style,
            &self.bundle.negative_style,
            start_time,
            self.config.chunked,
        )?;
        let waveform = self.bundle.vae.decode(&latents, self.config.chunked)?;

        let path = self.write_output(&waveform)?;
        tracing::info!(path = %path.display(), "prediction complete");
        Ok(path)
    }

    /// Reject a reference clip that is missing or (for WAV input) shorter
    /// than [`MIN_REF_AUDIO_SECS`]. Non-WAV containers are passed through
    /// to the style encoder unprobed.
    fn check_reference_audio(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::InvalidInput(format!(
                "reference audio not found: {}",
                path.display()
            )));
        }
        if let Some(duration) = audio::probe_wav_duration(path)? {
            if duration < MIN_REF_AUDIO_SECS {
                return Err(Error::InvalidInput(format!(
                    "reference audio must be longer than {MIN_REF_AUDIO_SECS} seconds, got {duration:.1}"
                )));
            }
        }
        Ok(())
    }

    /// Persist the waveform as `output.wav` in a fresh temp directory.
    fn write_output(&self, waveform: &Tensor) -> Result<PathBuf> {
        let (samples, channels) = audio::interleave(waveform)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("song-");
        let dir = match &self.config.output_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        // The output must outlive this call; the caller owns cleanup.
        let dir = dir.keep();

        let path = dir.join("output.wav");
        audio::write_wav(&path, &samples, SAMPLE_RATE, channels)?;
        Ok(path)
    }
}
