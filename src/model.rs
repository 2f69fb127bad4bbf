//! Model collaborator interfaces.
//!
//! The predictor treats the generative stack as four opaque collaborators:
//! the lyric tokenizer, the MuQ style encoder, the CFM flow-matching model
//! and the VAE audio codec. Each is a trait here; concrete implementations
//! live outside this crate (or in test mocks). [`ModelBundle`] groups the
//! loaded handles into the immutable context shared by every request.

use std::path::Path;

use candle_core::{DType, Device, Tensor};

use crate::{Error, Result};

/// Dimension of style embeddings (positive and negative).
pub const STYLE_DIM: usize = 512;

/// Channel dimension of the latent representation.
pub const LATENT_DIM: usize = 64;

/// Lyric-text tokenizer.
pub trait LyricTokenizer: Send + Sync {
    /// Encode one lyric line into token ids.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;
}

/// MuQ-based style encoder.
///
/// Both methods return an embedding of shape `[1, STYLE_DIM]`.
pub trait StyleEncoder: Send + Sync {
    /// Embed a free-text style prompt.
    fn embed_text(&self, prompt: &str) -> Result<Tensor>;

    /// Embed a reference audio clip read from `path`.
    fn embed_audio(&self, path: &Path) -> Result<Tensor>;
}

/// Conditional flow-matching generation model.
pub trait CfmModel: Send + Sync {
    /// Sample latents `[1, duration_frames, LATENT_DIM]` conditioned on the
    /// latent seed, frame-aligned lyric tokens and style embeddings.
    ///
    /// `start_time` is the normalized offset of the first lyric line in
    /// `[0, 1)`. `chunked` requests chunked execution to bound peak memory.
    #[allow(clippy::too_many_arguments)]
    fn sample(
        &self,
        cond: &Tensor,
        lrc_tokens: &Tensor,
        duration_frames: usize,
        style: &Tensor,
        negative_style: &Tensor,
        start_time: f32,
        chunked: bool,
    ) -> Result<Tensor>;
}

/// VAE audio codec (latent → waveform).
pub trait AudioCodec: Send + Sync {
    /// Decode latents `[1, T, LATENT_DIM]` into a waveform
    /// `[channels, samples]` at 44.1 kHz.
    fn decode(&self, latents: &Tensor, chunked: bool) -> Result<Tensor>;
}

/// The loaded model handles plus the constant negative style prompt.
///
/// Constructed once at process start, then shared read-only across all
/// requests for the lifetime of the process.
pub struct ModelBundle {
    pub cfm: Box<dyn CfmModel>,
    pub vae: Box<dyn AudioCodec>,
    pub muq: Box<dyn StyleEncoder>,
    pub tokenizer: Box<dyn LyricTokenizer>,
    pub negative_style: Tensor,
    pub device: Device,
}

impl ModelBundle {
    /// Assemble a bundle from loaded collaborators.
    ///
    /// `negative_style` must have shape `[1, STYLE_DIM]`.
    pub fn new(
        cfm: Box<dyn CfmModel>,
        vae: Box<dyn AudioCodec>,
        muq: Box<dyn StyleEncoder>,
        tokenizer: Box<dyn LyricTokenizer>,
        negative_style: Tensor,
        device: Device,
    ) -> Result<Self> {
        if negative_style.dims() != [1, STYLE_DIM] {
            return Err(Error::Model(format!(
                "negative style prompt must be [1, {STYLE_DIM}], got {:?}",
                negative_style.dims()
            )));
        }
        Ok(Self {
            cfm,
            vae,
            muq,
            tokenizer,
            negative_style,
            device,
        })
    }
}

/// Build the latent conditioning seed `[1, max_frames, LATENT_DIM]`.
pub fn reference_latent(device: &Device, max_frames: usize) -> Result<Tensor> {
    Ok(Tensor::zeros(
        (1, max_frames, LATENT_DIM),
        DType::F32,
        device,
    )?)
}
