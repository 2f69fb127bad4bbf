//! Model asset loading from the HuggingFace Hub.
//!
//! The shim only fetches the two small assets it consumes directly: the
//! lyric tokenizer vocabulary and the constant negative style prompt.
//! Model weights are the concern of the collaborator implementations.

use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use hf_hub::api::sync::Api;

use crate::model::{LyricTokenizer, STYLE_DIM};
use crate::{Error, Result};

/// Default model repository.
pub const DEFAULT_REPO: &str = "ASLP-lab/DiffRhythm-base";

/// Tokenizer vocabulary file within the repository.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Negative style prompt file within the repository.
pub const NEGATIVE_STYLE_FILE: &str = "negative_style_prompt.safetensors";

/// Tensor key inside [`NEGATIVE_STYLE_FILE`].
pub const NEGATIVE_STYLE_KEY: &str = "negative_style_prompt";

/// [`LyricTokenizer`] backed by a `tokenizers` vocabulary file.
pub struct HubTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HubTokenizer {
    /// Load from a local `tokenizer.json` (see [`fetch_tokenizer`]).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)?;
        Ok(Self { inner })
    }
}

impl LyricTokenizer for HubTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self.inner.encode(text, false)?;
        Ok(encoding.get_ids().to_vec())
    }
}

/// Download the tokenizer vocabulary, returning its local path.
pub fn fetch_tokenizer(repo: &str) -> Result<PathBuf> {
    let api = Api::new().map_err(|e| Error::HfHub(e.to_string()))?;
    api.model(repo.to_string())
        .get(TOKENIZER_FILE)
        .map_err(|e| Error::HfHub(e.to_string()))
}

/// Download and load the constant negative style prompt `[1, STYLE_DIM]`.
pub fn load_negative_style(repo: &str, device: &Device) -> Result<Tensor> {
    let api = Api::new().map_err(|e| Error::HfHub(e.to_string()))?;
    let file = api
        .model(repo.to_string())
        .get(NEGATIVE_STYLE_FILE)
        .map_err(|e| Error::HfHub(e.to_string()))?;

    let tensors = candle_core::safetensors::load(&file, device)?;
    let prompt = tensors.get(NEGATIVE_STYLE_KEY).ok_or_else(|| {
        Error::Model(format!(
            "negative style file is missing tensor '{NEGATIVE_STYLE_KEY}'"
        ))
    })?;
    Ok(prompt.to_dtype(DType::F32)?.reshape((1, STYLE_DIM))?)
}
