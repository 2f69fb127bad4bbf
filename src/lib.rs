//! DiffRhythm song-generation inference shim.
//!
//! A deployment wrapper around a lyric-plus-style conditioned song
//! generation pipeline. The shim validates requests, builds the
//! conditioning tensors the pipeline expects, invokes the model
//! collaborators and persists the waveform to a temporary WAV file.
//!
//! ## Request flow
//!
//! ```text
//! lyric "[00:00.00]…"  → LRC tokenizer → frame-aligned tokens ─┐
//! ref_prompt ──→ MuQ style encoder (text) ──→ style embedding ─┤
//! ref_audio ───→ MuQ style encoder (audio) ─┘                  ├→ CFM sampler
//! zero latent seed ────────────────────────────────────────────┘     ↓
//!                                                       latents [1, T, 64]
//!                                                                    ↓
//!                                                    VAE decode → waveform
//!                                                                    ↓
//!                                                  output.wav @ 44.1 kHz
//! ```
//!
//! The model internals (CFM, VAE, MuQ, tokenizer vocabulary) are opaque:
//! [`model`] defines the trait seams, and the crate only implements the
//! orchestration around them.
//!
//! ## Modules
//!
//! - [`predictor`] — the inference endpoint: validation + orchestration
//! - [`model`] — collaborator traits and the loaded [`model::ModelBundle`]
//! - [`lyric`] — timestamped-lyric parsing and frame alignment
//! - [`audio`] — WAV I/O and waveform conversion
//! - [`hub`] — tokenizer/negative-style asset download
//! - [`config`] — device selection and predictor options

pub mod audio;
pub mod config;
pub mod hub;
pub mod lyric;
pub mod model;
pub mod predictor;

mod error;

pub use error::{Error, Result};
