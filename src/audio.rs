//! Audio I/O utilities.
//!
//! WAV read/write at 44.1kHz plus waveform-tensor conversion.

mod wav;

pub use wav::{interleave, probe_wav_duration, read_wav, write_wav};
