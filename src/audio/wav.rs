//! WAV file I/O.

use std::path::Path;

use candle_core::{DType, Tensor};

use crate::{Error, Result};

/// Read a WAV file, return (samples, sample_rate, num_channels).
///
/// Samples are interleaved f32 in [-1, 1].
pub fn read_wav(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32, u16)> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok((samples, sample_rate, channels))
}

/// Write interleaved f32 samples as a WAV file.
pub fn write_wav(
    path: impl AsRef<Path>,
    samples: &[f32],
    sample_rate: u32,
    num_channels: u16,
) -> Result<()> {
    let spec = hound::WavSpec {
        channels: num_channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Duration in seconds of a WAV file, or `None` if the file is not
/// parseable WAV (other containers are left to the style encoder).
pub fn probe_wav_duration(path: impl AsRef<Path>) -> Result<Option<f32>> {
    match hound::WavReader::open(path) {
        Ok(reader) => {
            let spec = reader.spec();
            Ok(Some(reader.duration() as f32 / spec.sample_rate as f32))
        }
        Err(_) => Ok(None),
    }
}

/// Convert a `[channels, samples]` waveform tensor to interleaved f32.
///
/// Returns the samples and the channel count.
pub fn interleave(waveform: &Tensor) -> Result<(Vec<f32>, u16)> {
    let (channels, samples) = waveform.dims2()?;
    if channels == 0 || channels > u16::MAX as usize {
        return Err(Error::Audio(format!(
            "waveform has unusable channel count {channels}"
        )));
    }
    let rows = waveform.to_dtype(DType::F32)?.to_vec2::<f32>()?;
    let mut out = Vec::with_capacity(channels * samples);
    for i in 0..samples {
        for row in &rows {
            out.push(row[i]);
        }
    }
    Ok((out, channels as u16))
}
