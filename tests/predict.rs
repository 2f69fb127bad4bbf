//! End-to-end predict flow with mock collaborators.
//!
//! The CFM, VAE, style encoder and tokenizer are stand-ins: the CFM records
//! the conditioning it receives and the codec emits one second of stereo
//! sine wave. This exercises the whole shim without model weights.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use candle_core::{DType, Device, Tensor};

use diffrhythm_rs::audio::{read_wav, write_wav};
use diffrhythm_rs::config::{DeviceSpec, PredictorConfig, SAMPLE_RATE};
use diffrhythm_rs::model::{
    AudioCodec, CfmModel, LyricTokenizer, ModelBundle, StyleEncoder, LATENT_DIM, STYLE_DIM,
};
use diffrhythm_rs::predictor::{PredictRequest, Predictor};
use diffrhythm_rs::{Error, Result};

struct CharTokenizer;

impl LyricTokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.chars().map(|c| c as u32).collect())
    }
}

#[derive(Default)]
struct MockStyleEncoder {
    used_audio: Arc<AtomicBool>,
}

impl StyleEncoder for MockStyleEncoder {
    fn embed_text(&self, _prompt: &str) -> Result<Tensor> {
        Ok(Tensor::full(0.5f32, (1, STYLE_DIM), &Device::Cpu)?)
    }

    fn embed_audio(&self, path: &Path) -> Result<Tensor> {
        assert!(path.exists());
        self.used_audio.store(true, Ordering::SeqCst);
        Ok(Tensor::full(0.25f32, (1, STYLE_DIM), &Device::Cpu)?)
    }
}

#[derive(Default)]
struct RecordingCfm {
    frames_seen: Arc<AtomicUsize>,
}

impl CfmModel for RecordingCfm {
    fn sample(
        &self,
        cond: &Tensor,
        lrc_tokens: &Tensor,
        duration_frames: usize,
        style: &Tensor,
        negative_style: &Tensor,
        start_time: f32,
        _chunked: bool,
    ) -> Result<Tensor> {
        assert_eq!(cond.dims(), [1, duration_frames, LATENT_DIM]);
        assert_eq!(lrc_tokens.dims(), [1, duration_frames]);
        assert_eq!(style.dims(), [1, STYLE_DIM]);
        assert_eq!(negative_style.dims(), [1, STYLE_DIM]);
        assert!((0.0..=1.0).contains(&start_time));
        self.frames_seen.store(duration_frames, Ordering::SeqCst);
        Ok(Tensor::zeros(
            (1, duration_frames, LATENT_DIM),
            DType::F32,
            &Device::Cpu,
        )?)
    }
}

struct SineCodec;

impl AudioCodec for SineCodec {
    fn decode(&self, latents: &Tensor, _chunked: bool) -> Result<Tensor> {
        assert_eq!(latents.dim(2).unwrap(), LATENT_DIM);
        let samples = SAMPLE_RATE as usize;
        let mono: Vec<f32> = (0..samples)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.8
            })
            .collect();
        let mut stereo = mono.clone();
        stereo.extend_from_slice(&mono);
        Ok(Tensor::from_vec(stereo, (2, samples), &Device::Cpu)?)
    }
}

struct TestHarness {
    predictor: Predictor,
    frames_seen: Arc<AtomicUsize>,
    used_audio: Arc<AtomicBool>,
    // Holds the output parent directory so it is cleaned up after the test.
    _output_root: tempfile::TempDir,
}

fn harness() -> TestHarness {
    let frames_seen = Arc::new(AtomicUsize::new(0));
    let used_audio = Arc::new(AtomicBool::new(false));
    let output_root = tempfile::tempdir().unwrap();

    let config = PredictorConfig {
        device: DeviceSpec::Cpu,
        output_dir: Some(output_root.path().to_path_buf()),
        ..Default::default()
    };
    let device = config.device.device().unwrap();

    let bundle = ModelBundle::new(
        Box::new(RecordingCfm {
            frames_seen: frames_seen.clone(),
        }),
        Box::new(SineCodec),
        Box::new(MockStyleEncoder {
            used_audio: used_audio.clone(),
        }),
        Box::new(CharTokenizer),
        Tensor::zeros((1, STYLE_DIM), DType::F32, &device).unwrap(),
        device,
    )
    .unwrap();

    TestHarness {
        predictor: Predictor::new(bundle, config),
        frames_seen,
        used_audio,
        _output_root: output_root,
    }
}

fn text_request(lyric: &str) -> PredictRequest {
    PredictRequest {
        lyric: lyric.to_string(),
        audio_length: 95,
        ref_prompt: Some("uplifting pop".to_string()),
        ref_audio_path: None,
    }
}

/// Write a WAV reference clip of the given duration next to the test.
fn reference_clip(dir: &Path, name: &str, seconds: f32) -> PathBuf {
    let path = dir.join(name);
    let samples = (SAMPLE_RATE as f32 * seconds) as usize;
    write_wav(&path, &vec![0.1f32; samples], SAMPLE_RATE, 1).unwrap();
    path
}

#[test]
fn predict_with_text_prompt_writes_valid_wav() {
    let h = harness();
    let path = h
        .predictor
        .predict(&text_request("[00:00.00]hello world"))
        .unwrap();

    assert!(path.exists());
    assert_eq!(path.file_name().unwrap(), "output.wav");

    let (samples, sample_rate, channels) = read_wav(&path).unwrap();
    assert_eq!(sample_rate, 44100);
    assert_eq!(channels, 2);
    assert!(!samples.is_empty());
    // non-zero duration with actual signal in it
    assert!(samples.iter().any(|s| s.abs() > 0.1));
}

#[test]
fn predict_uses_2048_frames_for_95_seconds() {
    let h = harness();
    h.predictor
        .predict(&text_request("[00:00.00]hello"))
        .unwrap();
    assert_eq!(h.frames_seen.load(Ordering::SeqCst), 2048);
}

#[test]
fn predict_rejects_missing_style_reference() {
    let h = harness();
    let request = PredictRequest {
        lyric: "[00:00.00]hello".to_string(),
        audio_length: 95,
        ref_prompt: Some(String::new()),
        ref_audio_path: Some(PathBuf::new()),
    };
    assert!(matches!(
        h.predictor.predict(&request),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn predict_rejects_both_style_references() {
    let h = harness();
    let request = PredictRequest {
        ref_prompt: Some("x".to_string()),
        ref_audio_path: Some(PathBuf::from("y.wav")),
        ..Default::default()
    };
    assert!(matches!(
        h.predictor.predict(&request),
        Err(Error::InvalidInput(_))
    ));
    // validation failed before any model work
    assert_eq!(h.frames_seen.load(Ordering::SeqCst), 0);
}

#[test]
fn predict_rejects_unsupported_audio_lengths() {
    let h = harness();
    for length in [285u32, 30, 0] {
        let request = PredictRequest {
            audio_length: length,
            ..text_request("[00:00.00]hello")
        };
        assert!(
            matches!(h.predictor.predict(&request), Err(Error::InvalidInput(_))),
            "audio_length {length} should be rejected"
        );
    }
}

#[test]
fn predict_with_audio_reference() {
    let h = harness();
    let clips = tempfile::tempdir().unwrap();
    let reference = reference_clip(clips.path(), "ref.wav", 12.0);

    let request = PredictRequest {
        lyric: "[00:00.00]hello".to_string(),
        audio_length: 95,
        ref_prompt: None,
        ref_audio_path: Some(reference),
    };
    let path = h.predictor.predict(&request).unwrap();
    assert!(path.exists());
    assert!(h.used_audio.load(Ordering::SeqCst));
}

#[test]
fn predict_rejects_short_audio_reference() {
    let h = harness();
    let clips = tempfile::tempdir().unwrap();
    let reference = reference_clip(clips.path(), "short.wav", 3.0);

    let request = PredictRequest {
        ref_audio_path: Some(reference),
        ..Default::default()
    };
    assert!(matches!(
        h.predictor.predict(&request),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn predict_rejects_missing_audio_reference() {
    let h = harness();
    let request = PredictRequest {
        ref_audio_path: Some(PathBuf::from("/nonexistent/ref.wav")),
        ..Default::default()
    };
    assert!(matches!(
        h.predictor.predict(&request),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn predict_propagates_collaborator_errors() {
    struct FailingCodec;

    impl AudioCodec for FailingCodec {
        fn decode(&self, _latents: &Tensor, _chunked: bool) -> Result<Tensor> {
            Err(Error::Model("vae decode blew up".into()))
        }
    }

    let bundle = ModelBundle::new(
        Box::new(RecordingCfm::default()),
        Box::new(FailingCodec),
        Box::new(MockStyleEncoder::default()),
        Box::new(CharTokenizer),
        Tensor::zeros((1, STYLE_DIM), DType::F32, &Device::Cpu).unwrap(),
        Device::Cpu,
    )
    .unwrap();
    let predictor = Predictor::new(bundle, PredictorConfig::default());

    match predictor.predict(&text_request("[00:00.00]hello")) {
        Err(Error::Model(message)) => assert!(message.contains("vae decode blew up")),
        other => panic!("expected Model error, got {other:?}"),
    }
}

#[test]
fn predict_rejects_malformed_lyrics() {
    let h = harness();
    let request = text_request("this line has no timestamp");
    assert!(matches!(
        h.predictor.predict(&request),
        Err(Error::InvalidInput(_))
    ));
}
