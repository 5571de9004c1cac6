use std::collections::HashSet;
use std::f32::consts::PI;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ndarray::Array3;

use audiogen_daemon::error::{ErrorCode, GenError, Result};
use audiogen_daemon::generator::{AudioGenerator, GeneratorMode, ModelGenerator, SynthGenerator};
use audiogen_daemon::models::{ModelLoader, MusicModel};

/// 440 Hz sine at 32kHz, as long as the last `set_duration` asked for.
struct FakeModel {
    duration_sec: f32,
}

impl MusicModel for FakeModel {
    fn native_sample_rate(&self) -> u32 {
        32000
    }

    fn set_duration(&mut self, duration_sec: f32) {
        self.duration_sec = duration_sec;
    }

    fn generate(&mut self, prompt: &str) -> Result<Array3<f32>> {
        if prompt.contains("explode") {
            return Err(GenError::invalid_input("model rejected the prompt"));
        }
        let samples = (self.duration_sec * 32000.0).round() as usize;
        Ok(Array3::from_shape_fn((1, 1, samples), |(_, _, i)| {
            0.5 * (2.0 * PI * 440.0 * i as f32 / 32000.0).sin()
        }))
    }

    fn device(&self) -> &str {
        "cpu"
    }

    fn version(&self) -> &str {
        "fake-v1"
    }
}

#[derive(Clone, Default)]
struct FakeLoader {
    loads: Arc<AtomicUsize>,
    fail: bool,
}

impl ModelLoader for FakeLoader {
    type Model = FakeModel;

    fn load(&self) -> Result<FakeModel> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        // widen the window for racing first requests
        thread::sleep(Duration::from_millis(50));
        if self.fail {
            return Err(GenError::new(ErrorCode::ModelNotFound, "no model files"));
        }
        Ok(FakeModel { duration_sec: 3.0 })
    }
}

fn read_wav(path: &Path) -> (hound::WavSpec, Vec<f32>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test]
fn synth_writes_playable_44k_wav() {
    let dir = tempfile::tempdir().unwrap();
    let generator = SynthGenerator::new(dir.path());

    let clip = generator.generate("bell", 2.0).unwrap();
    let (spec, samples) = read_wav(&clip.path);

    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(samples.len(), 88200);

    let peak = samples.iter().fold(0.0f32, |a, s| a.max(s.abs()));
    assert!((peak - 0.8).abs() < 1e-5, "peak {}", peak);
}

#[test]
fn synth_is_deterministic_per_prompt_class() {
    let dir = tempfile::tempdir().unwrap();
    let generator = SynthGenerator::new(dir.path());

    let bell = generator.generate("bell", 1.0).unwrap();
    let other = generator.generate("xylophone", 1.0).unwrap();
    let bass = generator.generate("deep bass synth", 1.0).unwrap();

    assert_ne!(bell.path, other.path);
    assert_eq!(read_wav(&bell.path).1, read_wav(&other.path).1);
    assert_ne!(read_wav(&bell.path).1, read_wav(&bass.path).1);
}

#[test]
fn synth_rejects_empty_prompt_and_bad_duration() {
    let dir = tempfile::tempdir().unwrap();
    let generator = SynthGenerator::new(dir.path());

    assert_eq!(generator.generate("", 1.0).unwrap_err().code, ErrorCode::InvalidInput);
    assert_eq!(generator.generate("bell", 0.0).unwrap_err().code, ErrorCode::InvalidInput);
    assert_eq!(generator.generate("bell", -2.0).unwrap_err().code, ErrorCode::InvalidInput);
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn concurrent_synth_calls_get_distinct_paths() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(SynthGenerator::new(dir.path()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let generator = Arc::clone(&generator);
            thread::spawn(move || generator.generate("lead square arp", 0.25).unwrap().path)
        })
        .collect();

    let paths: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(paths.len(), 8);
    assert_eq!(file_count(dir.path()), 8);
}

#[test]
fn model_output_is_resampled_to_44k() {
    let dir = tempfile::tempdir().unwrap();
    let generator = ModelGenerator::new(FakeLoader::default(), dir.path());

    let clip = generator.generate("ambient pad", 2.0).unwrap();
    let (spec, samples) = read_wav(&clip.path);

    assert_eq!(clip.sample_rate, 44100);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.channels, 1);
    // 64000 samples at 32kHz is exactly 2s
    assert_eq!(samples.len(), 88200);
}

#[test]
fn duration_is_applied_per_request() {
    let dir = tempfile::tempdir().unwrap();
    let generator = ModelGenerator::new(FakeLoader::default(), dir.path());

    let long = generator.generate("rain", 1.0).unwrap();
    let short = generator.generate("rain", 0.5).unwrap();

    assert_eq!(read_wav(&long.path).1.len(), 44100);
    assert_eq!(read_wav(&short.path).1.len(), 22050);
}

#[test]
fn model_loads_once_under_concurrent_first_requests() {
    let dir = tempfile::tempdir().unwrap();
    let loader = FakeLoader::default();
    let loads = Arc::clone(&loader.loads);
    let generator = Arc::new(ModelGenerator::new(loader, dir.path()));

    assert!(!generator.is_ready());
    assert_eq!(generator.mode(), GeneratorMode::Model);

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let generator = Arc::clone(&generator);
            thread::spawn(move || generator.generate(&format!("prompt {}", i), 0.2).unwrap().path)
        })
        .collect();

    let paths: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(paths.len(), 6);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(generator.is_ready());
}

#[test]
fn init_failure_is_sticky() {
    let dir = tempfile::tempdir().unwrap();
    let loader = FakeLoader {
        fail: true,
        ..FakeLoader::default()
    };
    let loads = Arc::clone(&loader.loads);
    let generator = ModelGenerator::new(loader, dir.path());

    let first = generator.generate("bell", 1.0).unwrap_err();
    let second = generator.generate("bell", 1.0).unwrap_err();

    assert_eq!(first.code, ErrorCode::ModelNotFound);
    assert_eq!(second.code, ErrorCode::ModelNotFound);
    assert_eq!(second.message, first.message);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(!generator.is_ready());
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn request_failure_does_not_poison_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let generator = ModelGenerator::new(FakeLoader::default(), dir.path());

    let err = generator.generate("explode", 1.0).unwrap_err();
    assert_eq!(err.code, ErrorCode::GenerationFailed);
    assert_eq!(file_count(dir.path()), 0);

    assert!(generator.generate("calm piano", 0.5).is_ok());
}

#[test]
fn invalid_input_is_rejected_before_loading() {
    let dir = tempfile::tempdir().unwrap();
    let loader = FakeLoader::default();
    let loads = Arc::clone(&loader.loads);
    let generator = ModelGenerator::new(loader, dir.path());

    assert_eq!(generator.generate("   ", 1.0).unwrap_err().code, ErrorCode::InvalidInput);
    assert_eq!(generator.generate("bell", f32::NAN).unwrap_err().code, ErrorCode::InvalidInput);
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}
