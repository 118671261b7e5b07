#![allow(dead_code)]

use assert_fs::TempDir;
use assert_fs::prelude::*;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use redub::config::{Config, SynthesisParams};
use redub::error::{DubError, Result};
use redub::lipsync::LipSyncRenderer;
use redub::media::MediaToolchain;
use redub::pipeline::{Orchestrator, Providers};
use redub::retry::RetryConfig;
use redub::segment::WordTiming;
use redub::transcribe::{RawSegment, SpeechToText, TranscriptionOutput};
use redub::translate::Translator;
use redub::tts::SpeechSynthesizer;

pub const CLIP_SECONDS: f64 = 1.5;

/// Delay for staggered fakes: the higher the line number in `text`, the
/// sooner the call completes.
fn stagger_delay(text: &str) -> Duration {
    let number = text
        .split_whitespace()
        .find_map(|word| word.trim_end_matches('.').parse::<u64>().ok())
        .unwrap_or(0);
    Duration::from_millis(160u64.saturating_sub(number * 20))
}

/// Returns a fixed set of utterances.
pub struct FakeTranscriber {
    pub lines: Vec<String>,
}

#[async_trait]
impl SpeechToText for FakeTranscriber {
    async fn transcribe(&self, _audio: &Path, _hint: Option<&str>) -> Result<TranscriptionOutput> {
        let segments = self
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let start = index as f64 * 2.0;
                RawSegment {
                    start,
                    end: start + 1.8,
                    text: line.clone(),
                    words: vec![WordTiming {
                        word: line.split_whitespace().next().unwrap_or_default().to_string(),
                        start,
                        end: start + 0.3,
                    }],
                }
            })
            .collect();
        Ok(TranscriptionOutput {
            detected_language: "en".to_string(),
            segments,
        })
    }
}

/// Prefixes the target language; every call for text containing `FAIL` errors.
#[derive(Default)]
pub struct FakeTranslator {
    pub staggered: bool,
    pub calls: Mutex<Vec<String>>,
    pub completed: Mutex<Vec<String>>,
}

impl FakeTranslator {
    pub fn calls_for(&self, needle: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|text| text.contains(needle)).count()
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    fn name(&self) -> &str {
        "fake-translator"
    }

    async fn translate(
        &self,
        text: &str,
        _source: &str,
        target: &str,
        _context: Option<&str>,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.staggered {
            tokio::time::sleep(stagger_delay(text)).await;
        }
        if text.contains("FAIL") {
            return Err(DubError::provider("fake-translator", "HTTP 503: overloaded"));
        }
        self.completed.lock().unwrap().push(text.to_string());
        Ok(format!("[{}] {}", target, text))
    }

    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Writes the text to the output path, or always fails.
#[derive(Default)]
pub struct FakeSynthesizer {
    pub always_fail: bool,
    pub staggered: bool,
    pub calls: AtomicUsize,
    pub params_seen: Mutex<Vec<Option<SynthesisParams>>>,
    pub completed: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    pub fn staggered() -> Self {
        Self {
            staggered: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    fn name(&self) -> &str {
        "fake-tts"
    }

    async fn synthesize(
        &self,
        text: &str,
        _voice: &str,
        params: Option<&SynthesisParams>,
        output_path: &Path,
    ) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.params_seen.lock().unwrap().push(params.copied());
        if self.staggered {
            tokio::time::sleep(stagger_delay(text)).await;
        }
        if self.always_fail {
            return Err(DubError::provider("fake-tts", "quota exceeded"));
        }
        tokio::fs::write(output_path, text.as_bytes()).await?;
        self.completed.lock().unwrap().push(text.to_string());
        Ok(output_path.to_path_buf())
    }

    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// File-copying stand-in for ffmpeg; every artifact probes at `CLIP_SECONDS`.
#[derive(Default)]
pub struct FakeMedia {
    pub extractions: AtomicUsize,
    pub concatenated: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl MediaToolchain for FakeMedia {
    async fn extract_audio(&self, _video: &Path, audio: &Path) -> Result<()> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(audio, b"RIFF").await?;
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        if !path.exists() {
            return Err(DubError::FileNotFound(path.display().to_string()));
        }
        Ok(CLIP_SECONDS)
    }

    async fn concat(&self, clips: &[PathBuf], _padding: f64, output: &Path) -> Result<()> {
        *self.concatenated.lock().unwrap() = clips.to_vec();
        let listing: Vec<String> = clips.iter().map(|clip| clip.display().to_string()).collect();
        tokio::fs::write(output, listing.join("\n")).await?;
        Ok(())
    }

    async fn mux(&self, video: &Path, _audio: &Path, output: &Path) -> Result<()> {
        tokio::fs::copy(video, output).await?;
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Copies the face video to the output.
pub struct FakeLipSync;

#[async_trait]
impl LipSyncRenderer for FakeLipSync {
    async fn render(&self, face: &Path, _audio: &Path, output: &Path) -> Result<()> {
        tokio::fs::copy(face, output).await?;
        Ok(())
    }
}

pub struct Harness {
    pub temp: TempDir,
    pub config: Config,
    pub translator: Arc<FakeTranslator>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub media: Arc<FakeMedia>,
    pub lines: Vec<String>,
}

impl Harness {
    pub fn new(lines: &[&str]) -> Self {
        Self::with_synthesizer(lines, FakeSynthesizer::default())
    }

    pub fn with_synthesizer(lines: &[&str], synthesizer: FakeSynthesizer) -> Self {
        Self::with_fakes(lines, FakeTranslator::default(), synthesizer)
    }

    /// Providers that finish in reverse submission order, with every
    /// segment in flight at once.
    pub fn staggered(lines: &[&str]) -> Self {
        let translator = FakeTranslator {
            staggered: true,
            ..FakeTranslator::default()
        };
        let mut harness = Self::with_fakes(lines, translator, FakeSynthesizer::staggered());
        harness.config.translate.concurrency = lines.len();
        harness.config.tts.concurrency = lines.len();
        harness
    }

    pub fn with_fakes(lines: &[&str], translator: FakeTranslator, synthesizer: FakeSynthesizer) -> Self {
        let temp = TempDir::new().unwrap();
        temp.child("input.mp4").write_binary(b"not really a video").unwrap();

        let mut config = Config::default();
        config.paths.input_video = temp.path().join("input.mp4");
        config.paths.work_dir = temp.path().join("work");
        config.paths.output_dir = temp.path().join("outputs");
        config.retry = RetryConfig::new(3, std::time::Duration::from_millis(1));
        config.assembly.padding_seconds = 0.25;

        Self {
            temp,
            config,
            translator: Arc::new(translator),
            synthesizer: Arc::new(synthesizer),
            media: Arc::new(FakeMedia::default()),
            lines: lines.iter().map(|line| line.to_string()).collect(),
        }
    }

    /// A fresh orchestrator sharing this harness's fakes, as a new process would build.
    pub fn orchestrator(&self) -> Orchestrator {
        let providers = Providers {
            transcriber: Arc::new(FakeTranscriber {
                lines: self.lines.clone(),
            }),
            translator: self.translator.clone(),
            synthesizer: self.synthesizer.clone(),
            media: self.media.clone(),
            lipsync: Arc::new(FakeLipSync),
        };
        Orchestrator::new(self.config.clone(), providers)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.config.manifest_path()
    }
}
