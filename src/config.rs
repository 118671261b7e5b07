use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::emotion::Emotion;
use crate::error::{DubError, Result};
use crate::retry::RetryConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub tts: TtsConfig,
    pub lipsync: LipSyncConfig,
    pub media: MediaConfig,
    pub assembly: AssemblyConfig,
    pub retry: RetryConfig,
    pub validation: ValidationConfig,
    pub package: PackageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Source video to dub
    pub input_video: PathBuf,
    /// Video whose face drives lip-sync (defaults to the input video)
    pub face_video: Option<PathBuf>,
    /// Directory for intermediate artifacts, the manifest and logs
    pub work_dir: PathBuf,
    /// Directory for the final video, subtitles and report
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Path to the whisper CLI
    pub binary_path: String,
    /// Whisper model name (tiny, base, small, medium, large)
    pub model: String,
    /// Transcribe in the spoken language, or translate speech to English
    pub task: TranscriptionTask,
    /// Spoken-language hint passed to the engine
    pub language_hint: Option<String>,
    /// Collapse words repeated three or more times in a row
    pub collapse_repeats: bool,
    /// Skip extraction when the work dir already holds the extracted audio
    pub reuse_extracted_audio: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionTask {
    /// Keep the spoken language
    Transcribe,
    /// Emit English text regardless of the spoken language
    Translate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Which translation service to call
    pub provider: TranslationProvider,
    /// Ollama endpoint URL
    pub endpoint: String,
    /// Google web translate endpoint URL
    pub google_endpoint: String,
    /// LLM model (Ollama only)
    pub model: String,
    /// Language of the transcript text; detected when unset
    pub source_language: Option<String>,
    /// Language to dub into
    pub target_language: String,
    /// Concurrent translation calls
    pub concurrency: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    Ollama,
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Which synthesis service to call
    pub provider: TtsProvider,
    /// Voice name (edge-tts) or voice id (ElevenLabs)
    pub voice_id: String,
    /// Path to the edge-tts CLI
    pub binary_path: String,
    /// ElevenLabs API base URL
    pub endpoint: String,
    /// ElevenLabs model id
    pub model_id: String,
    /// ElevenLabs API key; falls back to ELEVENLABS_API_KEY
    pub api_key: Option<String>,
    /// Concurrent synthesis calls
    pub concurrency: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Voice knobs per emotion label
    pub emotion_presets: BTreeMap<String, SynthesisParams>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    Edge,
    ElevenLabs,
}

/// Numeric synthesis knobs applied for one emotion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    /// Relative speaking rate, 1.0 is the voice default
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_speed() -> f32 {
    1.0
}

impl SynthesisParams {
    pub const fn new(stability: f32, similarity_boost: f32, style: f32) -> Self {
        Self {
            stability,
            similarity_boost,
            style,
            speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LipSyncConfig {
    /// Python interpreter used to run Wav2Lip
    pub python_binary: String,
    /// Wav2Lip checkout containing inference.py
    pub wav2lip_root: PathBuf,
    /// Checkpoint path, relative to the Wav2Lip root unless absolute
    pub checkpoint: PathBuf,
    /// Frame downscale factor passed to Wav2Lip
    pub resize_factor: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_binary_path: String,
    /// Sample rate of the extracted speech track
    pub extract_sample_rate: u32,
    /// Bitrate of the assembled dubbed track
    pub audio_bitrate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Silence inserted between consecutive clips, in seconds
    pub padding_seconds: f64,
    /// File name of the assembled track inside the work dir
    pub output_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Audio/video duration difference still considered in sync, in seconds
    pub tolerance_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Re-mux the dubbed track into the lip-synced video instead of copying it
    pub remux: bool,
    /// File name of the final video inside the output dir
    pub final_video_name: String,
    /// Write an SRT file with the translated text next to the video
    pub write_subtitles: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_video: PathBuf::from("data/input_video.mp4"),
            face_video: None,
            work_dir: PathBuf::from("work"),
            output_dir: PathBuf::from("outputs"),
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper".to_string(),
            model: "medium".to_string(),
            task: TranscriptionTask::Transcribe,
            language_hint: None,
            collapse_repeats: true,
            reuse_extracted_audio: true,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::Ollama,
            endpoint: "http://localhost:11434".to_string(),
            google_endpoint: "https://translate.googleapis.com".to_string(),
            model: "llama3.2:3b".to_string(),
            source_language: None,
            target_language: "hi".to_string(),
            concurrency: 4,
            timeout_secs: 120,
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::Edge,
            voice_id: "hi-IN-SwaraNeural".to_string(),
            binary_path: "edge-tts".to_string(),
            endpoint: "https://api.elevenlabs.io".to_string(),
            model_id: "eleven_v3".to_string(),
            api_key: None,
            concurrency: 2,
            timeout_secs: 60,
            emotion_presets: default_emotion_presets(),
        }
    }
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        Self {
            python_binary: "python3".to_string(),
            wav2lip_root: PathBuf::from("Wav2Lip"),
            checkpoint: PathBuf::from("checkpoints/wav2lip_gan.pth"),
            resize_factor: 1,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            probe_binary_path: "ffprobe".to_string(),
            extract_sample_rate: 16000,
            audio_bitrate: "128k".to_string(),
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            padding_seconds: 0.2,
            output_name: "dubbed_audio.mp3".to_string(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { tolerance_seconds: 1.0 }
    }
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            remux: false,
            final_video_name: "final_dubbed_video.mp4".to_string(),
            write_subtitles: true,
        }
    }
}

/// Voice settings per emotion used when the config file names none.
pub fn default_emotion_presets() -> BTreeMap<String, SynthesisParams> {
    [
        (Emotion::Calm, SynthesisParams::new(0.5, 0.75, 0.5)),
        (Emotion::Instructional, SynthesisParams::new(0.5, 0.80, 0.5)),
        (Emotion::Warm, SynthesisParams::new(0.5, 0.85, 0.5)),
        (Emotion::Concerned, SynthesisParams::new(0.0, 0.80, 0.5)),
        (Emotion::Encouraging, SynthesisParams::new(0.0, 0.80, 0.5)),
        (Emotion::Serious, SynthesisParams::new(1.0, 0.75, 0.5)),
        (Emotion::Happy, SynthesisParams::new(0.0, 0.85, 0.5)),
        (Emotion::Gentle, SynthesisParams::new(0.5, 0.80, 0.5)),
        (
            Emotion::Excited,
            SynthesisParams { speed: 1.1, ..SynthesisParams::new(0.0, 0.85, 0.7) },
        ),
        (Emotion::Curious, SynthesisParams::new(0.3, 0.80, 0.6)),
        (Emotion::Neutral, SynthesisParams::new(0.5, 0.75, 0.5)),
    ]
    .into_iter()
    .map(|(emotion, params)| (emotion.as_str().to_string(), params))
    .collect()
}

impl TtsConfig {
    /// Preset for `emotion`, falling back to the neutral preset.
    pub fn params_for(&self, emotion: Emotion) -> Option<SynthesisParams> {
        self.emotion_presets
            .get(emotion.as_str())
            .or_else(|| self.emotion_presets.get(Emotion::Neutral.as_str()))
            .copied()
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DubError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| DubError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DubError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| DubError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.translate.concurrency == 0 || self.tts.concurrency == 0 {
            return Err(DubError::Config("concurrency must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(DubError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if !(self.assembly.padding_seconds.is_finite() && self.assembly.padding_seconds >= 0.0) {
            return Err(DubError::Config(
                "assembly.padding_seconds must be a finite non-negative number".to_string(),
            ));
        }
        if !(self.validation.tolerance_seconds.is_finite() && self.validation.tolerance_seconds >= 0.0) {
            return Err(DubError::Config(
                "validation.tolerance_seconds must be a finite non-negative number".to_string(),
            ));
        }
        for label in self.tts.emotion_presets.keys() {
            label
                .parse::<Emotion>()
                .map_err(|e| DubError::Config(format!("tts.emotion_presets: {}", e)))?;
        }
        Ok(())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.paths.work_dir.join("manifest.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [translate]
            provider = "google"
            target_language = "ta"

            [assembly]
            padding_seconds = 0.35
            "#,
        )
        .unwrap();

        assert_eq!(config.translate.provider, TranslationProvider::Google);
        assert_eq!(config.translate.target_language, "ta");
        assert_eq!(config.translate.concurrency, 4);
        assert_eq!(config.assembly.padding_seconds, 0.35);
        assert_eq!(config.validation.tolerance_seconds, 1.0);
        assert_eq!(config.retry.max_attempts, 3);
        config.validate().unwrap();
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redub.toml");
        Config::default().save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.tts.emotion_presets, default_emotion_presets());
        assert_eq!(loaded.media.binary_path, "ffmpeg");
    }

    #[test]
    fn test_emotion_preset_lookup_falls_back_to_neutral() {
        let mut tts = TtsConfig::default();
        tts.emotion_presets.remove("curious");
        let neutral = tts.emotion_presets["neutral"];
        assert_eq!(tts.params_for(Emotion::Curious), Some(neutral));
        assert_eq!(tts.params_for(Emotion::Serious).unwrap().stability, 1.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.assembly.padding_seconds = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.assembly.padding_seconds = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.validation.tolerance_seconds = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.validation.tolerance_seconds = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config
            .tts
            .emotion_presets
            .insert("furious".to_string(), SynthesisParams::new(0.1, 0.1, 0.1));
        assert!(config.validate().is_err());
    }
}
