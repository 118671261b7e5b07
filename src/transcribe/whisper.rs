use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use super::common::{RawSegment, TranscriptionMapper, TranscriptionOutput};
use super::SpeechToText;
use crate::config::{TranscriberConfig, TranscriptionTask};
use crate::error::{DubError, Result};
use crate::segment::WordTiming;

/// JSON written by the whisper CLI with `--output_format json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperOutput {
    #[serde(default)]
    pub text: String,
    pub segments: Vec<WhisperSegment>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub words: Vec<WhisperWord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
    pub probability: Option<f64>,
}

pub struct WhisperMapper;

impl TranscriptionMapper<WhisperOutput> for WhisperMapper {
    fn to_transcription(whisper_output: WhisperOutput) -> Result<TranscriptionOutput> {
        let segments = whisper_output
            .segments
            .into_iter()
            .map(|seg| RawSegment {
                start: seg.start,
                end: seg.end,
                text: seg.text.trim().to_string(),
                words: seg
                    .words
                    .into_iter()
                    .map(|w| WordTiming {
                        word: w.word.trim().to_string(),
                        start: w.start,
                        end: w.end,
                    })
                    .collect(),
            })
            .collect();

        Ok(TranscriptionOutput {
            detected_language: whisper_output.language.unwrap_or_else(|| "unknown".to_string()),
            segments,
        })
    }
}

/// Runs the `whisper` command line tool with word timestamps
pub struct WhisperCliTranscriber {
    config: TranscriberConfig,
}

impl WhisperCliTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    fn task_arg(&self) -> &'static str {
        match self.config.task {
            TranscriptionTask::Transcribe => "transcribe",
            TranscriptionTask::Translate => "translate",
        }
    }
}

#[async_trait]
impl SpeechToText for WhisperCliTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionOutput> {
        info!(
            "Transcribing {} with whisper ({} model, task {})",
            audio_path.display(),
            self.config.model,
            self.task_arg()
        );

        let temp_dir = tempfile::tempdir()?;
        let output_dir = temp_dir.path();

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg(audio_path)
            .arg("--model")
            .arg(&self.config.model)
            .arg("--task")
            .arg(self.task_arg())
            .arg("--word_timestamps")
            .arg("True")
            .arg("--output_dir")
            .arg(output_dir)
            .arg("--output_format")
            .arg("json");
        if let Some(lang) = language_hint {
            cmd.arg("--language").arg(lang);
        }
        debug!("Executing whisper: {:?}", cmd);

        let output = cmd.output().await.map_err(|e| {
            DubError::provider("whisper", format!("Failed to execute {}: {}", self.config.binary_path, e))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubError::provider("whisper", stderr.trim().to_string()));
        }

        let stem = audio_path
            .file_stem()
            .ok_or_else(|| DubError::provider("whisper", "Invalid audio filename"))?;
        let json_file = output_dir.join(format!("{}.json", stem.to_string_lossy()));
        let json_content = tokio::fs::read_to_string(&json_file).await.map_err(|e| {
            DubError::provider("whisper", format!("Failed to read {}: {}", json_file.display(), e))
        })?;

        let whisper_output: WhisperOutput = serde_json::from_str(&json_content)
            .map_err(|e| DubError::provider("whisper", format!("Failed to parse output: {}", e)))?;
        WhisperMapper::to_transcription(whisper_output)
    }
}
