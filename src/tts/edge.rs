use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use super::SpeechSynthesizer;
use crate::config::{SynthesisParams, TtsConfig};
use crate::error::{DubError, Result};

const PROVIDER: &str = "edge-tts";

/// Microsoft Edge neural voices through the `edge-tts` CLI
pub struct EdgeTtsSynthesizer {
    binary_path: String,
}

impl EdgeTtsSynthesizer {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            binary_path: config.binary_path.clone(),
        }
    }

    /// `--rate` argument for a relative speed, if it differs from the default.
    pub fn rate_arg(params: Option<&SynthesisParams>) -> Option<String> {
        let speed = params.map(|p| p.speed).unwrap_or(1.0);
        let percent = ((speed - 1.0) * 100.0).round() as i32;
        (percent != 0).then(|| format!("--rate={:+}%", percent))
    }

    pub fn build_args(
        text: &str,
        voice_id: &str,
        params: Option<&SynthesisParams>,
        output_path: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "--voice".to_string(),
            voice_id.to_string(),
            format!("--text={}", text),
            "--write-media".to_string(),
            output_path.to_string_lossy().to_string(),
        ];
        args.extend(Self::rate_arg(params));
        args
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTtsSynthesizer {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        params: Option<&SynthesisParams>,
        output_path: &Path,
    ) -> Result<PathBuf> {
        let args = Self::build_args(text, voice_id, params, output_path);
        debug!("Executing {} {:?}", self.binary_path, args);

        let output = Command::new(&self.binary_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| DubError::provider(PROVIDER, format!("Failed to execute: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubError::provider(PROVIDER, stderr.trim().to_string()));
        }

        let size = tokio::fs::metadata(output_path).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(DubError::provider(PROVIDER, "no audio written"));
        }
        Ok(output_path.to_path_buf())
    }

    async fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| DubError::Config(format!("{} not found: {}", self.binary_path, e)))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(DubError::Config(format!("{} version check failed", self.binary_path)))
        }
    }
}
