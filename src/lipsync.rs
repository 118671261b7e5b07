//! Lip-sync rendering through an external long-running process.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::LipSyncConfig;
use crate::error::{DubError, Result};

/// Re-renders a face video so the mouth follows the driving audio
#[async_trait]
pub trait LipSyncRenderer: Send + Sync {
    async fn render(&self, face_video: &Path, driving_audio: &Path, output_path: &Path) -> Result<()>;
}

/// Wav2Lip `inference.py`
pub struct Wav2LipRenderer {
    config: LipSyncConfig,
}

impl Wav2LipRenderer {
    pub fn new(config: LipSyncConfig) -> Self {
        Self { config }
    }

    fn checkpoint(&self) -> PathBuf {
        if self.config.checkpoint.is_absolute() {
            self.config.checkpoint.clone()
        } else {
            self.config.wav2lip_root.join(&self.config.checkpoint)
        }
    }

    pub fn build_args(&self, face_video: &Path, driving_audio: &Path, output_path: &Path) -> Vec<String> {
        vec![
            "inference.py".to_string(),
            "--checkpoint_path".to_string(),
            self.checkpoint().to_string_lossy().to_string(),
            "--face".to_string(),
            absolute(face_video),
            "--audio".to_string(),
            absolute(driving_audio),
            "--outfile".to_string(),
            absolute(output_path),
            "--resize_factor".to_string(),
            self.config.resize_factor.to_string(),
        ]
    }
}

/// Wav2Lip runs from its own directory, so relative paths must be resolved first.
fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

#[async_trait]
impl LipSyncRenderer for Wav2LipRenderer {
    async fn render(&self, face_video: &Path, driving_audio: &Path, output_path: &Path) -> Result<()> {
        for input in [face_video, driving_audio] {
            if !input.exists() {
                return Err(DubError::FileNotFound(input.display().to_string()));
            }
        }
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.build_args(face_video, driving_audio, output_path);
        info!("Running Wav2Lip on {} (this can take a while)", face_video.display());
        debug!("Executing {} {:?}", self.config.python_binary, args);

        let output = Command::new(&self.config.python_binary)
            .args(&args)
            .current_dir(&self.config.wav2lip_root)
            .output()
            .await
            .map_err(|e| DubError::LipSync(format!("Failed to launch Wav2Lip: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(DubError::LipSync(format!(
                "Wav2Lip exited with {}: {}",
                output.status,
                tail.into_iter().rev().collect::<Vec<_>>().join("\n")
            )));
        }

        let size = tokio::fs::metadata(output_path).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(DubError::LipSync(format!(
                "Wav2Lip reported success but {} is missing or empty",
                output_path.display()
            )));
        }

        info!("Lip-synced video written to {}", output_path.display());
        Ok(())
    }
}
