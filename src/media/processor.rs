use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{MediaCommandBuilder, MediaToolchain, parse_probe_duration};
use crate::config::MediaConfig;
use crate::error::{DubError, Result};

/// ffmpeg/ffprobe backed media toolchain
pub struct FfmpegToolchain {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegToolchain {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder =
            MediaCommandBuilder::new(&config.binary_path, &config.probe_binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaToolchain for FfmpegToolchain {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        if let Some(parent) = audio_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.command_builder
            .extract_audio(video_path, audio_path, self.config.extract_sample_rate)
            .execute()
            .await?;

        info!("Audio extraction completed");
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        if !path.exists() {
            return Err(DubError::FileNotFound(path.display().to_string()));
        }
        let stdout = self.command_builder.probe_duration(path).execute_capture().await?;
        let seconds = parse_probe_duration(&stdout)?;
        debug!("{} lasts {:.3}s", path.display(), seconds);
        Ok(seconds)
    }

    async fn concat(&self, clips: &[PathBuf], padding: f64, output_path: &Path) -> Result<()> {
        if clips.is_empty() {
            return Err(DubError::Media("No clips to concatenate".to_string()));
        }
        info!(
            "Concatenating {} clips with {:.2}s padding into {}",
            clips.len(),
            padding,
            output_path.display()
        );

        self.command_builder
            .concat_with_padding(clips, padding, output_path, &self.config.audio_bitrate)
            .execute()
            .await
    }

    async fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()> {
        info!(
            "Muxing {} with {} -> {}",
            video_path.display(),
            audio_path.display(),
            output_path.display()
        );
        self.command_builder.mux(video_path, audio_path, output_path).execute().await
    }

    async fn check_availability(&self) -> Result<()> {
        self.command_builder.version_check().execute().await.map_err(|e| {
            DubError::Media(format!("Media processor not available: {}", e))
        })?;
        self.command_builder.probe_version_check().execute().await.map_err(|e| {
            DubError::Media(format!("Media probe not available: {}", e))
        })?;
        info!("Media toolchain is available");
        Ok(())
    }
}
