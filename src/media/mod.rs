// Media toolchain abstraction
//
// - Processor: ffmpeg/ffprobe implementation of the toolchain trait
// - Commands: command builders and output parsing

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Container and codec operations the pipeline delegates to external tools
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaToolchain: Send + Sync {
    /// Extract the speech track from a video
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Duration of an audio or video artifact in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Join clips in the given order with `padding` seconds of silence between them
    async fn concat(&self, clips: &[PathBuf], padding: f64, output_path: &Path) -> Result<()>;

    /// Replace the audio track of a video
    async fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()>;

    /// Check that the external tools can be launched
    async fn check_availability(&self) -> Result<()>;
}

pub struct MediaToolchainFactory;

impl MediaToolchainFactory {
    pub fn create_toolchain(config: MediaConfig) -> Box<dyn MediaToolchain> {
        Box::new(FfmpegToolchain::new(config))
    }
}
