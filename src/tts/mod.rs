// Text-to-speech providers
//
// - Edge: the edge-tts command line tool
// - ElevenLabs: HTTP API with per-emotion voice settings

pub mod edge;
pub mod elevenlabs;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::{SynthesisParams, TtsConfig, TtsProvider};
use crate::error::Result;

/// Renders one segment's text to an audio file
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    /// Synthesize `text` into `output_path` and return the written artifact.
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        params: Option<&SynthesisParams>,
        output_path: &Path,
    ) -> Result<PathBuf>;

    /// Check that the provider can be reached
    async fn check_availability(&self) -> Result<()>;
}

pub struct SynthesizerFactory;

impl SynthesizerFactory {
    pub fn create_synthesizer(config: &TtsConfig) -> Result<Box<dyn SpeechSynthesizer>> {
        let synthesizer: Box<dyn SpeechSynthesizer> = match config.provider {
            TtsProvider::Edge => Box::new(edge::EdgeTtsSynthesizer::new(config)),
            TtsProvider::ElevenLabs => Box::new(elevenlabs::ElevenLabsSynthesizer::new(config)?),
        };
        Ok(synthesizer)
    }
}
