// Speech-to-text providers
//
// To add a new engine:
// 1. Create engine-specific data structures for parsing its output
// 2. Implement TranscriptionMapper for them
// 3. Implement SpeechToText and add it to the factory

pub mod common;
pub mod whisper;

use async_trait::async_trait;
use std::path::Path;

pub use common::*;
use crate::config::TranscriberConfig;
use crate::error::Result;

/// Timed transcription of an audio file
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe `audio_path`; timestamps may overlap or be non-monotonic.
    async fn transcribe(
        &self,
        audio_path: &Path,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionOutput>;
}

pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_transcriber(config: TranscriberConfig) -> Box<dyn SpeechToText> {
        Box::new(whisper::WhisperCliTranscriber::new(config))
    }
}
