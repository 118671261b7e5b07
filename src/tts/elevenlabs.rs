use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::SpeechSynthesizer;
use crate::config::{SynthesisParams, TtsConfig};
use crate::error::{DubError, Result};
use crate::http::{build_client, check_response};

const PROVIDER: &str = "elevenlabs";
const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_settings: Option<VoiceSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
    pub speed: f32,
}

impl From<&SynthesisParams> for VoiceSettings {
    fn from(params: &SynthesisParams) -> Self {
        Self {
            stability: params.stability,
            similarity_boost: params.similarity_boost,
            style: params.style,
            use_speaker_boost: true,
            speed: params.speed,
        }
    }
}

/// ElevenLabs text-to-speech API
pub struct ElevenLabsSynthesizer {
    client: Client,
    endpoint: String,
    model_id: String,
    api_key: String,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                DubError::Config(format!("ElevenLabs needs tts.api_key or {}", API_KEY_ENV))
            })?;

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model_id: config.model_id.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
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
        let url = format!("{}/v1/text-to-speech/{}", self.endpoint, voice_id);
        let request = SynthesisRequest {
            text,
            model_id: &self.model_id,
            voice_settings: params.map(VoiceSettings::from),
        };
        debug!("Sending synthesis request to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| DubError::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;
        let response = check_response(PROVIDER, response).await?;

        let audio = response
            .bytes()
            .await
            .map_err(|e| DubError::provider(PROVIDER, format!("Failed to read audio: {}", e)))?;
        if audio.is_empty() {
            return Err(DubError::provider(PROVIDER, "empty audio received"));
        }

        tokio::fs::write(output_path, &audio).await?;
        Ok(output_path.to_path_buf())
    }

    async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/v1/user", self.endpoint);
        let response = self
            .client
            .get(&url)
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| DubError::provider(PROVIDER, format!("Failed to connect: {}", e)))?;
        check_response(PROVIDER, response).await?;
        info!("ElevenLabs API key accepted");
        Ok(())
    }
}
