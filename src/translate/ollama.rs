use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::Translator;
use super::common::{clean_translation_response, language_code_to_name, require_text};
use crate::config::TranslateConfig;
use crate::error::{DubError, Result};
use crate::http::{build_client, check_response};

const PROVIDER: &str = "ollama";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
}

/// Translation through a local Ollama model, asked for `{"text": ...}` JSON
pub struct OllamaTranslator {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaTranslator {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Build the translation prompt. The context is shown for reference only.
    pub fn build_prompt(
        text: &str,
        source_language: &str,
        target_language: &str,
        context_hint: Option<&str>,
    ) -> String {
        let source_name = language_code_to_name(source_language);
        let target_name = language_code_to_name(target_language);

        let mut prompt = format!(
            "You are a professional translator for video dubbing.\n\
             \n\
             Translate the text from {} to {} ONLY (language code: {}).\n\
             Keep it natural and about as long as the original so it can be spoken in the same time.\n\
             \n\
             Return ONLY the translation in JSON format as {{\"text\":\"your {} translation here\"}}.\n\
             Do not include any explanations, alternatives, or text in other languages.\n\
             \n\
             [Text to translate]\n\
             {}\n",
            source_name, target_name, target_language, target_name, text
        );

        if let Some(ctx) = context_hint.filter(|ctx| !ctx.trim().is_empty()) {
            prompt.push_str(&format!(
                "\n[Previous line for reference - DO NOT translate this part]\n{}\n",
                ctx
            ));
        }

        prompt
    }

    /// Pull the translation out of the model's `response` field.
    pub fn parse_response(raw_response: &str) -> String {
        let raw_response = raw_response.trim();
        if let Ok(result) = serde_json::from_str::<TranslationResult>(raw_response) {
            return result.text.trim().to_string();
        }
        clean_translation_response(raw_response)
    }
}

#[async_trait]
impl Translator for OllamaTranslator {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        context_hint: Option<&str>,
    ) -> Result<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: Self::build_prompt(text, source_language, target_language, context_hint),
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.endpoint);
        debug!("Sending translation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DubError::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;
        let response = check_response(PROVIDER, response).await?;

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DubError::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;
        debug!("Raw Ollama response: {}", generated.response);

        require_text(PROVIDER, Self::parse_response(&generated.response))
    }

    async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/api/show", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "name": self.model }))
            .send()
            .await
            .map_err(|e| DubError::provider(PROVIDER, format!("Failed to connect to Ollama: {}", e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", self.model);
            Ok(())
        } else {
            Err(DubError::Config(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                self.model, self.model
            )))
        }
    }
}
