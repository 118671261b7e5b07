use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::Translator;
use super::common::require_text;
use crate::config::TranslateConfig;
use crate::error::{DubError, Result};
use crate::http::{build_client, check_response};

const PROVIDER: &str = "google";

/// Google's free web translate endpoint (`client=gtx`)
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            endpoint: config.google_endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Join the translated sentence chunks of a `translate_a/single` answer.
    pub fn parse_response(body: &Value) -> Result<String> {
        let chunks = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| DubError::provider(PROVIDER, "unexpected response shape"))?;

        Ok(chunks
            .iter()
            .filter_map(|chunk| chunk.get(0).and_then(Value::as_str))
            .collect::<String>())
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        _context_hint: Option<&str>,
    ) -> Result<String> {
        let url = format!("{}/translate_a/single", self.endpoint);
        debug!("Sending translation request to: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", source_language),
                ("tl", target_language),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| DubError::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;
        let response = check_response(PROVIDER, response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| DubError::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;
        require_text(PROVIDER, Self::parse_response(&body)?)
    }

    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_joins_sentence_chunks() {
        let body = json!([
            [
                ["पहले तेल गरम करें। ", "First warm the oil. ", null, null, 10],
                ["फिर धीरे से लगाएं।", "Then apply gently.", null, null, 10]
            ],
            null,
            "en"
        ]);
        assert_eq!(
            GoogleTranslator::parse_response(&body).unwrap(),
            "पहले तेल गरम करें। फिर धीरे से लगाएं।"
        );
    }

    #[test]
    fn test_parse_rejects_unexpected_shape() {
        assert!(GoogleTranslator::parse_response(&json!({"error": "nope"})).is_err());
    }
}
