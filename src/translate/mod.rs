// Translation providers
//
// - Ollama: local LLM asked for JSON output
// - Google: free web translate endpoint

pub mod common;
pub mod google;
pub mod ollama;

use async_trait::async_trait;

pub use common::*;
use crate::config::{TranslateConfig, TranslationProvider};
use crate::error::Result;

/// Translates one segment's text
#[async_trait]
pub trait Translator: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    /// Translate `text`. Empty output is an error, never a translation.
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        context_hint: Option<&str>,
    ) -> Result<String>;

    /// Check that the provider can be reached
    async fn check_availability(&self) -> Result<()>;
}

pub struct TranslatorFactory;

impl TranslatorFactory {
    pub fn create_translator(config: &TranslateConfig) -> Result<Box<dyn Translator>> {
        let translator: Box<dyn Translator> = match config.provider {
            TranslationProvider::Ollama => Box::new(ollama::OllamaTranslator::new(config)?),
            TranslationProvider::Google => Box::new(google::GoogleTranslator::new(config)?),
        };
        Ok(translator)
    }
}
