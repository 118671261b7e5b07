use crate::error::{DubError, Result};

/// Full language name for prompts, falling back to the code itself.
pub fn language_code_to_name(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "en" => "English".to_string(),
        "hi" => "Hindi".to_string(),
        "kn" => "Kannada".to_string(),
        "ta" => "Tamil".to_string(),
        "te" => "Telugu".to_string(),
        "ml" => "Malayalam".to_string(),
        "bn" => "Bengali".to_string(),
        "mr" => "Marathi".to_string(),
        "gu" => "Gujarati".to_string(),
        "pa" => "Punjabi".to_string(),
        "or" => "Odia".to_string(),
        "ur" => "Urdu".to_string(),
        "ne" => "Nepali".to_string(),
        "ja" => "Japanese".to_string(),
        "ko" => "Korean".to_string(),
        "zh" => "Chinese".to_string(),
        "fr" => "French".to_string(),
        "de" => "German".to_string(),
        "es" => "Spanish".to_string(),
        "pt" => "Portuguese".to_string(),
        "ru" => "Russian".to_string(),
        "ar" => "Arabic".to_string(),
        _ => code.to_string(),
    }
}

/// Extract the translation from a chatty LLM answer.
pub fn clean_translation_response(response: &str) -> String {
    let lines: Vec<&str> = response.lines().collect();

    for &line in &lines {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with("Here is")
            || trimmed.starts_with("Here are")
            || trimmed.starts_with("Option")
            || trimmed.starts_with("**Option")
            || trimmed.starts_with("- ")
            || trimmed.starts_with("* ")
        {
            continue;
        }

        if trimmed.starts_with("**") && trimmed.ends_with("**") {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("Translation:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                return rest.trim_matches('"').to_string();
            }
            continue;
        }

        return trimmed.trim_matches('"').to_string();
    }

    response.trim().to_string()
}

/// Empty provider output counts as a failed call.
pub fn require_text(provider: &str, text: String) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        Err(DubError::provider(provider, "empty translation received"))
    } else {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_names() {
        assert_eq!(language_code_to_name("HI"), "Hindi");
        assert_eq!(language_code_to_name("xx"), "xx");
    }

    #[test]
    fn test_clean_translation_response_skips_preamble() {
        let raw = "Here is the translation:\n\n**Hindi**\nTranslation: \"पहले तेल गरम करें\"\n";
        assert_eq!(clean_translation_response(raw), "पहले तेल गरम करें");
        assert_eq!(clean_translation_response("धीरे से"), "धीरे से");
    }

    #[test]
    fn test_require_text_rejects_blank() {
        assert!(matches!(
            require_text("google", "  \n".to_string()),
            Err(DubError::ProviderCallFailed { .. })
        ));
        assert_eq!(require_text("google", " नमस्ते ".to_string()).unwrap(), "नमस्ते");
    }
}
