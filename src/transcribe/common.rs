use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::segment::WordTiming;

/// One utterance as the speech-to-text engine reported it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub words: Vec<WordTiming>,
}

/// Engine-agnostic transcription result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionOutput {
    pub detected_language: String,
    pub segments: Vec<RawSegment>,
}

/// Converts an engine-specific result into [`TranscriptionOutput`]
pub trait TranscriptionMapper<T> {
    fn to_transcription(service_result: T) -> Result<TranscriptionOutput>;
}

/// Text cleanup applied to every utterance before it becomes a segment
pub struct TranscriptCleaner {
    pub collapse_repeats: bool,
}

impl TranscriptCleaner {
    pub fn new(collapse_repeats: bool) -> Self {
        Self { collapse_repeats }
    }

    /// Normalized text, or `None` when nothing speakable remains.
    pub fn clean(&self, text: &str) -> Option<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let cleaned = if self.collapse_repeats {
            collapse_repeated_words(&words)
        } else {
            words.join(" ")
        };
        if cleaned.is_empty() { None } else { Some(cleaned) }
    }
}

/// Collapse runs of three or more identical words (case-insensitive) into
/// their first occurrence. Runs of two are kept.
pub fn collapse_repeated_words(words: &[&str]) -> String {
    let mut kept: Vec<&str> = Vec::with_capacity(words.len());
    let mut index = 0;
    while index < words.len() {
        let word = words[index];
        let run = words[index..]
            .iter()
            .take_while(|other| other.to_lowercase() == word.to_lowercase())
            .count();
        if run >= 3 {
            kept.push(word);
        } else {
            kept.extend_from_slice(&words[index..index + run]);
        }
        index += run;
    }
    kept.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_runs_of_three_or_more() {
        let words = ["the", "the", "the", "the", "oil", "is", "warm"];
        assert_eq!(collapse_repeated_words(&words), "the oil is warm");
    }

    #[test]
    fn test_collapse_is_case_insensitive_and_keeps_pairs() {
        let words = ["No", "no", "NO", "very", "very", "good"];
        assert_eq!(collapse_repeated_words(&words), "No very very good");
    }

    #[test]
    fn test_clean_normalizes_whitespace_and_drops_blank() {
        let cleaner = TranscriptCleaner::new(true);
        assert_eq!(cleaner.clean("  apply \n the   oil "), Some("apply the oil".to_string()));
        assert_eq!(cleaner.clean("   "), None);

        let raw = TranscriptCleaner::new(false);
        assert_eq!(raw.clean("so so so"), Some("so so so".to_string()));
    }
}
