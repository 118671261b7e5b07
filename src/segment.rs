use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::emotion::Emotion;

/// Sub-segment word timing, carried through every stage unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// Result of one stage's attempt on one segment.
///
/// `Failed` is the failure sentinel: the stage ran for this segment and gave
/// up. A field that is `None` on the segment has not been attempted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Done { value: T },
    Failed { error: String, attempts: u32 },
}

impl<T> Outcome<T> {
    pub fn done(value: T) -> Self {
        Self::Done { value }
    }

    pub fn failed<E: ToString>(error: E, attempts: u32) -> Self {
        Self::Failed {
            error: error.to_string(),
            attempts,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Done { value } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// A synthesized clip for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub path: PathBuf,
    /// Clip length in seconds, as probed after synthesis.
    pub duration: f64,
}

/// One timed utterance and the annotations each stage adds to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub source_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<Outcome<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Outcome<AudioClip>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<WordTiming>,
}

impl Segment {
    pub fn new<S: Into<String>>(id: u32, start: f64, end: f64, source_text: S) -> Self {
        Self {
            id,
            start,
            end,
            source_text: source_text.into(),
            translated_text: None,
            emotion: None,
            audio: None,
            words: Vec::new(),
        }
    }

    pub fn with_words(mut self, words: Vec<WordTiming>) -> Self {
        self.words = words;
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Successful translation, if any.
    pub fn translation(&self) -> Option<&str> {
        self.translated_text
            .as_ref()
            .and_then(Outcome::value)
            .map(String::as_str)
    }

    /// Successfully synthesized clip, if any.
    pub fn clip(&self) -> Option<&AudioClip> {
        self.audio.as_ref().and_then(Outcome::value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let done: Outcome<String> = Outcome::done("नमस्ते".to_string());
        let json = serde_json::to_value(&done).unwrap();
        assert_eq!(json["status"], "done");
        assert_eq!(json["value"], "नमस्ते");

        let failed: Outcome<String> = Outcome::failed("HTTP 503", 3);
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["attempts"], 3);
    }

    #[test]
    fn test_unattempted_fields_are_omitted() {
        let segment = Segment::new(0, 0.0, 1.5, "hello");
        let json = serde_json::to_value(&segment).unwrap();
        assert!(json.get("translated_text").is_none());
        assert!(json.get("audio").is_none());
        assert!(json.get("words").is_none());
    }

    #[test]
    fn test_failed_translation_is_not_a_value() {
        let mut segment = Segment::new(4, 2.0, 3.0, "hello");
        segment.translated_text = Some(Outcome::failed("empty response", 3));
        assert!(segment.translated_text.is_some());
        assert_eq!(segment.translation(), None);
    }
}
