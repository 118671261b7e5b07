//! Rule-based mood tagging for dubbed segments.
//!
//! Every label owns a fixed list of trigger substrings. A text scores one point
//! per trigger of a label found in it (case-insensitive); the highest score
//! wins, ties resolved by [`Emotion::PRIORITY`]. Punctuation only matters when
//! nothing fired: `!` forces `excited`, otherwise `?` forces `curious`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Excited,
    Calm,
    Gentle,
    Serious,
    Concerned,
    Instructional,
    Encouraging,
    Warm,
    Curious,
    Neutral,
}

impl Emotion {
    /// Tie-break order: the first label reaching the maximum score wins.
    pub const PRIORITY: [Emotion; 11] = [
        Emotion::Happy,
        Emotion::Excited,
        Emotion::Calm,
        Emotion::Gentle,
        Emotion::Serious,
        Emotion::Concerned,
        Emotion::Instructional,
        Emotion::Encouraging,
        Emotion::Warm,
        Emotion::Curious,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Excited => "excited",
            Self::Calm => "calm",
            Self::Gentle => "gentle",
            Self::Serious => "serious",
            Self::Concerned => "concerned",
            Self::Instructional => "instructional",
            Self::Encouraging => "encouraging",
            Self::Warm => "warm",
            Self::Curious => "curious",
            Self::Neutral => "neutral",
        }
    }

    /// Trigger substrings, already lowercase. English and Hindi cues.
    pub fn triggers(&self) -> &'static [&'static str] {
        match self {
            Self::Happy => &[
                "good", "great", "wonderful", "excellent", "love", "खुश", "अच्छा", "बढ़िया",
            ],
            Self::Excited => &["amazing", "wow", "fantastic", "incredible", "वाह", "शानदार"],
            Self::Calm => &["gently", "slowly", "softly", "peaceful", "आराम", "धीरे", "शांति"],
            Self::Gentle => &["gentle", "tender", "soothe", "delicate", "कोमल", "प्यार से"],
            Self::Serious => &["important", "must", "careful", "attention", "ध्यान", "सावधान", "ज़रूरी"],
            Self::Concerned => &[
                "careful", "watch", "caution", "avoid", "don't", "worry", "problem", "सावधान", "मत",
            ],
            Self::Instructional => &["first", "then", "next", "after", "step", "पहले", "फिर", "अब"],
            Self::Encouraging => &["you can", "try", "let's", "well done", "keep going", "शाबाश"],
            Self::Warm => &["smile", "enjoy", "together", "welcome", "happy", "मुस्कान"],
            Self::Curious => &["wonder", "curious", "guess", "क्या", "क्यों"],
            Self::Neutral => &[],
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::PRIORITY
            .into_iter()
            .find(|emotion| emotion.as_str() == needle)
            .ok_or_else(|| format!("Unknown emotion label '{}'", s))
    }
}

/// Number of `emotion` triggers present in either text.
fn score(emotion: Emotion, text: &str, original: &str) -> usize {
    emotion
        .triggers()
        .iter()
        .filter(|trigger| text.contains(*trigger) || original.contains(*trigger))
        .count()
}

/// Assign one label to a segment's text.
///
/// `original` is the other-language counterpart (the untranslated source text);
/// its triggers count toward the same labels.
pub fn classify(text: &str, original: Option<&str>) -> Emotion {
    let text_lower = text.to_lowercase();
    let original_lower = original.map(str::to_lowercase).unwrap_or_default();

    let mut best = Emotion::Neutral;
    let mut best_score = 0;
    for emotion in Emotion::PRIORITY {
        let points = score(emotion, &text_lower, &original_lower);
        if points > best_score {
            best_score = points;
            best = emotion;
        }
    }

    if best_score > 0 {
        return best;
    }
    if text.contains('!') {
        Emotion::Excited
    } else if text.contains('?') {
        Emotion::Curious
    } else {
        Emotion::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gently_is_calm() {
        assert_eq!(classify("gently", None), Emotion::Calm);
        assert_eq!(classify("Now move GENTLY over the arm", None), Emotion::Calm);
    }

    #[test]
    fn test_great_and_careful_tie_resolves_by_priority() {
        // happy=1, serious=1, concerned=1: happy is first in priority
        assert_eq!(classify("great, but be careful", None), Emotion::Happy);
        assert_eq!(classify("be careful, great", None), Emotion::Happy);
    }

    #[test]
    fn test_strictly_higher_score_beats_priority() {
        // serious=2 (must, careful), concerned=1 (careful), happy=1 (great)
        assert_eq!(classify("great, you must be careful", None), Emotion::Serious);
    }

    #[test]
    fn test_punctuation_overrides_only_when_nothing_fired() {
        assert_eq!(classify("Look at this!", None), Emotion::Excited);
        assert_eq!(classify("Is the oil warm?", None), Emotion::Curious);
        assert_eq!(classify("Really?!", None), Emotion::Excited);
        assert_eq!(classify("Good job!", None), Emotion::Happy);
        assert_eq!(classify("Is it good?", None), Emotion::Happy);
    }

    #[test]
    fn test_no_triggers_is_neutral() {
        assert_eq!(classify("The oil is on the table.", None), Emotion::Neutral);
        assert_eq!(classify("", None), Emotion::Neutral);
    }

    #[test]
    fn test_original_text_cross_check() {
        assert_eq!(classify("तेल लगाइए", Some("Apply the oil slowly")), Emotion::Calm);
        assert_eq!(classify("धीरे से", Some("the oil")), Emotion::Calm);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let text = "First, warm the oil. Then watch the baby and smile!";
        let first = classify(text, None);
        for _ in 0..10 {
            assert_eq!(classify(text, None), first);
        }
    }

    #[test]
    fn test_label_round_trip_through_str() {
        for emotion in Emotion::PRIORITY {
            assert_eq!(emotion.as_str().parse::<Emotion>().unwrap(), emotion);
        }
    }
}
