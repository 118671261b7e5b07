use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One pipeline phase. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Transcribe,
    Translate,
    TagEmotion,
    Synthesize,
    LipSync,
    Package,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Transcribe,
        Stage::Translate,
        Stage::TagEmotion,
        Stage::Synthesize,
        Stage::LipSync,
        Stage::Package,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
            Self::TagEmotion => "tag-emotion",
            Self::Synthesize => "synthesize",
            Self::LipSync => "lip-sync",
            Self::Package => "package",
        }
    }

    /// This stage followed by every later stage.
    pub fn sequence_from(self) -> impl Iterator<Item = Stage> {
        Self::ALL.into_iter().filter(move |stage| *stage >= self)
    }

    /// Stages that must be complete before this one may run.
    pub fn upstream(self) -> impl Iterator<Item = Stage> {
        Self::ALL.into_iter().filter(move |stage| *stage < self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Invalid stage '{}'. Valid stages: {}",
                    s,
                    Self::ALL.map(|stage| stage.as_str()).join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stage_names() {
        assert_eq!("tag-emotion".parse::<Stage>().unwrap(), Stage::TagEmotion);
        assert_eq!("LIP_SYNC".parse::<Stage>().unwrap(), Stage::LipSync);
        assert!("mux".parse::<Stage>().is_err());
    }

    #[test]
    fn test_sequence_from_resumes_in_order() {
        let rest: Vec<Stage> = Stage::Synthesize.sequence_from().collect();
        assert_eq!(rest, vec![Stage::Synthesize, Stage::LipSync, Stage::Package]);

        let upstream: Vec<Stage> = Stage::TagEmotion.upstream().collect();
        assert_eq!(upstream, vec![Stage::Transcribe, Stage::Translate]);
    }

    #[test]
    fn test_serde_uses_cli_names() {
        let json = serde_json::to_string(&Stage::TagEmotion).unwrap();
        assert_eq!(json, "\"tag-emotion\"");
    }
}
