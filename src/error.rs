use std::path::PathBuf;
use thiserror::Error;

use crate::stage::Stage;

#[derive(Error, Debug)]
pub enum DubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Lip-sync renderer error: {0}")]
    LipSync(String),

    #[error("Corrupt manifest {}: {reason}", .path.display())]
    CorruptManifest { path: PathBuf, reason: String },

    #[error("{stage}: precondition not met: {requirement}{}", format_segment_ids(.segment_ids))]
    PreconditionNotMet {
        stage: Stage,
        requirement: String,
        segment_ids: Vec<u32>,
    },

    #[error("{provider} call failed: {reason}")]
    ProviderCallFailed { provider: String, reason: String },

    #[error("{provider} rejected the request ({status}): {reason}")]
    ProviderRejected {
        provider: String,
        status: u16,
        reason: String,
    },

    #[error("Nothing to assemble: all {total} segments carry a synthesis failure")]
    AssemblyGap { total: usize },

    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<DubError>,
    },
}

impl DubError {
    pub fn provider<P: Into<String>, R: Into<String>>(provider: P, reason: R) -> Self {
        Self::ProviderCallFailed {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupt<P: Into<PathBuf>, R: Into<String>>(path: P, reason: R) -> Self {
        Self::CorruptManifest {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Attach the failing stage, unless the error already names one.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            already @ (Self::StageFailed { .. } | Self::PreconditionNotMet { .. }) => already,
            other => Self::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Whether another attempt of the same provider call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderCallFailed { .. } | Self::Http(_) | Self::Io(_) | Self::Media(_)
        )
    }

    /// The stage named by this error, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } | Self::PreconditionNotMet { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

fn format_segment_ids(ids: &[u32]) -> String {
    if ids.is_empty() {
        String::new()
    } else {
        format!(" (segments {:?})", ids)
    }
}

pub type Result<T> = std::result::Result<T, DubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_message_names_segments() {
        let err = DubError::PreconditionNotMet {
            stage: Stage::Synthesize,
            requirement: "`emotion` missing".to_string(),
            segment_ids: vec![3, 7],
        };
        assert_eq!(
            err.to_string(),
            "synthesize: precondition not met: `emotion` missing (segments [3, 7])"
        );
    }

    #[test]
    fn test_in_stage_does_not_double_wrap() {
        let err = DubError::AssemblyGap { total: 4 }
            .in_stage(Stage::Synthesize)
            .in_stage(Stage::Package);
        assert_eq!(err.stage(), Some(Stage::Synthesize));
        assert!(err.to_string().starts_with("Stage synthesize failed"));
    }

    #[test]
    fn test_in_stage_keeps_precondition_errors() {
        let err = DubError::PreconditionNotMet {
            stage: Stage::LipSync,
            requirement: "no dubbed audio track recorded".to_string(),
            segment_ids: vec![],
        }
        .in_stage(Stage::LipSync);
        assert!(matches!(err, DubError::PreconditionNotMet { .. }));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(DubError::provider("ollama", "timeout").is_retryable());
        assert!(!DubError::Config("bad".to_string()).is_retryable());
        assert!(!DubError::AssemblyGap { total: 0 }.is_retryable());
        let rejected = DubError::ProviderRejected {
            provider: "elevenlabs".to_string(),
            status: 401,
            reason: "invalid api key".to_string(),
        };
        assert!(!rejected.is_retryable());
    }
}
