use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::manifest::Manifest;
use crate::quality::DurationReport;
use crate::stage::Stage;

/// Summary of a finished run, written next to the final video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub input_video: PathBuf,
    pub final_video: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<PathBuf>,
    pub dubbed_audio: Option<PathBuf>,
    pub detected_language: String,
    pub source_language: String,
    pub target_language: String,
    pub segment_count: usize,
    pub clips_assembled: usize,
    pub durations: DurationReport,
    /// Segment ids carrying a failure sentinel, per stage
    pub failed_segments: BTreeMap<Stage, Vec<u32>>,
}

impl PipelineReport {
    pub fn from_manifest(manifest: &Manifest, final_video: &Path, durations: DurationReport) -> Self {
        let failed_segments = manifest
            .stages
            .iter()
            .filter(|(_, record)| !record.failed_segments.is_empty())
            .map(|(stage, record)| (*stage, record.failed_segments.clone()))
            .collect();

        Self {
            run_id: manifest.run_id,
            generated_at: Utc::now(),
            input_video: manifest.source.video.clone(),
            final_video: final_video.to_path_buf(),
            subtitles: manifest.artifacts.subtitles.clone(),
            dubbed_audio: manifest.artifacts.dubbed_audio.as_ref().map(|track| track.path.clone()),
            detected_language: manifest.detected_language.clone(),
            source_language: manifest.source_language.clone(),
            target_language: manifest.target_language.clone(),
            segment_count: manifest.segments.len(),
            clips_assembled: manifest
                .artifacts
                .dubbed_audio
                .as_ref()
                .map_or(0, |track| track.clip_count),
            durations,
            failed_segments,
        }
    }

    pub async fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        info!("Report written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{SourceMedia, StageRecord};
    use crate::quality::DurationValidator;
    use crate::segment::Segment;

    #[test]
    fn test_report_surfaces_failure_sets() {
        let mut manifest = Manifest::new(
            SourceMedia {
                video: PathBuf::from("input.mp4"),
                extracted_audio: PathBuf::from("work/extracted_audio.wav"),
                face_video: None,
            },
            "en".to_string(),
            "en".to_string(),
            "hi".to_string(),
            vec![Segment::new(0, 0.0, 1.0, "a"), Segment::new(1, 1.0, 2.0, "b")],
        );
        for (stage, failed) in [(Stage::Transcribe, vec![]), (Stage::Translate, vec![1])] {
            manifest.stages.insert(
                stage,
                StageRecord {
                    completed_at: Utc::now(),
                    input_fingerprint: "0".to_string(),
                    failed_segments: failed,
                },
            );
        }

        let report = PipelineReport::from_manifest(
            &manifest,
            Path::new("outputs/final.mp4"),
            DurationValidator::new(1.0).compare(10.0, 10.5),
        );
        assert_eq!(report.segment_count, 2);
        assert_eq!(report.failed_segments.len(), 1);
        assert_eq!(report.failed_segments[&Stage::Translate], vec![1]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failed_segments"]["translate"], serde_json::json!([1]));
        assert_eq!(json["durations"]["verdict"], "within_tolerance");
    }
}
