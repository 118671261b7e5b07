//! Reassembly of per-segment clips into one continuous dubbed track.
//!
//! Clips are appended in ascending segment id order with a fixed silence
//! after every clip but the last. Segments whose synthesis failed are skipped
//! entirely, so the padding count follows the number of assembled clips.
//! The assembled duration is therefore `sum(clip durations) + (N - 1) * padding`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{DubError, Result};
use crate::manifest::AssembledTrack;
use crate::media::MediaToolchain;
use crate::segment::Segment;
use crate::stage::Stage;

/// Which clips go into the track, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyPlan {
    pub clips: Vec<PathBuf>,
    pub clip_durations: Vec<f64>,
    pub included_segments: Vec<u32>,
    pub skipped_segments: Vec<u32>,
    pub padding: f64,
}

impl AssemblyPlan {
    /// Build the plan from segments whose audio field is resolved.
    pub fn from_segments(segments: &[Segment], padding: f64) -> Result<Self> {
        let mut ordered: Vec<&Segment> = segments.iter().collect();
        ordered.sort_by_key(|segment| segment.id);

        let unresolved: Vec<u32> = ordered
            .iter()
            .filter(|segment| segment.audio.is_none())
            .map(|segment| segment.id)
            .collect();
        if !unresolved.is_empty() {
            return Err(DubError::PreconditionNotMet {
                stage: Stage::Synthesize,
                requirement: "`audio` must be resolved before assembly".to_string(),
                segment_ids: unresolved,
            });
        }

        let mut plan = Self {
            clips: Vec::new(),
            clip_durations: Vec::new(),
            included_segments: Vec::new(),
            skipped_segments: Vec::new(),
            padding,
        };
        for segment in ordered {
            match segment.clip() {
                Some(clip) => {
                    plan.clips.push(clip.path.clone());
                    plan.clip_durations.push(clip.duration);
                    plan.included_segments.push(segment.id);
                }
                None => plan.skipped_segments.push(segment.id),
            }
        }

        if plan.clips.is_empty() {
            return Err(DubError::AssemblyGap {
                total: segments.len(),
            });
        }
        Ok(plan)
    }

    /// Duration of the assembled track.
    pub fn expected_duration(&self) -> f64 {
        self.clip_durations
            .iter()
            .enumerate()
            .fold(0.0, |total, (index, duration)| {
                if index == 0 {
                    total + duration
                } else {
                    total + self.padding + duration
                }
            })
    }
}

pub struct AudioAssembler {
    toolchain: Arc<dyn MediaToolchain>,
    padding: f64,
}

impl AudioAssembler {
    pub fn new(toolchain: Arc<dyn MediaToolchain>, padding: f64) -> Self {
        Self { toolchain, padding }
    }

    pub async fn assemble(&self, segments: &[Segment], output_path: &Path) -> Result<AssembledTrack> {
        let plan = AssemblyPlan::from_segments(segments, self.padding)?;
        if !plan.skipped_segments.is_empty() {
            warn!(
                "Skipping {} segment(s) with failed synthesis: {:?}",
                plan.skipped_segments.len(),
                plan.skipped_segments
            );
        }

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.toolchain.concat(&plan.clips, plan.padding, output_path).await?;

        let duration = plan.expected_duration();
        match self.toolchain.probe_duration(output_path).await {
            Ok(probed) if (probed - duration).abs() > 0.1 => warn!(
                "Assembled track probes at {:.3}s, expected {:.3}s",
                probed, duration
            ),
            Ok(_) => {}
            Err(e) => warn!("Could not probe assembled track: {}", e),
        }

        info!(
            "Assembled {} clips into {} ({:.3}s)",
            plan.clips.len(),
            output_path.display(),
            duration
        );
        Ok(AssembledTrack {
            path: output_path.to_path_buf(),
            duration,
            clip_count: plan.clips.len(),
            skipped_segments: plan.skipped_segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMediaToolchain;
    use crate::segment::{AudioClip, Outcome};

    fn synthesized(id: u32, duration: f64) -> Segment {
        let mut segment = Segment::new(id, id as f64, id as f64 + 1.0, format!("line {}", id));
        segment.audio = Some(Outcome::done(AudioClip {
            path: PathBuf::from(format!("segment_{:04}.mp3", id)),
            duration,
        }));
        segment
    }

    fn failed(id: u32) -> Segment {
        let mut segment = Segment::new(id, id as f64, id as f64 + 1.0, format!("line {}", id));
        segment.audio = Some(Outcome::failed("HTTP 503", 3));
        segment
    }

    #[test]
    fn test_duration_is_sum_plus_padding_between_clips() {
        let segments = vec![synthesized(0, 1.5), synthesized(1, 2.25), synthesized(2, 0.75)];
        let plan = AssemblyPlan::from_segments(&segments, 0.25).unwrap();
        assert_eq!(plan.expected_duration(), 1.5 + 2.25 + 0.75 + 2.0 * 0.25);
    }

    #[test]
    fn test_single_clip_has_no_padding() {
        let plan = AssemblyPlan::from_segments(&[synthesized(7, 3.5)], 0.2).unwrap();
        assert_eq!(plan.expected_duration(), 3.5);
    }

    #[test]
    fn test_plan_orders_by_id_and_skips_failures() {
        let segments = vec![synthesized(4, 1.0), failed(2), synthesized(1, 2.0)];
        let plan = AssemblyPlan::from_segments(&segments, 0.5).unwrap();
        assert_eq!(plan.included_segments, vec![1, 4]);
        assert_eq!(plan.skipped_segments, vec![2]);
        assert_eq!(
            plan.clips,
            vec![PathBuf::from("segment_0001.mp3"), PathBuf::from("segment_0004.mp3")]
        );
        assert_eq!(plan.expected_duration(), 3.5);
    }

    #[test]
    fn test_all_failed_is_assembly_gap() {
        let err = AssemblyPlan::from_segments(&[failed(0), failed(1)], 0.2).unwrap_err();
        assert!(matches!(err, DubError::AssemblyGap { total: 2 }));

        let err = AssemblyPlan::from_segments(&[], 0.2).unwrap_err();
        assert!(matches!(err, DubError::AssemblyGap { total: 0 }));
    }

    #[test]
    fn test_unresolved_audio_is_a_precondition_failure() {
        let segments = vec![synthesized(0, 1.0), Segment::new(3, 1.0, 2.0, "pending")];
        let err = AssemblyPlan::from_segments(&segments, 0.2).unwrap_err();
        match err {
            DubError::PreconditionNotMet { segment_ids, .. } => assert_eq!(segment_ids, vec![3]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_assemble_passes_ordered_clips_to_toolchain() {
        let mut toolchain = MockMediaToolchain::new();
        toolchain
            .expect_concat()
            .withf(|clips, padding, _| {
                clips.to_vec()
                    == vec![PathBuf::from("segment_0000.mp3"), PathBuf::from("segment_0002.mp3")]
                    && *padding == 0.25
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        toolchain.expect_probe_duration().returning(|_| Ok(3.25));

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("dubbed_audio.mp3");
        let assembler = AudioAssembler::new(Arc::new(toolchain), 0.25);
        let segments = vec![synthesized(0, 1.0), failed(1), synthesized(2, 2.0)];

        let track = assembler.assemble(&segments, &output).await.unwrap();
        assert_eq!(track.clip_count, 2);
        assert_eq!(track.skipped_segments, vec![1]);
        assert_eq!(track.duration, 3.25);
        assert_eq!(track.path, output);
    }
}
