use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;
use crate::media::MediaToolchain;

/// Whether the audio and video durations agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftVerdict {
    WithinTolerance,
    /// Advisory only; the run still succeeds.
    Drift,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationReport {
    pub video_duration: f64,
    pub audio_duration: f64,
    pub absolute_difference: f64,
    pub tolerance: f64,
    pub verdict: DriftVerdict,
}

impl DurationReport {
    pub fn is_within_tolerance(&self) -> bool {
        self.verdict == DriftVerdict::WithinTolerance
    }
}

/// Round to whole milliseconds.
pub fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

pub struct DurationValidator {
    tolerance: f64,
}

impl DurationValidator {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Compare two durations. A difference equal to the tolerance passes.
    pub fn compare(&self, video_duration: f64, audio_duration: f64) -> DurationReport {
        let video_duration = round_millis(video_duration);
        let audio_duration = round_millis(audio_duration);
        let absolute_difference = round_millis((video_duration - audio_duration).abs());

        let verdict = if absolute_difference <= self.tolerance {
            DriftVerdict::WithinTolerance
        } else {
            DriftVerdict::Drift
        };

        DurationReport {
            video_duration,
            audio_duration,
            absolute_difference,
            tolerance: self.tolerance,
            verdict,
        }
    }

    /// Probe both artifacts and compare them. Drift is logged, never returned as an error.
    pub async fn validate(
        &self,
        toolchain: &dyn MediaToolchain,
        video_path: &Path,
        audio_path: &Path,
    ) -> Result<DurationReport> {
        let video_duration = toolchain.probe_duration(video_path).await?;
        let audio_duration = toolchain.probe_duration(audio_path).await?;
        let report = self.compare(video_duration, audio_duration);

        match report.verdict {
            DriftVerdict::WithinTolerance => info!(
                "Durations in sync: video {:.3}s, audio {:.3}s (difference {:.3}s)",
                report.video_duration, report.audio_duration, report.absolute_difference
            ),
            DriftVerdict::Drift => warn!(
                "Duration drift: video {:.3}s, audio {:.3}s differ by {:.3}s (tolerance {:.3}s)",
                report.video_duration,
                report.audio_duration,
                report.absolute_difference,
                report.tolerance
            ),
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMediaToolchain;

    #[test]
    fn test_small_drift_passes() {
        let report = DurationValidator::new(1.0).compare(120.4, 121.1);
        assert_eq!(report.absolute_difference, 0.7);
        assert_eq!(report.verdict, DriftVerdict::WithinTolerance);
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let validator = DurationValidator::new(1.0);
        assert!(validator.compare(10.0, 11.0).is_within_tolerance());
        assert_eq!(validator.compare(10.0, 11.001).verdict, DriftVerdict::Drift);
    }

    #[test]
    fn test_large_drift_is_flagged() {
        let report = DurationValidator::new(1.0).compare(95.25, 92.0);
        assert_eq!(report.absolute_difference, 3.25);
        assert_eq!(report.verdict, DriftVerdict::Drift);
    }

    #[tokio::test]
    async fn test_validate_probes_both_artifacts() {
        let mut toolchain = MockMediaToolchain::new();
        toolchain
            .expect_probe_duration()
            .withf(|path| path == Path::new("final.mp4"))
            .returning(|_| Ok(120.4));
        toolchain
            .expect_probe_duration()
            .withf(|path| path == Path::new("dubbed.mp3"))
            .returning(|_| Ok(121.1));

        let report = DurationValidator::new(1.0)
            .validate(&toolchain, Path::new("final.mp4"), Path::new("dubbed.mp3"))
            .await
            .unwrap();
        assert_eq!(report.video_duration, 120.4);
        assert_eq!(report.audio_duration, 121.1);
        assert!(report.is_within_tolerance());
    }
}
