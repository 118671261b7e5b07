//! What each stage requires from the manifest before it may start.

use std::path::Path;

use crate::config::Config;
use crate::error::{DubError, Result};
use crate::manifest::{MANIFEST_VERSION, Manifest};
use crate::segment::Segment;
use crate::stage::Stage;

fn not_met<S: Into<String>>(stage: Stage, requirement: S, segment_ids: Vec<u32>) -> DubError {
    DubError::PreconditionNotMet {
        stage,
        requirement: requirement.into(),
        segment_ids,
    }
}

fn missing(stage: Stage, field: &str, segments: &[Segment], has: impl Fn(&Segment) -> bool) -> Result<()> {
    let ids: Vec<u32> = segments
        .iter()
        .filter(|segment| !has(segment))
        .map(|segment| segment.id)
        .collect();
    if ids.is_empty() {
        Ok(())
    } else {
        Err(not_met(stage, format!("`{}` missing", field), ids))
    }
}

fn file_exists(stage: Stage, what: &str, path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(not_met(
            stage,
            format!("{} {} does not exist", what, path.display()),
            vec![],
        ))
    }
}

/// The input video must exist before anything else runs.
pub fn check_input(config: &Config) -> Result<()> {
    file_exists(Stage::Transcribe, "input video", &config.paths.input_video)
}

/// Reject manifests this build cannot interpret, and any whose upstream
/// stages are missing or were recorded against different inputs.
pub fn check_resumable(stage: Stage, manifest: &Manifest) -> Result<()> {
    if manifest.version != MANIFEST_VERSION {
        return Err(not_met(
            stage,
            format!(
                "manifest version {} is not supported (expected {})",
                manifest.version, MANIFEST_VERSION
            ),
            vec![],
        ));
    }

    for upstream in stage.upstream() {
        let record = manifest.stages.get(&upstream).ok_or_else(|| {
            not_met(stage, format!("stage `{}` has not completed", upstream), vec![])
        })?;
        if record.input_fingerprint != manifest.input_fingerprint(upstream) {
            return Err(not_met(
                stage,
                format!("inputs of stage `{}` changed since it completed; re-run it", upstream),
                vec![],
            ));
        }
    }
    Ok(())
}

/// Per-stage field and artifact requirements.
pub fn check_stage(stage: Stage, manifest: &Manifest, config: &Config) -> Result<()> {
    let segments = &manifest.segments;
    match stage {
        Stage::Transcribe => check_input(config),
        Stage::Translate => missing(stage, "source_text", segments, |segment| {
            !segment.source_text.trim().is_empty()
        }),
        Stage::TagEmotion => missing(stage, "translated_text", segments, |segment| {
            segment.translated_text.is_some()
        }),
        Stage::Synthesize => {
            missing(stage, "translated_text", segments, |segment| {
                segment.translated_text.is_some()
            })?;
            missing(stage, "emotion", segments, |segment| segment.emotion.is_some())
        }
        Stage::LipSync => {
            let track = manifest
                .artifacts
                .dubbed_audio
                .as_ref()
                .ok_or_else(|| not_met(stage, "no dubbed audio track recorded", vec![]))?;
            file_exists(stage, "dubbed audio", &track.path)?;
            file_exists(stage, "face video", manifest.source.face())
        }
        Stage::Package => {
            let video = manifest
                .artifacts
                .lipsync_video
                .as_ref()
                .ok_or_else(|| not_met(stage, "no lip-synced video recorded", vec![]))?;
            file_exists(stage, "lip-synced video", video)?;
            if let Some(track) = &manifest.artifacts.dubbed_audio {
                file_exists(stage, "dubbed audio", &track.path)?;
            }
            Ok(())
        }
    }
}
