//! The persisted record of a dubbing run.
//!
//! The manifest is the only artifact that crosses stage boundaries. It is
//! written atomically (temp file in the same directory, then rename) so a
//! crashed write never leaves a half-written file behind under the canonical
//! path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DubError, Result};
use crate::segment::{Outcome, Segment};
use crate::stage::Stage;

pub const MANIFEST_SCHEMA: &str = "redub-manifest";
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMedia {
    pub video: PathBuf,
    pub extracted_audio: PathBuf,
    /// Video the lip-sync stage renders over, when it is not `video`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_video: Option<PathBuf>,
}

impl SourceMedia {
    pub fn face(&self) -> &Path {
        self.face_video.as_deref().unwrap_or(&self.video)
    }
}

/// Length-prefixed SHA-256 over the fields a stage reads, stable across
/// compiler releases.
struct Fingerprint(Sha256);

impl Fingerprint {
    fn new(stage: Stage) -> Self {
        let mut fingerprint = Self(Sha256::new());
        fingerprint.text(stage.as_str());
        fingerprint
    }

    fn text(&mut self, value: &str) {
        self.0.update((value.len() as u64).to_le_bytes());
        self.0.update(value.as_bytes());
    }

    fn path(&mut self, value: &Path) {
        self.text(&value.to_string_lossy());
    }

    fn optional(&mut self, value: Option<&str>) {
        match value {
            Some(value) => {
                self.0.update([1]);
                self.text(value);
            }
            None => self.0.update([0]),
        }
    }

    fn number(&mut self, value: u64) {
        self.0.update(value.to_le_bytes());
    }

    fn finish(self) -> String {
        format!("{:x}", self.0.finalize())
    }
}

/// Completion metadata for one stage. Written by the orchestrator only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub completed_at: DateTime<Utc>,
    /// Hash of the inputs the stage consumed.
    pub input_fingerprint: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_segments: Vec<u32>,
}

/// The assembled dubbed track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledTrack {
    pub path: PathBuf,
    pub duration: f64,
    pub clip_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_segments: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dubbed_audio: Option<AssembledTrack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lipsync_video: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_video: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema: String,
    pub version: u32,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub source: SourceMedia,
    /// Language the speech-to-text engine detected in the audio.
    pub detected_language: String,
    /// Language of `Segment::source_text`.
    pub source_language: String,
    pub target_language: String,
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub stages: BTreeMap<Stage, StageRecord>,
    #[serde(default)]
    pub artifacts: Artifacts,
}

impl Manifest {
    pub fn new(
        source: SourceMedia,
        detected_language: String,
        source_language: String,
        target_language: String,
        segments: Vec<Segment>,
    ) -> Self {
        Self {
            schema: MANIFEST_SCHEMA.to_string(),
            version: MANIFEST_VERSION,
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            source,
            detected_language,
            source_language,
            target_language,
            segments,
            stages: BTreeMap::new(),
            artifacts: Artifacts::default(),
        }
    }

    pub fn is_complete(&self, stage: Stage) -> bool {
        self.stages.contains_key(&stage)
    }

    pub fn segment_mut(&mut self, id: u32) -> Option<&mut Segment> {
        self.segments
            .binary_search_by_key(&id, |segment| segment.id)
            .ok()
            .map(move |index| &mut self.segments[index])
    }

    /// Ids of segments whose field for `stage` is a failure sentinel.
    pub fn failed_segments(&self, stage: Stage) -> Vec<u32> {
        self.segments
            .iter()
            .filter(|segment| match stage {
                Stage::Translate => segment.translated_text.as_ref().is_some_and(Outcome::is_failed),
                Stage::Synthesize => segment.audio.as_ref().is_some_and(Outcome::is_failed),
                _ => false,
            })
            .map(|segment| segment.id)
            .collect()
    }

    /// Hash of the manifest state `stage` reads. Fields a stage writes are
    /// never part of its own fingerprint.
    pub fn input_fingerprint(&self, stage: Stage) -> String {
        let mut fp = Fingerprint::new(stage);
        match stage {
            Stage::Transcribe => {
                fp.path(&self.source.video);
                fp.path(&self.source.extracted_audio);
                fp.text(&self.detected_language);
            }
            Stage::Translate => {
                fp.text(&self.source_language);
                fp.text(&self.target_language);
                for segment in &self.segments {
                    fp.number(segment.id.into());
                    fp.text(&segment.source_text);
                }
            }
            Stage::TagEmotion => {
                for segment in &self.segments {
                    fp.number(segment.id.into());
                    fp.text(&segment.source_text);
                    fp.optional(segment.translation());
                }
            }
            Stage::Synthesize => {
                fp.text(&self.target_language);
                for segment in &self.segments {
                    fp.number(segment.id.into());
                    fp.optional(segment.translation());
                    fp.optional(segment.emotion.map(|emotion| emotion.as_str()));
                }
            }
            Stage::LipSync => {
                fp.path(self.source.face());
                if let Some(track) = &self.artifacts.dubbed_audio {
                    fp.path(&track.path);
                    fp.number(track.duration.to_bits());
                }
            }
            Stage::Package => {
                fp.optional(
                    self.artifacts
                        .lipsync_video
                        .as_deref()
                        .map(|path| path.to_string_lossy())
                        .as_deref(),
                );
                if let Some(track) = &self.artifacts.dubbed_audio {
                    fp.path(&track.path);
                }
            }
        }
        fp.finish()
    }

    /// Structural and ordering checks shared by load and save.
    fn check_invariants(&self, path: &Path) -> Result<()> {
        if self.schema != MANIFEST_SCHEMA {
            return Err(DubError::corrupt(
                path,
                format!("unexpected schema '{}'", self.schema),
            ));
        }

        let mut previous: Option<u32> = None;
        for segment in &self.segments {
            if !segment.start.is_finite() || !segment.end.is_finite() {
                return Err(DubError::corrupt(
                    path,
                    format!("segment {} has non-finite timing", segment.id),
                ));
            }
            if segment.end < segment.start {
                return Err(DubError::corrupt(
                    path,
                    format!(
                        "segment {} ends before it starts ({} < {})",
                        segment.id, segment.end, segment.start
                    ),
                ));
            }
            if let Some(prev) = previous {
                if segment.id == prev {
                    return Err(DubError::corrupt(path, format!("duplicate segment id {}", segment.id)));
                }
                if segment.id < prev {
                    return Err(DubError::corrupt(
                        path,
                        format!("segment {} stored after segment {}", segment.id, prev),
                    ));
                }
            }
            previous = Some(segment.id);
        }
        Ok(())
    }
}

/// Read and validate a manifest.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DubError::FileNotFound(path.display().to_string()));
    }

    let content = std::fs::read(path)?;
    let manifest: Manifest = serde_json::from_slice(&content)
        .map_err(|e| DubError::corrupt(path, format!("unreadable structure: {}", e)))?;
    manifest.check_invariants(path)?;

    debug!(
        "Loaded manifest {} ({} segments, {} stages complete)",
        path.display(),
        manifest.segments.len(),
        manifest.stages.len()
    );
    Ok(manifest)
}

/// Atomically replace the manifest at `path`.
pub fn save<P: AsRef<Path>>(manifest: &Manifest, path: P) -> Result<()> {
    let path = path.as_ref();
    manifest.check_invariants(path)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let content = serde_json::to_vec_pretty(manifest)?;
    let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
    temp.write_all(&content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| DubError::Io(e.error))?;

    debug!("Saved manifest {}", path.display());
    Ok(())
}

/// Segments in canonical (ascending id) order.
pub fn ordered_segments(manifest: &Manifest) -> Vec<Segment> {
    let mut segments = manifest.segments.clone();
    segments.sort_by_key(|segment| segment.id);
    segments
}
