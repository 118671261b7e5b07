//! Stage orchestration.
//!
//! Stages run strictly one after another. After each stage the manifest is
//! saved together with a completion record for that stage; a stage that fails
//! leaves the previously saved manifest untouched, so the operator can fix the
//! cause and resume at the failed stage.

pub mod preconditions;
mod stages;

use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{DubError, Result};
use crate::lipsync::{LipSyncRenderer, Wav2LipRenderer};
use crate::manifest::{self, Manifest, StageRecord};
use crate::media::{MediaToolchain, MediaToolchainFactory};
use crate::quality::DurationReport;
use crate::stage::Stage;
use crate::transcribe::{SpeechToText, TranscriberFactory};
use crate::translate::{Translator, TranslatorFactory};
use crate::tts::{SpeechSynthesizer, SynthesizerFactory};

/// External collaborators the stages call into.
#[derive(Clone)]
pub struct Providers {
    pub transcriber: Arc<dyn SpeechToText>,
    pub translator: Arc<dyn Translator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub media: Arc<dyn MediaToolchain>,
    pub lipsync: Arc<dyn LipSyncRenderer>,
}

impl Providers {
    /// Build the providers selected by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            transcriber: Arc::from(TranscriberFactory::create_transcriber(config.transcriber.clone())),
            translator: Arc::from(TranslatorFactory::create_translator(&config.translate)?),
            synthesizer: Arc::from(SynthesizerFactory::create_synthesizer(&config.tts)?),
            media: Arc::from(MediaToolchainFactory::create_toolchain(config.media.clone())),
            lipsync: Arc::new(Wav2LipRenderer::new(config.lipsync.clone())),
        })
    }
}

/// Outcome of one `run` invocation.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub stages_run: Vec<Stage>,
    /// Segment ids carrying a failure sentinel, per completed stage
    pub failed_segments: BTreeMap<Stage, Vec<u32>>,
    pub final_video: Option<PathBuf>,
    pub durations: Option<DurationReport>,
}

pub struct Orchestrator {
    config: Config,
    providers: Providers,
    manifest_path: PathBuf,
}

impl Orchestrator {
    pub fn new(config: Config, providers: Providers) -> Self {
        let manifest_path = config.manifest_path();
        Self {
            config,
            providers,
            manifest_path,
        }
    }

    pub fn with_manifest_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.manifest_path = path.into();
        self
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `from` and every later stage.
    pub async fn run(&self, from: Stage) -> Result<RunSummary> {
        self.run_between(from, Stage::Package).await
    }

    /// Run the stages from `from` through `until`, inclusive.
    pub async fn run_between(&self, from: Stage, until: Stage) -> Result<RunSummary> {
        if until < from {
            return Err(DubError::Config(format!(
                "cannot run from `{}` to the earlier stage `{}`",
                from, until
            )));
        }
        info!("Starting run at stage `{}` (through `{}`)", from, until);

        let mut manifest = if from == Stage::Transcribe {
            None
        } else {
            Some(self.load_for_resume(from)?)
        };

        let mut summary = RunSummary::default();
        for stage in from.sequence_from().filter(|stage| *stage <= until) {
            info!("=== Stage `{}` ===", stage);
            let current = self
                .execute(stage, manifest.take(), &mut summary)
                .await
                .map_err(|e| e.in_stage(stage))?;

            manifest::save(&current, &self.manifest_path).map_err(|e| e.in_stage(stage))?;
            let failed = current.failed_segments(stage);
            if failed.is_empty() {
                info!("Stage `{}` complete", stage);
            } else {
                warn!(
                    "Stage `{}` complete with {} failed segment(s): {:?}",
                    stage,
                    failed.len(),
                    failed
                );
            }
            summary.stages_run.push(stage);
            manifest = Some(current);
        }

        if let Some(manifest) = &manifest {
            summary.failed_segments = manifest
                .stages
                .iter()
                .filter(|(_, record)| !record.failed_segments.is_empty())
                .map(|(stage, record)| (*stage, record.failed_segments.clone()))
                .collect();
        }
        Ok(summary)
    }

    fn load_for_resume(&self, from: Stage) -> Result<Manifest> {
        let mut manifest = manifest::load(&self.manifest_path).map_err(|e| match e {
            DubError::FileNotFound(path) => DubError::PreconditionNotMet {
                stage: from,
                requirement: format!("no manifest at {}; run from `transcribe` first", path),
                segment_ids: vec![],
            },
            other => other.in_stage(from),
        })?;
        // A changed face video invalidates a recorded lip-sync.
        manifest.source.face_video = self.config.paths.face_video.clone();
        preconditions::check_resumable(from, &manifest)?;

        let configured = &self.config.translate.target_language;
        if from <= Stage::Translate {
            manifest.target_language = configured.clone();
        } else if &manifest.target_language != configured {
            warn!(
                "Manifest was translated to '{}'; ignoring configured target '{}' (re-run from `translate` to change it)",
                manifest.target_language, configured
            );
        }
        Ok(manifest)
    }

    /// Check preconditions, run one stage and record its completion.
    async fn execute(
        &self,
        stage: Stage,
        manifest: Option<Manifest>,
        summary: &mut RunSummary,
    ) -> Result<Manifest> {
        let mut manifest = match manifest {
            Some(manifest) => manifest,
            None => {
                preconditions::check_input(&self.config)?;
                self.transcribe().await?
            }
        };
        manifest.stages.retain(|recorded, _| *recorded < stage);

        let input_fingerprint = manifest.input_fingerprint(stage);
        match stage {
            Stage::Transcribe => {}
            Stage::Translate => {
                preconditions::check_stage(stage, &manifest, &self.config)?;
                self.translate(&mut manifest).await?;
            }
            Stage::TagEmotion => {
                preconditions::check_stage(stage, &manifest, &self.config)?;
                self.tag_emotion(&mut manifest);
            }
            Stage::Synthesize => {
                preconditions::check_stage(stage, &manifest, &self.config)?;
                self.synthesize(&mut manifest).await?;
            }
            Stage::LipSync => {
                preconditions::check_stage(stage, &manifest, &self.config)?;
                self.lip_sync(&mut manifest).await?;
            }
            Stage::Package => {
                preconditions::check_stage(stage, &manifest, &self.config)?;
                let (final_video, durations) = self.package(&mut manifest).await?;
                summary.final_video = Some(final_video);
                summary.durations = Some(durations);
            }
        }

        manifest.stages.insert(
            stage,
            StageRecord {
                completed_at: Utc::now(),
                input_fingerprint,
                failed_segments: manifest.failed_segments(stage),
            },
        );
        Ok(manifest)
    }
}
