use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::Orchestrator;
use crate::assembly::AudioAssembler;
use crate::config::TranscriptionTask;
use crate::emotion::{Emotion, classify};
use crate::error::{DubError, Result};
use crate::manifest::{Manifest, SourceMedia};
use crate::quality::{DurationReport, DurationValidator};
use crate::report::PipelineReport;
use crate::retry::retry_with_backoff;
use crate::segment::{AudioClip, Outcome, Segment};
use crate::subtitle::generate_srt;
use crate::transcribe::{TranscriptCleaner, TranscriptionOutput};

const EXTRACTED_AUDIO: &str = "extracted_audio.wav";
const SEGMENT_DIR: &str = "segments";
const LIPSYNC_VIDEO: &str = "lipsynced_video.mp4";
const REPORT_FILE: &str = "pipeline_report.json";

fn progress_bar(len: usize, message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    pb
}

/// Turn engine utterances into segments with ids in engine order.
pub(super) fn segments_from_transcription(
    output: &TranscriptionOutput,
    cleaner: &TranscriptCleaner,
) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(output.segments.len());
    for raw in &output.segments {
        if !raw.start.is_finite() || !raw.end.is_finite() {
            warn!("Ignoring utterance with non-finite timing: {:?}", raw.text);
            continue;
        }
        let Some(text) = cleaner.clean(&raw.text) else {
            debug!("Ignoring blank utterance at {:.2}s", raw.start);
            continue;
        };

        let id = segments.len() as u32;
        let end = if raw.end < raw.start {
            warn!(
                "Utterance {} ends before it starts ({:.3} < {:.3}); clamping",
                id, raw.end, raw.start
            );
            raw.start
        } else {
            raw.end
        };
        segments.push(Segment::new(id, raw.start, end, text).with_words(raw.words.clone()));
    }
    segments
}

impl Orchestrator {
    fn work_dir(&self) -> &Path {
        &self.config.paths.work_dir
    }

    pub(super) async fn transcribe(&self) -> Result<Manifest> {
        let video = self.config.paths.input_video.clone();
        let audio = self.work_dir().join(EXTRACTED_AUDIO);
        tokio::fs::create_dir_all(self.work_dir()).await?;

        if self.config.transcriber.reuse_extracted_audio && audio.exists() {
            info!("Reusing extracted audio {}", audio.display());
        } else {
            self.providers.media.extract_audio(&video, &audio).await?;
        }

        let output = self
            .providers
            .transcriber
            .transcribe(&audio, self.config.transcriber.language_hint.as_deref())
            .await?;
        let cleaner = TranscriptCleaner::new(self.config.transcriber.collapse_repeats);
        let segments = segments_from_transcription(&output, &cleaner);
        info!(
            "Transcribed {} segments (detected language '{}')",
            segments.len(),
            output.detected_language
        );

        let source_language = match self.config.transcriber.task {
            TranscriptionTask::Translate => "en".to_string(),
            TranscriptionTask::Transcribe => self
                .config
                .translate
                .source_language
                .clone()
                .unwrap_or_else(|| output.detected_language.clone()),
        };

        Ok(Manifest::new(
            SourceMedia {
                video,
                extracted_audio: audio,
                face_video: self.config.paths.face_video.clone(),
            },
            output.detected_language,
            source_language,
            self.config.translate.target_language.clone(),
            segments,
        ))
    }

    pub(super) async fn translate(&self, manifest: &mut Manifest) -> Result<()> {
        let source_language = manifest.source_language.clone();
        let target_language = manifest.target_language.clone();
        let translator = &self.providers.translator;
        info!(
            "Translating {} segments {} -> {} with {}",
            manifest.segments.len(),
            source_language,
            target_language,
            translator.name()
        );

        // Each job carries the previous segment's text as context.
        let jobs: Vec<(u32, String, Option<String>)> = manifest
            .segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                let context = index
                    .checked_sub(1)
                    .map(|prev| manifest.segments[prev].source_text.clone());
                (segment.id, segment.source_text.clone(), context)
            })
            .collect();

        let pb = progress_bar(jobs.len(), "Translating");
        let outcomes: Vec<(u32, Outcome<String>)> = stream::iter(jobs)
            .map(|(id, text, context)| {
                let source_language = &source_language;
                let target_language = &target_language;
                let pb = &pb;
                async move {
                    let result = retry_with_backoff(
                        &self.config.retry,
                        || translator.translate(&text, source_language, target_language, context.as_deref()),
                        DubError::is_retryable,
                    )
                    .await;
                    pb.inc(1);
                    let outcome = match result {
                        Ok(translation) => Outcome::done(translation),
                        Err(exhausted) => {
                            warn!(
                                "Segment {}: translation failed after {} attempt(s): {}",
                                id, exhausted.attempts, exhausted.error
                            );
                            Outcome::failed(exhausted.error, exhausted.attempts)
                        }
                    };
                    (id, outcome)
                }
            })
            .buffer_unordered(self.config.translate.concurrency.max(1))
            .collect()
            .await;
        pb.finish_and_clear();

        for (id, outcome) in outcomes {
            if let Some(segment) = manifest.segment_mut(id) {
                segment.translated_text = Some(outcome);
            }
        }
        Ok(())
    }

    pub(super) fn tag_emotion(&self, manifest: &mut Manifest) {
        for segment in &mut manifest.segments {
            let emotion = match segment.translation() {
                Some(translation) => classify(translation, Some(&segment.source_text)),
                None => classify(&segment.source_text, None),
            };
            debug!("Segment {}: {}", segment.id, emotion);
            segment.emotion = Some(emotion);
        }
        info!("Tagged {} segments", manifest.segments.len());
    }

    async fn synthesize_clip(
        &self,
        text: &str,
        emotion: Emotion,
        output_path: &Path,
    ) -> Result<AudioClip> {
        let params = self.config.tts.params_for(emotion);
        let path = self
            .providers
            .synthesizer
            .synthesize(text, &self.config.tts.voice_id, params.as_ref(), output_path)
            .await?;
        let duration = self.providers.media.probe_duration(&path).await?;
        Ok(AudioClip { path, duration })
    }

    pub(super) async fn synthesize(&self, manifest: &mut Manifest) -> Result<()> {
        let segment_dir = self.work_dir().join(SEGMENT_DIR);
        tokio::fs::create_dir_all(&segment_dir).await?;
        info!(
            "Synthesizing {} segments with {} (voice {})",
            manifest.segments.len(),
            self.providers.synthesizer.name(),
            self.config.tts.voice_id
        );

        let jobs: Vec<(u32, Option<String>, Emotion, PathBuf)> = manifest
            .segments
            .iter()
            .map(|segment| {
                (
                    segment.id,
                    segment.translation().map(str::to_string),
                    segment.emotion.unwrap_or(Emotion::Neutral),
                    segment_dir.join(format!("segment_{:04}.mp3", segment.id)),
                )
            })
            .collect();

        let pb = progress_bar(jobs.len(), "Synthesizing");
        let outcomes: Vec<(u32, Outcome<AudioClip>)> = stream::iter(jobs)
            .map(|(id, text, emotion, path)| {
                let pb = &pb;
                async move {
                    let outcome = match text {
                        None => Outcome::failed("no translation to synthesize", 0),
                        Some(text) => match retry_with_backoff(
                            &self.config.retry,
                            || self.synthesize_clip(&text, emotion, &path),
                            DubError::is_retryable,
                        )
                        .await
                        {
                            Ok(clip) => Outcome::done(clip),
                            Err(exhausted) => {
                                warn!(
                                    "Segment {}: synthesis failed after {} attempt(s): {}",
                                    id, exhausted.attempts, exhausted.error
                                );
                                Outcome::failed(exhausted.error, exhausted.attempts)
                            }
                        },
                    };
                    pb.inc(1);
                    (id, outcome)
                }
            })
            .buffer_unordered(self.config.tts.concurrency.max(1))
            .collect()
            .await;
        pb.finish_and_clear();

        for (id, outcome) in outcomes {
            if let Some(segment) = manifest.segment_mut(id) {
                segment.audio = Some(outcome);
            }
        }

        let assembler = AudioAssembler::new(
            self.providers.media.clone(),
            self.config.assembly.padding_seconds,
        );
        let output = self.work_dir().join(&self.config.assembly.output_name);
        manifest.artifacts.dubbed_audio = Some(assembler.assemble(&manifest.segments, &output).await?);
        Ok(())
    }

    pub(super) async fn lip_sync(&self, manifest: &mut Manifest) -> Result<()> {
        let track = manifest
            .artifacts
            .dubbed_audio
            .as_ref()
            .ok_or_else(|| DubError::LipSync("no dubbed audio recorded".to_string()))?;
        let face = manifest.source.face();
        let output = self.work_dir().join(LIPSYNC_VIDEO);

        self.providers.lipsync.render(face, &track.path, &output).await?;
        manifest.artifacts.lipsync_video = Some(output);
        Ok(())
    }

    pub(super) async fn package(&self, manifest: &mut Manifest) -> Result<(PathBuf, DurationReport)> {
        let output_dir = &self.config.paths.output_dir;
        tokio::fs::create_dir_all(output_dir).await?;

        let lipsync_video = manifest
            .artifacts
            .lipsync_video
            .clone()
            .ok_or_else(|| DubError::Media("no lip-synced video recorded".to_string()))?;
        let track = manifest
            .artifacts
            .dubbed_audio
            .clone()
            .ok_or_else(|| DubError::Media("no dubbed audio recorded".to_string()))?;
        let final_video = output_dir.join(&self.config.package.final_video_name);

        if self.config.package.remux {
            self.providers.media.mux(&lipsync_video, &track.path, &final_video).await?;
        } else {
            tokio::fs::copy(&lipsync_video, &final_video).await?;
        }
        info!("Final video: {}", final_video.display());

        if self.config.package.write_subtitles {
            let srt = final_video.with_extension("srt");
            generate_srt(&manifest.segments, self.config.assembly.padding_seconds, &srt).await?;
            manifest.artifacts.subtitles = Some(srt);
        }

        let durations = DurationValidator::new(self.config.validation.tolerance_seconds)
            .validate(self.providers.media.as_ref(), &final_video, &track.path)
            .await?;

        let report_path = output_dir.join(REPORT_FILE);
        PipelineReport::from_manifest(manifest, &final_video, durations.clone())
            .write(&report_path)
            .await?;

        manifest.artifacts.final_video = Some(final_video.clone());
        manifest.artifacts.report = Some(report_path);
        Ok((final_video, durations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::RawSegment;

    fn raw(start: f64, end: f64, text: &str) -> RawSegment {
        RawSegment {
            start,
            end,
            text: text.to_string(),
            words: vec![],
        }
    }

    #[test]
    fn test_segments_keep_engine_order_and_skip_blanks() {
        let output = TranscriptionOutput {
            detected_language: "en".to_string(),
            segments: vec![
                raw(0.0, 1.5, " Warm the oil. "),
                raw(1.5, 2.0, "   "),
                raw(1.2, 3.0, "so so so gently"),
            ],
        };
        let segments = segments_from_transcription(&output, &TranscriptCleaner::new(true));

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].id, 0);
        assert_eq!(segments[0].source_text, "Warm the oil.");
        assert_eq!(segments[1].id, 1);
        assert_eq!(segments[1].start, 1.2);
        assert_eq!(segments[1].source_text, "so gently");
    }

    #[test]
    fn test_inverted_timing_is_clamped() {
        let output = TranscriptionOutput {
            detected_language: "en".to_string(),
            segments: vec![raw(4.0, 3.5, "late"), raw(f64::NAN, 1.0, "bad")],
        };
        let segments = segments_from_transcription(&output, &TranscriptCleaner::new(true));
        assert_eq!(segments.len(), 1);
        assert_eq!((segments[0].start, segments[0].end), (4.0, 4.0));
    }
}
