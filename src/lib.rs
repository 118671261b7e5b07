//! redub - segment-aligned video dubbing pipeline
//!
//! Turns a source-language video into a dubbed, lip-synced target-language
//! video: audio extraction, speech-to-text, translation, emotion tagging,
//! speech synthesis, lip-sync rendering and packaging, with every stage's
//! per-utterance results kept in one resumable manifest.

pub mod assembly;
pub mod cli;
pub mod config;
pub mod emotion;
pub mod error;
pub mod http;
pub mod lipsync;
pub mod manifest;
pub mod media;
pub mod pipeline;
pub mod quality;
pub mod report;
pub mod retry;
pub mod segment;
pub mod stage;
pub mod subtitle;
pub mod transcribe;
pub mod translate;
pub mod tts;

pub use config::Config;
pub use error::{DubError, Result};
pub use manifest::Manifest;
pub use pipeline::{Orchestrator, Providers, RunSummary};
pub use stage::Stage;
