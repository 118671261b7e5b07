use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Manifest path (defaults to <work_dir>/manifest.json)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the dubbing pipeline, starting at the given stage
    Run {
        /// Stage to start from: transcribe, translate, tag-emotion, synthesize, lip-sync, package
        #[arg(long, default_value = "transcribe")]
        from_stage: String,

        /// Last stage to run (defaults to package)
        #[arg(long)]
        to_stage: Option<String>,

        /// Input video file (overrides paths.input_video)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Target language code (overrides translate.target_language)
        #[arg(short, long)]
        target_lang: Option<String>,
    },

    /// Show stage completion and failed segments recorded in the manifest
    Status,

    /// Check that the configured external tools and services are reachable
    Check,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_arguments() {
        let args = Args::parse_from([
            "redub",
            "--verbose",
            "run",
            "--from-stage",
            "synthesize",
            "--target-lang",
            "ta",
        ]);
        assert!(args.verbose);
        match args.command {
            Commands::Run { from_stage, to_stage, target_lang, input } => {
                assert_eq!(from_stage, "synthesize");
                assert_eq!(to_stage, None);
                assert_eq!(target_lang.as_deref(), Some("ta"));
                assert!(input.is_none());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_run_defaults_to_transcribe() {
        let args = Args::parse_from(["redub", "run"]);
        assert!(matches!(args.command, Commands::Run { ref from_stage, .. } if from_stage == "transcribe"));
    }
}
