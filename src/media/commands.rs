use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{DubError, Result};

/// One external media tool invocation.
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    pub fn audio_bitrate<S: Into<String>>(self, bitrate: S) -> Self {
        self.arg("-b:a").arg(bitrate)
    }

    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-filter_complex").arg(graph)
    }

    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    /// Run the command, failing on a non-zero exit status.
    pub async fn execute(&self) -> Result<()> {
        self.run().await.map(|_| ())
    }

    /// Run the command and return its standard output.
    pub async fn execute_capture(&self) -> Result<String> {
        self.run().await
    }

    async fn run(&self) -> Result<String> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| {
                DubError::Media(format!("Failed to execute {}: {}", self.binary_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builds the ffmpeg and ffprobe invocations the pipeline needs.
pub struct MediaCommandBuilder {
    binary_path: String,
    probe_binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, probe_binary_path: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            probe_binary_path: probe_binary_path.into(),
        }
    }

    /// Mono 16-bit PCM speech track for the transcriber.
    pub fn extract_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        sample_rate: u32,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(sample_rate)
            .audio_channels(1)
            .overwrite()
            .output(audio_path)
    }

    pub fn probe_duration<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.probe_binary_path, "Duration probe")
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .output(path)
    }

    /// Join clips in order with `padding` seconds of silence after every
    /// clip but the last, re-encoding to one consistent format.
    pub fn concat_with_padding<P: AsRef<Path>>(
        &self,
        clips: &[P],
        padding: f64,
        output_path: &Path,
        bitrate: &str,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(
            &self.binary_path,
            format!("Concatenation of {} clips", clips.len()),
        );
        for clip in clips {
            cmd = cmd.input(clip);
        }
        cmd.filter_complex(concat_filter_graph(clips.len(), padding))
            .map("[out]")
            .audio_codec("libmp3lame")
            .audio_bitrate(bitrate)
            .overwrite()
            .output(output_path)
    }

    /// Replace the audio of `video_path` with `audio_path`, keeping the video stream.
    pub fn mux<P: AsRef<Path>>(&self, video_path: P, audio_path: P, output_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio/video mux")
            .input(video_path)
            .input(audio_path)
            .map("0:v:0")
            .map("1:a:0")
            .copy_video()
            .audio_codec("aac")
            .arg("-shortest")
            .overwrite()
            .output(output_path)
    }

    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }

    pub fn probe_version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.probe_binary_path, "Version check").arg("-version")
    }
}

/// Filter graph normalizing every input, padding all but the last, then
/// concatenating them in input order.
pub fn concat_filter_graph(count: usize, padding: f64) -> String {
    let mut graph = String::new();
    for index in 0..count {
        graph.push_str(&format!(
            "[{index}:a]aresample=44100,aformat=sample_fmts=fltp:channel_layouts=mono"
        ));
        if index + 1 < count && padding > 0.0 {
            graph.push_str(&format!(",apad=pad_dur={padding}"));
        }
        graph.push_str(&format!("[a{index}];"));
    }
    for index in 0..count {
        graph.push_str(&format!("[a{index}]"));
    }
    graph.push_str(&format!("concat=n={count}:v=0:a=1[out]"));
    graph
}

/// Parse ffprobe's bare `format=duration` output.
pub fn parse_probe_duration(stdout: &str) -> Result<f64> {
    let raw = stdout.trim();
    raw.parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .ok_or_else(|| DubError::Media(format!("Unexpected duration output: '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_audio_arguments() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.extract_audio("in.mp4", "work/extracted_audio.wav", 16000);
        assert_eq!(
            cmd.args,
            vec![
                "-i", "in.mp4", "-vn", "-c:a", "pcm_s16le", "-ar", "16000", "-ac", "1", "-y",
                "work/extracted_audio.wav"
            ]
        );
    }

    #[test]
    fn test_probe_uses_probe_binary() {
        let builder = MediaCommandBuilder::new("/opt/ffmpeg", "/opt/ffprobe");
        let cmd = builder.probe_duration("clip.mp3");
        assert_eq!(cmd.binary_path, "/opt/ffprobe");
        assert_eq!(cmd.args.last().map(String::as_str), Some("clip.mp3"));
    }

    #[test]
    fn test_concat_filter_graph_pads_between_clips_only() {
        let graph = concat_filter_graph(3, 0.2);
        assert_eq!(graph.matches("apad=pad_dur=0.2").count(), 2);
        assert!(graph.contains("[2:a]aresample=44100,aformat=sample_fmts=fltp:channel_layouts=mono[a2];"));
        assert!(graph.ends_with("[a0][a1][a2]concat=n=3:v=0:a=1[out]"));
    }

    #[test]
    fn test_concat_single_clip_has_no_padding() {
        let graph = concat_filter_graph(1, 0.5);
        assert!(!graph.contains("apad"));
        assert!(graph.ends_with("[a0]concat=n=1:v=0:a=1[out]"));
    }

    #[test]
    fn test_concat_inputs_keep_order() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let clips = ["b.mp3", "a.mp3"];
        let cmd = builder.concat_with_padding(&clips, 0.2, Path::new("out.mp3"), "128k");
        let inputs: Vec<&str> = cmd
            .args
            .windows(2)
            .filter(|pair| pair[0] == "-i")
            .map(|pair| pair[1].as_str())
            .collect();
        assert_eq!(inputs, vec!["b.mp3", "a.mp3"]);
    }

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(parse_probe_duration("121.100000\n").unwrap(), 121.1);
        assert!(parse_probe_duration("N/A").is_err());
        assert!(parse_probe_duration("").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_media_error() {
        let cmd = MediaCommand::new("/nonexistent/redub-ffmpeg", "Version check").arg("-version");
        assert!(matches!(cmd.execute().await, Err(DubError::Media(_))));
    }
}
