use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::Result;
use crate::segment::Segment;

/// One subtitle line on the dubbed timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub segment_id: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Place every assembled segment on the re-paced dubbed timeline: clips
/// follow each other with `padding` seconds between them, in id order.
pub fn dubbed_cues(segments: &[Segment], padding: f64) -> Vec<Cue> {
    let mut ordered: Vec<&Segment> = segments.iter().collect();
    ordered.sort_by_key(|segment| segment.id);

    let mut cues = Vec::new();
    let mut cursor = 0.0;
    for segment in ordered {
        let (Some(clip), Some(text)) = (segment.clip(), segment.translation()) else {
            continue;
        };
        if !cues.is_empty() {
            cursor += padding;
        }
        cues.push(Cue {
            segment_id: segment.id,
            start: cursor,
            end: cursor + clip.duration,
            text: text.to_string(),
        });
        cursor += clip.duration;
    }
    cues
}

pub fn render_srt(cues: &[Cue]) -> String {
    let mut srt_content = String::new();
    for (index, cue) in cues.iter().enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(cue.start),
            format_srt_time(cue.end),
            cue.text.trim()
        ));
    }
    srt_content
}

/// Write an SRT file with the translated text of the assembled segments
pub async fn generate_srt<P: AsRef<Path>>(
    segments: &[Segment],
    padding: f64,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    let cues = dubbed_cues(segments, padding);
    fs::write(output_path, render_srt(&cues)).await?;

    info!("SRT file generated with {} cues", cues.len());
    Ok(())
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
