use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use super::fingerprint::{THUMB_HEIGHT, THUMB_WIDTH};
use crate::{EvaluatorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoProbe {
    /// Zero when the container does not report a duration.
    pub duration: Duration,
}

/// Decoding primitives the frame extractor needs from a video backend.
#[async_trait]
pub trait VideoDecoder: Send + Sync {
    /// Fails with `UnreadableVideo` when the container or codec cannot be opened.
    async fn probe(&self, path: &Path) -> Result<VideoProbe>;

    /// Row-major 9x8 grayscale thumbnail of the frame at `at`.
    async fn thumbnail(&self, path: &Path, at: Duration) -> Result<Vec<u8>>;

    /// Full-resolution JPEG of the frame at `at`.
    async fn capture_jpeg(&self, path: &Path, at: Duration) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Shells out to `ffprobe` and `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegDecoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn run(&self, program: &Path, args: &[&str], path: &Path) -> Result<Output> {
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                EvaluatorError::Decoder(format!("failed to spawn {}: {}", program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EvaluatorError::UnreadableVideo {
                path: path.to_path_buf(),
                reason: last_line(&stderr),
            });
        }
        Ok(output)
    }

    async fn grab(&self, path: &Path, at: Duration, filters: &[&str]) -> Result<Vec<u8>> {
        let seek = format!("{:.3}", at.as_secs_f64());
        let input = path.to_string_lossy();
        let mut args = vec!["-v", "error", "-ss", seek.as_str(), "-i", &*input, "-frames:v", "1"];
        args.extend_from_slice(filters);
        args.push("-");

        let output = self.run(&self.ffmpeg, &args, path).await?;
        if output.stdout.is_empty() {
            return Err(EvaluatorError::Decoder(format!(
                "no frame decoded at {:.3}s in {}",
                at.as_secs_f64(),
                path.display()
            )));
        }
        Ok(output.stdout)
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl VideoDecoder for FfmpegDecoder {
    async fn probe(&self, path: &Path) -> Result<VideoProbe> {
        let input = path.to_string_lossy();
        let args = [
            "-v",
            "error",
            "-show_entries",
            "format=duration:stream=codec_type",
            "-of",
            "json",
            &*input,
        ];
        let output = self.run(&self.ffprobe, &args, path).await?;
        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)?;
        parse_probe(path, probe)
    }

    async fn thumbnail(&self, path: &Path, at: Duration) -> Result<Vec<u8>> {
        let scale = format!("scale={}:{},format=gray", THUMB_WIDTH, THUMB_HEIGHT);
        let pixels = self
            .grab(path, at, &["-vf", scale.as_str(), "-f", "rawvideo"])
            .await?;
        if pixels.len() != THUMB_WIDTH * THUMB_HEIGHT {
            return Err(EvaluatorError::Decoder(format!(
                "thumbnail at {:.3}s has {} bytes",
                at.as_secs_f64(),
                pixels.len()
            )));
        }
        Ok(pixels)
    }

    async fn capture_jpeg(&self, path: &Path, at: Duration) -> Result<Vec<u8>> {
        self.grab(path, at, &["-q:v", "3", "-f", "image2pipe", "-vcodec", "mjpeg"])
            .await
    }
}

fn parse_probe(path: &Path, probe: ProbeOutput) -> Result<VideoProbe> {
    let has_video = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("video"));
    if !has_video {
        return Err(EvaluatorError::UnreadableVideo {
            path: path.to_path_buf(),
            reason: "no video stream".to_string(),
        });
    }

    let seconds = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);

    Ok(VideoProbe {
        duration: Duration::from_secs_f64(seconds),
    })
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("decoder exited with an error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_json(raw: &str) -> ProbeOutput {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_parse_probe_reads_duration() {
        let probe = probe_json(
            r#"{"streams":[{"codec_type":"audio"},{"codec_type":"video"}],"format":{"duration":"12.500000"}}"#,
        );
        let parsed = parse_probe(Path::new("demo.mp4"), probe).unwrap();
        assert_eq!(parsed.duration, Duration::from_millis(12_500));
    }

    #[test]
    fn test_parse_probe_without_video_is_unreadable() {
        let probe = probe_json(r#"{"streams":[{"codec_type":"audio"}],"format":{"duration":"3.0"}}"#);
        let err = parse_probe(Path::new("voice.m4a"), probe).unwrap_err();
        assert!(matches!(err, EvaluatorError::UnreadableVideo { .. }));
    }

    #[test]
    fn test_parse_probe_missing_duration_is_zero() {
        let probe = probe_json(r#"{"streams":[{"codec_type":"video"}],"format":{"duration":"N/A"}}"#);
        let parsed = parse_probe(Path::new("stream.webm"), probe).unwrap();
        assert_eq!(parsed.duration, Duration::ZERO);
    }

    #[test]
    fn test_last_line_of_stderr() {
        assert_eq!(
            last_line("header\nmoov atom not found\n\n"),
            "moov atom not found"
        );
        assert_eq!(last_line(""), "decoder exited with an error");
    }

    #[tokio::test]
    #[ignore] // Needs ffprobe on PATH
    async fn test_probe_missing_file_with_ffprobe() {
        let decoder = FfmpegDecoder::default();
        let err = decoder.probe(Path::new("/nonexistent/video.mp4")).await.unwrap_err();
        assert!(matches!(err, EvaluatorError::UnreadableVideo { .. }));
    }
}
