//! Duration and stream queries through ffprobe.
//!
//! Durations are best-effort telemetry: [`MediaProber::duration`] never fails
//! and degrades to [`PROBE_FALLBACK_DURATION`] instead.

use std::ffi::OsStr;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{MediaError, MediaResult};
use crate::media::command::ToolRunner;
use crate::media::encoding::{
    ANIMATION_FALLBACK_DURATION, MIN_ANIMATION_DURATION, PROBE_FALLBACK_DURATION,
};

/// Stream kinds present in a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub video_streams: usize,
    pub audio_streams: usize,
}

impl StreamSummary {
    pub fn has_video_and_audio(&self) -> bool {
        self.video_streams > 0 && self.audio_streams > 0
    }
}

#[derive(Debug, Clone)]
pub struct MediaProber {
    runner: ToolRunner,
}

impl MediaProber {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ToolRunner::new(&config.tools.ffprobe, config.timeouts.probe()))
    }

    /// Container duration in seconds
    pub async fn try_duration(&self, path: &Path) -> MediaResult<f64> {
        if !path.exists() {
            return Err(MediaError::MissingSource { path: path.to_path_buf() });
        }

        let output = self
            .runner
            .run(probe_args("format=duration", path))
            .await?;

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    /// Container duration, or the fixed fallback when probing fails
    pub async fn duration(&self, path: &Path) -> f64 {
        match self.try_duration(path).await {
            Ok(duration) => {
                debug!("Probed {}: {:.3}s", path.display(), duration);
                duration
            }
            Err(e) => {
                warn!(
                    "Could not probe {} ({}), assuming {:.1}s",
                    path.display(),
                    e,
                    PROBE_FALLBACK_DURATION
                );
                PROBE_FALLBACK_DURATION
            }
        }
    }

    /// Native playback length of an animation, floored at 0.1s
    pub async fn animation_duration(&self, path: &Path) -> f64 {
        match self.try_duration(path).await {
            Ok(duration) => duration.max(MIN_ANIMATION_DURATION),
            Err(e) => {
                debug!("Could not probe animation {}: {}", path.display(), e);
                ANIMATION_FALLBACK_DURATION
            }
        }
    }

    /// Count video and audio streams
    pub async fn stream_summary(&self, path: &Path) -> MediaResult<StreamSummary> {
        let output = self
            .runner
            .run(probe_args("stream=codec_type", path))
            .await?;

        Ok(parse_stream_kinds(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn probe_args<'a>(entries: &'a str, path: &'a Path) -> [&'a OsStr; 7] {
    [
        OsStr::new("-v"),
        OsStr::new("error"),
        OsStr::new("-show_entries"),
        OsStr::new(entries),
        OsStr::new("-of"),
        OsStr::new("csv=p=0"),
        path.as_os_str(),
    ]
}

fn parse_duration(stdout: &str) -> MediaResult<f64> {
    let trimmed = stdout.trim();
    // Some containers report one line per program; the first is the format
    let first = trimmed.lines().next().unwrap_or("").trim().trim_end_matches(',');
    match first.parse::<f64>() {
        Ok(d) if d.is_finite() && d >= 0.0 => Ok(d),
        _ => Err(MediaError::UnparseableOutput {
            tool: "ffprobe".to_string(),
            output: trimmed.to_string(),
        }),
    }
}

fn parse_stream_kinds(stdout: &str) -> StreamSummary {
    stdout
        .lines()
        .map(|line| line.trim().trim_end_matches(','))
        .fold(StreamSummary::default(), |mut summary, kind| {
            match kind {
                "video" => summary.video_streams += 1,
                "audio" => summary.audio_streams += 1,
                _ => {}
            }
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("12.345000\n").unwrap(), 12.345);
        assert_eq!(parse_duration("8.0,\n").unwrap(), 8.0);
        assert!(parse_duration("N/A").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-1.0").is_err());
    }

    #[test]
    fn test_parse_stream_kinds() {
        let summary = parse_stream_kinds("video\naudio\n");
        assert!(summary.has_video_and_audio());

        let silent = parse_stream_kinds("video\n");
        assert_eq!(silent.audio_streams, 0);
        assert!(!silent.has_video_and_audio());
    }

    #[tokio::test]
    async fn test_missing_tool_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("narration.wav");
        std::fs::write(&audio, b"not really audio").unwrap();

        let prober = MediaProber::new(ToolRunner::new("/nonexistent/ffprobe", Duration::from_secs(5)));
        assert_eq!(prober.duration(&audio).await, PROBE_FALLBACK_DURATION);
        assert_eq!(prober.animation_duration(&audio).await, ANIMATION_FALLBACK_DURATION);
    }

    #[tokio::test]
    async fn test_missing_file_falls_back() {
        let prober = MediaProber::new(ToolRunner::new("ffprobe", Duration::from_secs(5)));
        let missing = Path::new("/definitely/missing.wav");
        assert!(matches!(
            prober.try_duration(missing).await,
            Err(MediaError::MissingSource { .. })
        ));
        assert_eq!(prober.duration(missing).await, PROBE_FALLBACK_DURATION);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fake_probe_output() {
        let tools = crate::test_support::FakeTools::new();
        tools.set_probe_duration(7.25);
        let clip = tools.dir().join("clip.mp4");
        std::fs::write(&clip, b"x").unwrap();

        let prober = MediaProber::from_config(&tools.config());
        assert_eq!(prober.duration(&clip).await, 7.25);
        // Floor only applies to animations
        tools.set_probe_duration(0.04);
        assert_eq!(prober.animation_duration(&clip).await, MIN_ANIMATION_DURATION);
    }
}
