//! Render one clip into a fixed-codec segment.
//!
//! Static images are letterboxed in-process and looped as a single frame.
//! Animations are looped at the input with `-stream_loop`, and retried once
//! without it if the encoder rejects the looped invocation. Every segment
//! carries an audio stream: the narration when present, silence otherwise.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::clip::{Canvas, DEFAULT_CLIP_DURATION};
use crate::config::Config;
use crate::error::{MediaError, MediaResult};
use crate::media::command::{FfmpegCommand, ToolRunner};
use crate::media::encoding::{loop_count, STANDARD};
use crate::media::normalize::normalize_image_async;
use crate::media::probe::MediaProber;

/// How a visual source is fed to the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Still,
    Animated,
}

impl SourceKind {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gif") => SourceKind::Animated,
            _ => SourceKind::Still,
        }
    }
}

/// Audio stream paired with the visual
#[derive(Debug, Clone, Copy)]
pub enum AudioTrack<'a> {
    Narration(&'a Path),
    Silence,
}

#[derive(Debug, Clone)]
pub struct SegmentRenderer {
    ffmpeg: ToolRunner,
    prober: MediaProber,
    min_output_bytes: u64,
}

impl SegmentRenderer {
    pub fn new(ffmpeg: ToolRunner, prober: MediaProber, min_output_bytes: u64) -> Self {
        Self {
            ffmpeg,
            prober,
            min_output_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ToolRunner::new(&config.tools.ffmpeg, config.timeouts.render()),
            MediaProber::from_config(config),
            config.output.min_segment_bytes,
        )
    }

    pub(crate) fn ffmpeg(&self) -> &ToolRunner {
        &self.ffmpeg
    }

    /// Same renderer with a different encode time limit
    pub(crate) fn with_encode_timeout(&self, timeout: std::time::Duration) -> Self {
        Self {
            ffmpeg: self.ffmpeg.with_timeout(timeout),
            prober: self.prober.clone(),
            min_output_bytes: self.min_output_bytes,
        }
    }

    /// Render a content segment; returns its content duration
    pub async fn render(
        &self,
        source: &Path,
        audio: Option<&Path>,
        output: &Path,
        canvas: Canvas,
    ) -> MediaResult<f64> {
        if !source.exists() {
            return Err(MediaError::MissingSource { path: source.to_path_buf() });
        }

        let (track, duration) = match audio.filter(|p| p.exists()) {
            Some(narration) => {
                let duration = self.prober.duration(narration).await;
                debug!("Using narration duration {:.3}s", duration);
                (AudioTrack::Narration(narration), duration)
            }
            None => {
                debug!("No narration, using {:.1}s of silence", DEFAULT_CLIP_DURATION);
                (AudioTrack::Silence, DEFAULT_CLIP_DURATION)
            }
        };

        self.render_visual(source, track, duration, output, canvas).await?;
        let bytes = verify_output(output, self.min_output_bytes)?;
        info!("Rendered segment {} ({} bytes)", output.display(), bytes);
        Ok(duration)
    }

    /// Encode `source` for exactly `duration` seconds with the given audio
    pub(crate) async fn render_visual(
        &self,
        source: &Path,
        track: AudioTrack<'_>,
        duration: f64,
        output: &Path,
        canvas: Canvas,
    ) -> MediaResult<()> {
        match SourceKind::of(source) {
            SourceKind::Animated => self.render_animated(source, track, duration, output, canvas).await,
            SourceKind::Still => self.render_still(source, track, duration, output, canvas).await,
        }
    }

    async fn render_animated(
        &self,
        source: &Path,
        track: AudioTrack<'_>,
        duration: f64,
        output: &Path,
        canvas: Canvas,
    ) -> MediaResult<()> {
        let native = self.prober.animation_duration(source).await;
        let loops = loop_count(duration, native);
        debug!(
            "Animation {} lasts {:.3}s, looping {} times for {:.3}s",
            source.display(),
            native,
            loops,
            duration
        );

        let looped = encode_command(
            ["-stream_loop".to_string(), loops.to_string()],
            source,
            track,
            duration,
            output,
            canvas,
        );

        match self.ffmpeg.run_ffmpeg(&looped).await {
            Ok(_) => Ok(()),
            Err(MediaError::ToolFailed { stderr, .. }) if looped.uses_stream_loop() => {
                warn!(
                    "Stream loop failed for {} ({}), retrying without looping",
                    source.display(),
                    stderr
                );
                let single = encode_command(Vec::<String>::new(), source, track, duration, output, canvas);
                self.ffmpeg.run_ffmpeg(&single).await.map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    async fn render_still(
        &self,
        source: &Path,
        track: AudioTrack<'_>,
        duration: f64,
        output: &Path,
        canvas: Canvas,
    ) -> MediaResult<()> {
        let scratch = scratch_dir_for(output);
        let frame = tempfile::Builder::new()
            .prefix("frame_")
            .suffix(".jpg")
            .tempfile_in(&scratch)?
            .into_temp_path();

        let result = match normalize_image_async(source.to_path_buf(), canvas, frame.to_path_buf()).await {
            Ok(()) => {
                let cmd = encode_command(
                    ["-loop".to_string(), "1".to_string()],
                    &frame,
                    track,
                    duration,
                    output,
                    canvas,
                );
                self.ffmpeg.run_ffmpeg(&cmd).await.map(|_| ())
            }
            Err(e) => Err(e),
        };

        if let Err(e) = frame.close() {
            debug!("Could not remove normalized frame: {}", e);
        }
        result
    }
}

/// Build one encode: visual input, audio input, fixed profile
fn encode_command<I>(
    input_options: I,
    visual: &Path,
    track: AudioTrack<'_>,
    duration: f64,
    output: &Path,
    canvas: Canvas,
) -> FfmpegCommand
where
    I: IntoIterator<Item = String>,
{
    let cmd = FfmpegCommand::new(output).input_with(input_options, visual.as_os_str());
    let cmd = match track {
        AudioTrack::Narration(audio) => cmd.input(audio),
        AudioTrack::Silence => cmd.lavfi(STANDARD.silence_source()),
    };

    STANDARD
        .apply(
            cmd.output_args(["-map", "0:v:0", "-map", "1:a:0"])
                .duration(duration)
                .video_filter(STANDARD.fit_filter(canvas)),
        )
        .shortest()
}

/// Directory that receives temporary frames for `output`
fn scratch_dir_for(output: &Path) -> PathBuf {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::temp_dir(),
    }
}

/// Size of `output`, which must exceed `min_bytes`
pub(crate) fn verify_output(output: &Path, min_bytes: u64) -> MediaResult<u64> {
    let bytes = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    if bytes > min_bytes {
        Ok(bytes)
    } else {
        Err(MediaError::OutputTooSmall {
            path: output.to_path_buf(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_png, FakeTools};

    const CANVAS: Canvas = Canvas::new(1920, 1080);

    #[test]
    fn test_source_kind() {
        assert_eq!(SourceKind::of(Path::new("a/b/funny.GIF")), SourceKind::Animated);
        assert_eq!(SourceKind::of(Path::new("funny.gif")), SourceKind::Animated);
        assert_eq!(SourceKind::of(Path::new("funny.png")), SourceKind::Still);
        assert_eq!(SourceKind::of(Path::new("no_extension")), SourceKind::Still);
    }

    #[test]
    fn test_encode_command_silent_still() {
        let cmd = encode_command(
            ["-loop".to_string(), "1".to_string()],
            Path::new("frame.jpg"),
            AudioTrack::Silence,
            3.0,
            Path::new("clip.mp4"),
            CANVAS,
        );
        let args: Vec<String> = cmd.build_args().iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(args.windows(4).any(|w| w == ["-loop", "1", "-i", "frame.jpg"]));
        assert!(args.iter().any(|a| a.starts_with("anullsrc=channel_layout=stereo")));
        assert!(args.windows(2).any(|w| w == ["-t", "3.000"]));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(!cmd.uses_stream_loop());
    }

    #[test]
    fn test_verify_output() {
        let dir = tempfile::tempdir().unwrap();
        let small = dir.path().join("small.mp4");
        std::fs::write(&small, vec![0u8; 500]).unwrap();
        assert!(matches!(verify_output(&small, 1000), Err(MediaError::OutputTooSmall { bytes: 500, .. })));

        let big = dir.path().join("big.mp4");
        std::fs::write(&big, vec![0u8; 1500]).unwrap();
        assert_eq!(verify_output(&big, 1000).unwrap(), 1500);

        assert!(verify_output(&dir.path().join("missing.mp4"), 1000).is_err());
    }

    #[tokio::test]
    async fn test_missing_source_fails_without_encoding() {
        let renderer = SegmentRenderer::from_config(&Config::default());
        let dir = tempfile::tempdir().unwrap();
        let result = renderer
            .render(&dir.path().join("gone.png"), None, &dir.path().join("out.mp4"), CANVAS)
            .await;
        assert!(matches!(result, Err(MediaError::MissingSource { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_still_image_with_narration() {
        let tools = FakeTools::new();
        tools.set_probe_duration(8.0);
        let image = write_png(tools.dir(), "still.png", 800, 600);
        let audio = tools.dir().join("narration.wav");
        std::fs::write(&audio, b"wav").unwrap();
        let output = tools.dir().join("clip.mp4");

        let renderer = SegmentRenderer::from_config(&tools.config());
        let duration = renderer.render(&image, Some(audio.as_path()), &output, CANVAS).await.unwrap();
        assert_eq!(duration, 8.0);

        let calls = tools.ffmpeg_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("-loop 1"));
        assert!(calls[0].contains("narration.wav"));

        // The normalized frame does not outlive the encode
        let leftovers: Vec<_> = std::fs::read_dir(tools.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("frame_"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_narration_uses_silence() {
        let tools = FakeTools::new();
        let image = write_png(tools.dir(), "still.png", 600, 800);
        let output = tools.dir().join("clip.mp4");

        let renderer = SegmentRenderer::from_config(&tools.config());
        let duration = renderer
            .render(&image, Some(tools.dir().join("never_generated.wav").as_path()), &output, CANVAS)
            .await
            .unwrap();
        assert_eq!(duration, DEFAULT_CLIP_DURATION);
        assert!(tools.ffmpeg_calls()[0].contains("anullsrc"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_animation_falls_back_when_stream_loop_fails() {
        let tools = FakeTools::new();
        tools.fail_when("-stream_loop");
        let gif = tools.dir().join("dance.gif");
        std::fs::write(&gif, b"GIF89a").unwrap();
        let output = tools.dir().join("clip.mp4");

        let renderer = SegmentRenderer::from_config(&tools.config());
        renderer.render(&gif, None, &output, CANVAS).await.unwrap();

        let calls = tools.ffmpeg_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("-stream_loop"));
        assert!(!calls[1].contains("-stream_loop"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_animation_fails_when_both_attempts_fail() {
        let tools = FakeTools::new();
        tools.fail_when("dance.gif");
        let gif = tools.dir().join("dance.gif");
        std::fs::write(&gif, b"GIF89a").unwrap();

        let renderer = SegmentRenderer::from_config(&tools.config());
        let result = renderer.render(&gif, None, &tools.dir().join("clip.mp4"), CANVAS).await;
        assert!(matches!(result, Err(MediaError::ToolFailed { .. })));
        assert_eq!(tools.ffmpeg_calls().len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tiny_output_is_a_failure() {
        let tools = FakeTools::new();
        tools.set_output_bytes(200);
        let image = write_png(tools.dir(), "still.png", 64, 64);

        let renderer = SegmentRenderer::from_config(&tools.config());
        let result = renderer.render(&image, None, &tools.dir().join("clip.mp4"), CANVAS).await;
        assert!(matches!(result, Err(MediaError::OutputTooSmall { bytes: 200, .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_corrupt_image_is_not_encoded() {
        let tools = FakeTools::new();
        let image = tools.dir().join("corrupt.png");
        std::fs::write(&image, b"nope").unwrap();

        let renderer = SegmentRenderer::from_config(&tools.config());
        let result = renderer.render(&image, None, &tools.dir().join("clip.mp4"), CANVAS).await;
        assert!(matches!(result, Err(MediaError::ImageLoad { .. })));
        assert!(tools.ffmpeg_calls().is_empty());
    }
}
