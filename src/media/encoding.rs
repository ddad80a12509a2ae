//! The single codec profile every segment and the final artifact share.
//!
//! Segments produced by different code paths (narrated, silent, animated,
//! black) must agree on every parameter below, or concatenation drifts.

use crate::clip::Canvas;
use crate::media::command::FfmpegCommand;

/// Fixed encoding parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingProfile {
    pub video_codec: &'static str,
    pub preset: &'static str,
    pub crf: u8,
    pub pixel_format: &'static str,
    pub fps: u32,

    /// GOP length in frames
    pub keyframe_interval: u32,

    pub audio_codec: &'static str,
    pub audio_bitrate: &'static str,
    pub sample_rate: u32,
    pub channels: u8,

    /// Container extension of every produced file
    pub extension: &'static str,
}

/// H.264 / AAC at 30fps with a 2 second GOP
pub const STANDARD: EncodingProfile = EncodingProfile {
    video_codec: "libx264",
    preset: "medium",
    crf: 23,
    pixel_format: "yuv420p",
    fps: 30,
    keyframe_interval: 60,
    audio_codec: "aac",
    audio_bitrate: "128k",
    sample_rate: 44100,
    channels: 2,
    extension: "mp4",
};

/// Probe failure fallback for content and container durations (seconds)
pub const PROBE_FALLBACK_DURATION: f64 = 3.0;

/// Assumed native length of an animation that cannot be probed
pub const ANIMATION_FALLBACK_DURATION: f64 = 1.0;

/// Shortest native animation length the loop count is computed against
pub const MIN_ANIMATION_DURATION: f64 = 0.1;

/// Lower bound on `-stream_loop` repetitions
pub const MIN_LOOP_COUNT: u32 = 10;

impl EncodingProfile {
    /// Video and audio output parameters, plus the web fast-start flag
    pub fn apply(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        cmd.output_args([
            "-c:v".to_string(),
            self.video_codec.to_string(),
            "-preset".to_string(),
            self.preset.to_string(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.to_string(),
            "-r".to_string(),
            self.fps.to_string(),
            "-g".to_string(),
            self.keyframe_interval.to_string(),
            "-c:a".to_string(),
            self.audio_codec.to_string(),
            "-b:a".to_string(),
            self.audio_bitrate.to_string(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-ac".to_string(),
            self.channels.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ])
    }

    /// Silent stereo source matching the audio parameters
    pub fn silence_source(&self) -> String {
        let layout = if self.channels == 1 { "mono" } else { "stereo" };
        format!("anullsrc=channel_layout={}:sample_rate={}", layout, self.sample_rate)
    }

    /// Solid black source of the exact canvas and duration
    pub fn black_source(&self, canvas: Canvas, duration: f64) -> String {
        format!(
            "color=c=black:size={}:rate={}:duration={:.3}",
            canvas, self.fps, duration
        )
    }

    /// Scale to fit inside the canvas and pad the rest with black, centered
    pub fn fit_filter(&self, canvas: Canvas) -> String {
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black,setsar=1",
            w = canvas.width,
            h = canvas.height
        )
    }
}

/// `-stream_loop` count that comfortably covers `target` seconds
pub fn loop_count(target: f64, native: f64) -> u32 {
    let native = native.max(MIN_ANIMATION_DURATION);
    let doubled = ((target / native) * 2.0).floor();
    if doubled.is_finite() && doubled > MIN_LOOP_COUNT as f64 {
        doubled.min(u32::MAX as f64) as u32
    } else {
        MIN_LOOP_COUNT
    }
}
