use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Flanking gap rendered before and after every content segment (seconds)
pub const GAP_DURATION: f64 = 1.0;

/// Gap time charged to every scheduled clip: one gap before, one after
pub const GAP_OVERHEAD: f64 = 2.0 * GAP_DURATION;

/// Content duration used when a clip has no narration
pub const DEFAULT_CLIP_DURATION: f64 = 3.0;

/// Budgeted total for a clip whose audio duration cannot be produced
pub const NOMINAL_SEGMENT_DURATION: f64 = DEFAULT_CLIP_DURATION + GAP_OVERHEAD;

/// Identifier assigned to a clip by the caller
pub type ClipId = u64;

/// Finite and non-negative
pub fn is_valid_duration(seconds: f64) -> bool {
    seconds.is_finite() && seconds >= 0.0
}

/// One image or short animation plus optional narration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,

    /// Still image or animated GIF
    pub image_path: PathBuf,

    /// Narration track, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,

    /// Precomputed content duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(default)]
    pub used_in_regular: bool,

    #[serde(default)]
    pub used_in_shorts: bool,
}

impl Clip {
    /// Create an unconsumed clip with no narration
    pub fn new<P: Into<PathBuf>>(id: ClipId, image_path: P) -> Self {
        Self {
            id,
            image_path: image_path.into(),
            audio_path: None,
            duration: None,
            used_in_regular: false,
            used_in_shorts: false,
        }
    }

    /// Attach a narration track and its duration
    pub fn with_audio<P: Into<PathBuf>>(mut self, audio_path: P, duration: f64) -> Self {
        self.audio_path = Some(audio_path.into());
        self.duration = Some(duration);
        self
    }

    /// Content duration, falling back to the silent-clip default when the
    /// hint is absent, negative or not finite
    pub fn content_duration(&self) -> f64 {
        match self.duration {
            Some(d) if is_valid_duration(d) => d,
            _ => DEFAULT_CLIP_DURATION,
        }
    }

    /// Content duration plus both flanking gaps
    pub fn segment_cost(&self) -> f64 {
        GAP_OVERHEAD + self.content_duration()
    }

    /// Narration path, only when the file is actually there
    pub fn usable_audio(&self) -> Option<&Path> {
        self.audio_path.as_deref().filter(|p| p.exists())
    }

    pub fn is_consumed_by(&self, video_type: VideoType) -> bool {
        match video_type {
            VideoType::Regular => self.used_in_regular,
            VideoType::Shorts => self.used_in_shorts,
        }
    }

    pub fn mark_consumed_by(&mut self, video_type: VideoType) {
        match video_type {
            VideoType::Regular => self.used_in_regular = true,
            VideoType::Shorts => self.used_in_shorts = true,
        }
    }
}

/// Requested output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    /// 16:9 long-form
    Regular,
    /// 9:16 short-form
    Shorts,
}

impl VideoType {
    pub const ALL: [VideoType; 2] = [VideoType::Regular, VideoType::Shorts];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoType::Regular => "regular",
            VideoType::Shorts => "shorts",
        }
    }

    pub fn profile(&self) -> &'static VideoProfile {
        match self {
            VideoType::Regular => &VideoProfile::REGULAR,
            VideoType::Shorts => &VideoProfile::SHORTS,
        }
    }
}

impl fmt::Display for VideoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regular" | "long" | "long-form" => Ok(VideoType::Regular),
            "shorts" | "short" | "short-form" => Ok(VideoType::Shorts),
            other => Err(format!("unknown video type '{}' (expected regular or shorts)", other)),
        }
    }
}

/// Output canvas size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Fixed canvas and duration envelope for one video type
#[derive(Debug, Clone, PartialEq)]
pub struct VideoProfile {
    pub video_type: VideoType,
    pub canvas: Canvas,
    pub min_duration: f64,
    pub max_duration: f64,
    pub target_duration: f64,

    /// Stop selecting once the target is reached, and reject anything short of it
    pub requires_target: bool,
}

impl VideoProfile {
    pub const REGULAR: VideoProfile = VideoProfile {
        video_type: VideoType::Regular,
        canvas: Canvas::new(1920, 1080),
        min_duration: 600.0,
        max_duration: 660.0,
        target_duration: 600.0,
        requires_target: true,
    };

    pub const SHORTS: VideoProfile = VideoProfile {
        video_type: VideoType::Shorts,
        canvas: Canvas::new(1080, 1920),
        min_duration: 60.0,
        max_duration: 180.0,
        target_duration: 180.0,
        requires_target: false,
    };
}

/// A selected clip and the time it will occupy in the output
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledSegment {
    pub clip: Clip,

    /// Gap before + content + gap after
    pub duration: f64,
}

/// Position of a rendered file within its clip's slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRole {
    GapBefore,
    Content,
    GapAfter,
}

impl SegmentRole {
    pub fn file_stem(&self, index: usize) -> String {
        match self {
            SegmentRole::GapBefore => format!("gap_before_{index:04}"),
            SegmentRole::Content => format!("clip_{index:04}"),
            SegmentRole::GapAfter => format!("gap_after_{index:04}"),
        }
    }
}

/// One encoded segment file owned by a single run
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSegment {
    pub path: PathBuf,
    pub role: SegmentRole,
    pub clip_id: ClipId,
}

/// What a run hands back to its caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompilationResult {
    pub success: bool,
    pub video_type: VideoType,
    pub output_path: Option<PathBuf>,

    /// Measured duration of the artifact in seconds (0 on failure)
    pub actual_duration: f64,

    /// Duration the selector scheduled
    pub planned_duration: f64,

    pub clips_used: usize,

    /// Consumed clips, in output order
    pub used_clip_ids: Vec<ClipId>,

    /// Selected clips whose content segment failed; still listed in `used_clip_ids`
    pub unrendered_clip_ids: Vec<ClipId>,

    /// Human-readable failure reason
    pub reason: Option<String>,
}

impl CompilationResult {
    pub fn failure(video_type: VideoType, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            video_type,
            output_path: None,
            actual_duration: 0.0,
            planned_duration: 0.0,
            clips_used: 0,
            used_clip_ids: Vec::new(),
            unrendered_clip_ids: Vec::new(),
            reason: Some(reason.into()),
        }
    }
}
