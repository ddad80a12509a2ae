//! Everything that touches ffmpeg, ffprobe or pixels.

pub mod command;
pub mod concat;
pub mod encoding;
pub mod gap;
pub mod normalize;
pub mod probe;
pub mod segment;

pub use command::{tool_available, FfmpegCommand, ToolRunner};
pub use concat::Concatenator;
pub use encoding::{loop_count, EncodingProfile, STANDARD};
pub use gap::{GapFill, GapRenderer};
pub use normalize::{fit_dimensions, letterbox, normalize_image, normalize_image_async};
pub use probe::{MediaProber, StreamSummary};
pub use segment::{AudioTrack, SegmentRenderer, SourceKind};
