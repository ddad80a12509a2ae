//! TOML clip pool shared between runs.
//!
//! ```toml
//! [[clips]]
//! id = 1
//! image_path = "memes/cat.png"
//! audio_path = "audio/cat.wav"
//! duration = 6.4
//! used_in_regular = false
//! used_in_shorts = true
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clip::types::{is_valid_duration, Clip, ClipId, VideoType};
use crate::error::{ManifestError, Result};
use crate::media::probe::MediaProber;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipManifest {
    #[serde(default)]
    pub clips: Vec<Clip>,
}

impl ClipManifest {
    pub fn new(clips: Vec<Clip>) -> Self {
        Self { clips }
    }

    /// Load a manifest from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ManifestError::NotFound {
            path: path.display().to_string(),
        })?;

        let manifest: ClipManifest = toml::from_str(&content).map_err(|e| ManifestError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        manifest.validate()?;
        debug!("Loaded {} clips from {}", manifest.clips.len(), path.display());
        Ok(manifest)
    }

    /// Every duration hint must be finite and non-negative
    pub fn validate(&self) -> Result<()> {
        for clip in &self.clips {
            if let Some(value) = clip.duration.filter(|d| !is_valid_duration(*d)) {
                return Err(ManifestError::InvalidDuration { id: clip.id, value }.into());
            }
        }
        Ok(())
    }

    /// Save the manifest as TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ManifestError::WriteFailed { reason: e.to_string() })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Clips not yet consumed by `video_type`, in manifest order
    pub fn available_for(&self, video_type: VideoType) -> Vec<Clip> {
        self.clips
            .iter()
            .filter(|clip| !clip.is_consumed_by(video_type))
            .cloned()
            .collect()
    }

    /// Fill missing duration hints from the narration files.
    /// Returns how many clips were updated.
    pub async fn resolve_durations(&mut self, prober: &MediaProber) -> usize {
        let mut resolved = 0;
        for clip in self.clips.iter_mut().filter(|c| c.duration.is_none()) {
            let Some(audio) = clip.usable_audio() else {
                continue;
            };
            let duration = prober.duration(audio).await;
            clip.duration = Some(duration);
            resolved += 1;
        }
        resolved
    }

    /// Flag `ids` as consumed by `video_type`; no clip changes unless every id is known
    pub fn mark_consumed(&mut self, ids: &[ClipId], video_type: VideoType) -> Result<()> {
        let known: HashSet<ClipId> = self.clips.iter().map(|c| c.id).collect();
        if let Some(&unknown) = ids.iter().find(|id| !known.contains(id)) {
            return Err(ManifestError::UnknownClip { id: unknown }.into());
        }

        let wanted: HashSet<ClipId> = ids.iter().copied().collect();
        for clip in self.clips.iter_mut().filter(|c| wanted.contains(&c.id)) {
            clip.mark_consumed_by(video_type);
        }

        info!("Marked {} clips as used for {}", wanted.len(), video_type);
        Ok(())
    }
}
