//! Prefix selection of clips against a profile's duration envelope.

use crate::clip::{Clip, ClipId, ScheduledSegment, VideoProfile};
use crate::error::SelectionError;

/// Outcome of one selection walk
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub segments: Vec<ScheduledSegment>,
    pub planned_duration: f64,
}

impl Selection {
    pub fn clip_ids(&self) -> Vec<ClipId> {
        self.segments.iter().map(|s| s.clip.id).collect()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Walk `clips` in order and take the longest prefix that fits `profile`.
///
/// A clip that would overflow `max_duration` ends the walk; nothing behind it
/// is considered. Profiles that require their target stop as soon as it is
/// reached and reject any selection short of it.
pub fn select(clips: &[Clip], profile: &VideoProfile) -> Result<Selection, SelectionError> {
    let mut segments = Vec::new();
    let mut total = 0.0;

    for clip in clips {
        let cost = clip.segment_cost();
        if total + cost > profile.max_duration {
            break;
        }

        total += cost;
        segments.push(ScheduledSegment {
            clip: clip.clone(),
            duration: cost,
        });

        if profile.requires_target && total >= profile.target_duration {
            break;
        }
    }

    if profile.requires_target && total < profile.target_duration {
        return Err(SelectionError::InsufficientDuration {
            planned: total,
            target: profile.target_duration,
        });
    }

    if segments.is_empty() {
        return Err(SelectionError::NothingSelected {
            max: profile.max_duration,
        });
    }

    Ok(Selection {
        segments,
        planned_duration: total,
    })
}
