//! Read-only progress reporting over the clip pool.

use serde::Serialize;
use tracing::debug;

use crate::clip::{Clip, VideoType, GAP_OVERHEAD, NOMINAL_SEGMENT_DURATION};
use crate::media::probe::MediaProber;

/// How close the pool is to filling one video type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetReport {
    pub video_type: VideoType,
    pub min_duration: f64,
    pub max_duration: f64,

    /// Scheduled duration if every unconsumed clip were used
    pub current_duration: f64,

    pub available_clips: usize,
    pub can_generate: bool,

    /// `current / min` as a percentage, capped at 100
    pub progress_percent: f64,
}

#[derive(Debug, Clone)]
pub struct DurationBudgeter {
    prober: MediaProber,
}

impl DurationBudgeter {
    pub fn new(prober: MediaProber) -> Self {
        Self { prober }
    }

    /// Report for every video type; each clip is probed at most once
    pub async fn report_all(&self, clips: &[Clip]) -> Vec<BudgetReport> {
        let costs = self.costs(clips).await;
        VideoType::ALL
            .iter()
            .map(|&video_type| summarize(clips, &costs, video_type))
            .collect()
    }

    pub async fn report(&self, clips: &[Clip], video_type: VideoType) -> BudgetReport {
        let costs = self.costs(clips).await;
        summarize(clips, &costs, video_type)
    }

    async fn costs(&self, clips: &[Clip]) -> Vec<f64> {
        let mut costs = Vec::with_capacity(clips.len());
        for clip in clips {
            let cost = match clip.usable_audio() {
                Some(audio) => self.prober.duration(audio).await + GAP_OVERHEAD,
                None => NOMINAL_SEGMENT_DURATION,
            };
            debug!("Clip {} budgets {:.2}s", clip.id, cost);
            costs.push(cost);
        }
        costs
    }
}

fn summarize(clips: &[Clip], costs: &[f64], video_type: VideoType) -> BudgetReport {
    let profile = video_type.profile();
    let (current_duration, available_clips) = clips
        .iter()
        .zip(costs)
        .filter(|(clip, _)| !clip.is_consumed_by(video_type))
        .fold((0.0, 0usize), |(total, count), (_, cost)| (total + cost, count + 1));

    let progress_percent = if profile.min_duration > 0.0 {
        (current_duration / profile.min_duration * 100.0).min(100.0)
    } else {
        100.0
    };

    BudgetReport {
        video_type,
        min_duration: profile.min_duration,
        max_duration: profile.max_duration,
        current_duration,
        available_clips,
        can_generate: current_duration >= profile.min_duration,
        progress_percent,
    }
}
