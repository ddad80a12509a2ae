use std::path::{Path, PathBuf};

use chrono::Local;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::{
    clip::{Clip, ClipId, CompilationResult, RenderedSegment, SegmentRole, VideoProfile, VideoType, GAP_DURATION},
    config::Config,
    error::{CompilerError, Result},
    media::{
        command::tool_available, concat::Concatenator, encoding::STANDARD, gap::GapRenderer, probe::MediaProber,
        segment::SegmentRenderer,
    },
};

use super::selector::{select, Selection};

/// Main compilation engine that turns a clip pool into one finished video
///
/// Each run follows the same pipeline:
/// 1. Selection - Pick the prefix of clips that fits the video type
/// 2. Rendering - Encode gap / content / gap for every selected clip
/// 3. Concatenation - Join the surviving segments into one file
/// 4. Measurement - Probe the real duration of the result
///
/// Runs never return an error. Every outcome, including a panic inside the
/// pipeline, comes back as a [`CompilationResult`].
#[derive(Debug, Clone)]
pub struct CompilationEngine {
    config: Config,

    #[cfg(test)]
    panic_after_segments: Option<usize>,
}

impl CompilationEngine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            #[cfg(test)]
            panic_after_segments: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compile `clips` (in priority order) into one video of `video_type`
    pub async fn compile(&self, clips: &[Clip], video_type: VideoType) -> CompilationResult {
        let pipeline = Pipeline::new(self.config.clone(), video_type);
        #[cfg(test)]
        let pipeline = Pipeline {
            panic_after_segments: self.panic_after_segments,
            ..pipeline
        };
        let clips = clips.to_vec();

        // Own task, so a panic surfaces as a JoinError instead of unwinding into the caller
        let handle = tokio::spawn(async move { pipeline.run(clips).await });

        match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("❌ {} compilation failed: {}", video_type, e);
                CompilationResult::failure(video_type, e.user_message())
            }
            Err(e) => {
                error!("❌ {} compilation aborted: {}", video_type, e);
                CompilationResult::failure(video_type, format!("Compilation aborted unexpectedly: {}", e))
            }
        }
    }
}

/// State of one compilation run
struct Pipeline {
    config: Config,
    video_type: VideoType,
    profile: &'static VideoProfile,
    segments: SegmentRenderer,
    gaps: GapRenderer,
    concatenator: Concatenator,
    prober: MediaProber,

    #[cfg(test)]
    panic_after_segments: Option<usize>,
}

/// Segments that made it to disk, plus the clips whose content did not
struct RenderOutcome {
    rendered: Vec<RenderedSegment>,
    unrendered: Vec<ClipId>,
}

impl Pipeline {
    fn new(config: Config, video_type: VideoType) -> Self {
        Self {
            segments: SegmentRenderer::from_config(&config),
            gaps: GapRenderer::from_config(&config),
            concatenator: Concatenator::from_config(&config),
            prober: MediaProber::from_config(&config),
            profile: video_type.profile(),
            video_type,
            config,
            #[cfg(test)]
            panic_after_segments: None,
        }
    }

    async fn run(self, clips: Vec<Clip>) -> Result<CompilationResult> {
        info!("🎬 Starting {} compilation", self.video_type);
        info!("   Canvas: {}", self.profile.canvas);
        info!("   Clip pool: {}", clips.len());

        // Pipeline Step 1: Selection
        let selection = self.select_clips(&clips)?;

        if !tool_available(&self.config.tools.ffmpeg).await {
            warn!(
                "{} is not available; rendering will fail",
                self.config.tools.ffmpeg.display()
            );
        }

        tokio::fs::create_dir_all(&self.config.output.directory).await?;
        let scratch = self.scratch_dir()?;
        debug!("Scratch directory: {}", scratch.path().display());

        // Pipeline Steps 2-4, with cleanup regardless of outcome
        let output_path = self.output_path();
        let outcome = self.render_all(&selection, scratch.path()).await;
        let joined = self.join(&outcome.rendered, &output_path, scratch.path()).await;
        cleanup(&outcome.rendered, scratch);

        if let Err(e) = joined {
            if output_path.exists() {
                let _ = std::fs::remove_file(&output_path);
            }
            return Err(e);
        }

        let actual_duration = self.measure(&output_path, selection.planned_duration).await;

        info!("🎉 {} compilation complete: {}", self.video_type, output_path.display());
        Ok(CompilationResult {
            success: true,
            video_type: self.video_type,
            output_path: Some(output_path),
            actual_duration,
            planned_duration: selection.planned_duration,
            clips_used: selection.len(),
            used_clip_ids: selection.clip_ids(),
            unrendered_clip_ids: outcome.unrendered,
            reason: None,
        })
    }

    // ==========================================
    // PIPELINE STEP 1: SELECTION
    // ==========================================

    fn select_clips(&self, clips: &[Clip]) -> Result<Selection> {
        info!("📋 Step 1: Selecting clips...");

        let selection = select(clips, self.profile).map_err(|e| {
            warn!("   Selection rejected: {}", e);
            e
        })?;

        info!(
            "   ✅ Selected {} clips for {:.1}s (target {:.0}s, max {:.0}s)",
            selection.len(),
            selection.planned_duration,
            self.profile.target_duration,
            self.profile.max_duration
        );
        Ok(selection)
    }

    // ==========================================
    // PIPELINE STEP 2: SEGMENT RENDERING
    // ==========================================

    async fn render_all(&self, selection: &Selection, scratch: &Path) -> RenderOutcome {
        info!("🖼️  Step 2: Rendering {} clips...", selection.len());

        let canvas = self.profile.canvas;
        let mut outcome = RenderOutcome {
            rendered: Vec::with_capacity(selection.len() * 3),
            unrendered: Vec::new(),
        };

        for (index, scheduled) in selection.segments.iter().enumerate() {
            let clip = &scheduled.clip;
            debug!("Clip {} ({}/{}): {}", clip.id, index + 1, selection.len(), clip.image_path.display());

            for role in [SegmentRole::GapBefore, SegmentRole::Content, SegmentRole::GapAfter] {
                let path = scratch.join(format!("{}.{}", role.file_stem(index), STANDARD.extension));

                let rendered = match role {
                    SegmentRole::Content => self
                        .segments
                        .render(&clip.image_path, clip.audio_path.as_deref(), &path, canvas)
                        .await
                        .map(|_| ()),
                    SegmentRole::GapBefore | SegmentRole::GapAfter => self
                        .gaps
                        .render(GAP_DURATION, canvas, &path, Some(clip.image_path.as_path()))
                        .await
                        .map(|_| ()),
                };

                match rendered {
                    Ok(()) => {
                        outcome.rendered.push(RenderedSegment {
                            path,
                            role,
                            clip_id: clip.id,
                        });
                        #[cfg(test)]
                        self.trip_fault(outcome.rendered.len());
                    }
                    Err(e) => {
                        warn!("   Skipping {:?} for clip {}: {}", role, clip.id, e);
                        if role == SegmentRole::Content {
                            outcome.unrendered.push(clip.id);
                        }
                    }
                }
            }
        }

        info!(
            "   ✅ Rendered {} segments ({} clips without content)",
            outcome.rendered.len(),
            outcome.unrendered.len()
        );
        outcome
    }

    #[cfg(test)]
    fn trip_fault(&self, rendered: usize) {
        if self.panic_after_segments == Some(rendered) {
            panic!("fault injected after {} segments", rendered);
        }
    }

    // ==========================================
    // PIPELINE STEP 3: CONCATENATION
    // ==========================================

    async fn join(&self, rendered: &[RenderedSegment], output: &Path, scratch: &Path) -> Result<()> {
        info!("🎞️  Step 3: Concatenating segments...");

        if rendered.is_empty() {
            return Err(CompilerError::generic("No segments were rendered"));
        }

        let paths: Vec<PathBuf> = rendered.iter().map(|s| s.path.clone()).collect();
        self.concatenator.concatenate(&paths, output, scratch).await?;
        Ok(())
    }

    // ==========================================
    // PIPELINE STEP 4: MEASUREMENT
    // ==========================================

    async fn measure(&self, output: &Path, planned: f64) -> f64 {
        info!("📏 Step 4: Measuring output...");

        let actual = self.prober.duration(output).await;
        info!("   Planned {:.2}s, actual {:.2}s", planned, actual);
        if (actual - planned).abs() > GAP_DURATION {
            warn!("   Output differs from plan by {:.2}s", actual - planned);
        }
        actual
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let root = match &self.config.output.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                root.clone()
            }
            None => std::env::temp_dir(),
        };

        let prefix = format!("{}_segments_", self.video_type);
        Ok(tempfile::Builder::new().prefix(&prefix).tempdir_in(root)?)
    }

    fn output_path(&self) -> PathBuf {
        self.config.output.directory.join(output_file_name(self.video_type, Local::now()))
    }
}

/// `<type>_compilation_<YYYYMMDD_HHMMSS>.mp4`
pub fn output_file_name<Tz: chrono::TimeZone>(video_type: VideoType, at: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_compilation_{}.{}",
        video_type,
        at.format("%Y%m%d_%H%M%S"),
        STANDARD.extension
    )
}

/// Delete every segment file and the scratch directory; failures are only logged
fn cleanup(rendered: &[RenderedSegment], scratch: TempDir) {
    for segment in rendered {
        if let Err(e) = std::fs::remove_file(&segment.path) {
            debug!("Could not remove {}: {}", segment.path.display(), e);
        }
    }

    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!("Could not remove scratch directory {}: {}", path.display(), e);
    }
}
