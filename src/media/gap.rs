//! Short silent breaks between clips.

use std::path::Path;

use tracing::{debug, warn};

use crate::clip::Canvas;
use crate::config::Config;
use crate::error::MediaResult;
use crate::media::command::FfmpegCommand;
use crate::media::encoding::STANDARD;
use crate::media::segment::{verify_output, AudioTrack, SegmentRenderer};

/// What filled a rendered gap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapFill {
    Background,
    Black,
}

#[derive(Debug, Clone)]
pub struct GapRenderer {
    segments: SegmentRenderer,
}

impl GapRenderer {
    pub fn new(segments: SegmentRenderer) -> Self {
        Self { segments }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(SegmentRenderer::from_config(config).with_encode_timeout(config.timeouts.gap()))
    }

    /// Render `duration` seconds of silence over `background`, or black
    pub async fn render(
        &self,
        duration: f64,
        canvas: Canvas,
        output: &Path,
        background: Option<&Path>,
    ) -> MediaResult<GapFill> {
        if let Some(background) = background.filter(|p| p.exists()) {
            let attempt = self
                .segments
                .render_visual(background, AudioTrack::Silence, duration, output, canvas)
                .await
                .and_then(|_| verify_output(output, 0));

            match attempt {
                Ok(_) => {
                    debug!("Gap {} over {}", output.display(), background.display());
                    return Ok(GapFill::Background);
                }
                Err(e) => warn!(
                    "Gap background {} failed ({}), using black",
                    background.display(),
                    e
                ),
            }
        }

        self.render_black(duration, canvas, output).await?;
        Ok(GapFill::Black)
    }

    async fn render_black(&self, duration: f64, canvas: Canvas, output: &Path) -> MediaResult<()> {
        let cmd = STANDARD
            .apply(
                FfmpegCommand::new(output)
                    .lavfi(STANDARD.black_source(canvas, duration))
                    .lavfi(STANDARD.silence_source())
                    .output_args(["-map", "0:v:0", "-map", "1:a:0"])
                    .duration(duration),
            )
            .shortest();

        self.segments.ffmpeg().run_ffmpeg(&cmd).await?;
        verify_output(output, 0)?;
        debug!("Black gap {}", output.display());
        Ok(())
    }
}
