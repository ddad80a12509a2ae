//! Join rendered segments into the final artifact.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{MediaError, MediaResult};
use crate::media::command::{FfmpegCommand, ToolRunner};
use crate::media::encoding::STANDARD;

const MANIFEST_NAME: &str = "concat_list.txt";

#[derive(Debug, Clone)]
pub struct Concatenator {
    ffmpeg: ToolRunner,
}

impl Concatenator {
    pub fn new(ffmpeg: ToolRunner) -> Self {
        Self { ffmpeg }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ToolRunner::new(&config.tools.ffmpeg, config.timeouts.concat()))
    }

    /// Concatenate `segments` in order into `output`, re-encoding to the
    /// standard profile. The list file lives in `scratch` and is always removed.
    pub async fn concatenate(&self, segments: &[PathBuf], output: &Path, scratch: &Path) -> MediaResult<()> {
        if segments.is_empty() {
            return Err(MediaError::NoSegments);
        }

        let manifest = scratch.join(MANIFEST_NAME);
        write_manifest(&manifest, segments)?;
        debug!("Concat list {} with {} entries", manifest.display(), segments.len());

        let cmd = STANDARD.apply(
            FfmpegCommand::new(output)
                .input_with(["-f", "concat", "-safe", "0"], manifest.as_os_str()),
        );
        let result = self.ffmpeg.run_ffmpeg(&cmd).await;

        if let Err(e) = std::fs::remove_file(&manifest) {
            debug!("Could not remove {}: {}", manifest.display(), e);
        }

        result?;
        if !output.exists() {
            return Err(MediaError::OutputTooSmall { path: output.to_path_buf(), bytes: 0 });
        }

        info!("Concatenated {} segments into {}", segments.len(), output.display());
        Ok(())
    }
}

/// One `file '<absolute path>'` line per segment
fn write_manifest(manifest: &Path, segments: &[PathBuf]) -> MediaResult<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(manifest)?);
    for segment in segments {
        let absolute = if segment.is_absolute() {
            segment.clone()
        } else {
            std::env::current_dir()?.join(segment)
        };
        writeln!(file, "file '{}'", quote_entry(&absolute.to_string_lossy()))?;
    }
    file.flush()?;
    Ok(())
}

/// Escape single quotes for the concat demuxer's quoting rules
fn quote_entry(path: &str) -> String {
    path.replace('\'', r"'\''")
}
