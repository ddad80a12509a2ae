//! Scripted stand-ins for ffmpeg and ffprobe.
//!
//! The fake encoder logs its argument list and writes a zero-filled file to
//! its last argument; the fake prober echoes a configurable duration. Both
//! can be told to fail, so fallback paths run without real media.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use crate::config::Config;

const FAKE_FFMPEG: &str = r#"#!/bin/sh
DIR="__DIR__"
echo "$*" >> "$DIR/ffmpeg.log"
if [ "$1" = "-version" ]; then
  echo "ffmpeg version fake"
  exit 0
fi
if [ -f "$DIR/ffmpeg_fail" ]; then
  while IFS= read -r pattern; do
    case "$*" in
      *"$pattern"*) echo "simulated failure on $pattern" >&2; exit 1 ;;
    esac
  done < "$DIR/ffmpeg_fail"
fi
bytes=4096
if [ -f "$DIR/output_bytes" ]; then
  bytes=$(cat "$DIR/output_bytes")
fi
for last; do :; done
head -c "$bytes" /dev/zero > "$last"
"#;

const FAKE_FFPROBE: &str = r#"#!/bin/sh
DIR="__DIR__"
case "$*" in
  *stream=codec_type*) printf 'video\naudio\n'; exit 0 ;;
esac
if [ -f "$DIR/probe_fail" ]; then
  echo "simulated probe failure" >&2
  exit 1
fi
if [ -f "$DIR/probe_duration" ]; then
  cat "$DIR/probe_duration"
else
  echo "3.5"
fi
"#;

pub struct FakeTools {
    dir: TempDir,
}

impl FakeTools {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();
        install_script(&dir.path().join("ffmpeg"), &FAKE_FFMPEG.replace("__DIR__", &root));
        install_script(&dir.path().join("ffprobe"), &FAKE_FFPROBE.replace("__DIR__", &root));
        std::fs::create_dir_all(dir.path().join("scratch")).unwrap();
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Configuration wired to the fake tools, with output under `dir/out`
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.tools.ffmpeg = self.dir().join("ffmpeg");
        config.tools.ffprobe = self.dir().join("ffprobe");
        config.output.directory = self.dir().join("out");
        config.output.scratch_root = Some(self.dir().join("scratch"));
        config.timeouts.probe_secs = 10;
        config.timeouts.render_secs = 10;
        config.timeouts.gap_secs = 10;
        config.timeouts.concat_secs = 10;
        config
    }

    pub fn set_probe_duration(&self, seconds: f64) {
        std::fs::write(self.dir().join("probe_duration"), format!("{seconds}\n")).unwrap();
    }

    pub fn fail_probes(&self) {
        std::fs::write(self.dir().join("probe_fail"), "").unwrap();
    }

    /// Size of every file the fake encoder writes
    pub fn set_output_bytes(&self, bytes: u64) {
        std::fs::write(self.dir().join("output_bytes"), bytes.to_string()).unwrap();
    }

    /// Make every encoder call whose arguments contain `pattern` fail
    pub fn fail_when(&self, pattern: &str) {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir().join("ffmpeg_fail"))
            .unwrap();
        writeln!(file, "{pattern}").unwrap();
    }

    /// Encoder invocations so far, excluding `-version` checks
    pub fn ffmpeg_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir().join("ffmpeg.log"))
            .unwrap_or_default()
            .lines()
            .filter(|line| *line != "-version")
            .map(str::to_string)
            .collect()
    }
}

/// Write an executable script from a child process, so no test thread ever
/// holds a writable descriptor to it (exec would fail with ETXTBSY)
fn install_script(path: &Path, content: &str) {
    let status = Command::new("sh")
        .arg("-c")
        .arg(r#"printf '%s' "$1" > "$2" && chmod 755 "$2""#)
        .arg("sh")
        .arg(content)
        .arg(path)
        .status()
        .unwrap();
    assert!(status.success(), "could not install {}", path.display());
}

/// Solid-colour PNG of the given size
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb([180, 60, 200])).save(&path).unwrap();
    path
}
