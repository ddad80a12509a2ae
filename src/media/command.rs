//! Structured argument-list builders and a bounded subprocess runner.
//!
//! Every external call goes through [`ToolRunner`], so each one gets an
//! argument vector (never a shell string) and a hard timeout.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// One `-i` input and the options that precede it
#[derive(Debug, Clone)]
struct InputSpec {
    options: Vec<OsString>,
    source: OsString,
}

/// Builder for encoder invocations with any number of inputs
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<InputSpec>,
    output_args: Vec<OsString>,
    output: PathBuf,
}

impl FfmpegCommand {
    /// Create a command writing to `output`
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
        }
    }

    /// Add a plain file input
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with(Vec::<OsString>::new(), path.as_ref().as_os_str())
    }

    /// Add an input preceded by its own options (`-loop 1`, `-stream_loop N`, ...)
    pub fn input_with<I, S>(mut self, options: I, source: impl Into<OsString>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.inputs.push(InputSpec {
            options: options.into_iter().map(Into::into).collect(),
            source: source.into(),
        });
        self
    }

    /// Add a libavfilter source (`color=...`, `anullsrc=...`)
    pub fn lavfi(self, graph: impl Into<String>) -> Self {
        let graph: String = graph.into();
        self.input_with(["-f", "lavfi"], graph)
    }

    /// Add an output argument
    pub fn output_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Limit output duration
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Set video filter
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        let filter: String = filter.into();
        self.output_arg("-vf").output_arg(filter)
    }

    /// End when the shortest stream ends
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Whether any input uses `-stream_loop`
    pub fn uses_stream_loop(&self) -> bool {
        self.inputs
            .iter()
            .any(|input| input.options.iter().any(|o| o == "-stream_loop"))
    }

    /// Build the command arguments
    pub fn build_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-hide_banner", "-nostdin", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();

        for input in &self.inputs {
            args.extend(input.options.iter().cloned());
            args.push("-i".into());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.as_os_str().to_owned());
        args
    }
}

/// Runs one external program with a hard time limit
#[derive(Debug, Clone)]
pub struct ToolRunner {
    program: PathBuf,
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Same program, different time limit
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            program: self.program.clone(),
            timeout,
        }
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Run and capture output; a non-zero exit is an error
    pub async fn run<I, S>(&self, args: I) -> MediaResult<Output>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let tool = self.tool_name();
        debug!(
            "Running {} {}",
            self.program.display(),
            args.iter().map(|a| a.to_string_lossy()).collect::<Vec<_>>().join(" ")
        );

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MediaError::ToolNotFound { tool: tool.clone() },
                _ => MediaError::Io(e),
            })?;

        // Dropping the timed-out future drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("{} timed out after {}s, killing process", tool, self.timeout.as_secs());
                return Err(MediaError::Timeout {
                    tool,
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if output.status.success() {
            Ok(output)
        } else {
            Err(MediaError::tool_failed(tool, output.status.code(), &output.stderr))
        }
    }

    /// Run an encoder command
    pub async fn run_ffmpeg(&self, cmd: &FfmpegCommand) -> MediaResult<Output> {
        self.run(cmd.build_args()).await
    }
}

/// Check whether `program -version` runs successfully
pub async fn tool_available(program: &Path) -> bool {
    ToolRunner::new(program, Duration::from_secs(10))
        .run(["-version"])
        .await
        .is_ok()
}
