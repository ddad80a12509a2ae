use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the compilation engine
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("Media processing error: {0}")]
    Media(#[from] MediaError),

    #[error("Clip selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Clip manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors raised while probing, normalizing, rendering or concatenating media
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("{tool} not found; is it installed and on PATH?")]
    ToolNotFound { tool: String },

    #[error("{tool} exited with status {exit_code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("Could not parse {tool} output: {output:?}")]
    UnparseableOutput { tool: String, output: String },

    #[error("Failed to load image {path}: {reason}")]
    ImageLoad { path: PathBuf, reason: String },

    #[error("Failed to save image {path}: {reason}")]
    ImageSave { path: PathBuf, reason: String },

    #[error("Output {path} is missing or too small ({bytes} bytes)")]
    OutputTooSmall { path: PathBuf, bytes: u64 },

    #[error("Source file not found: {path}")]
    MissingSource { path: PathBuf },

    #[error("No segments to concatenate")]
    NoSegments,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Selector rejections
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Insufficient content: planned {planned:.1}s of the required {target:.1}s")]
    InsufficientDuration { planned: f64, target: f64 },

    #[error("No clips fit within the {max:.1}s limit")]
    NothingSelected { max: f64 },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Clip manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Clip manifest not found: {path}")]
    NotFound { path: String },

    #[error("Failed to parse clip manifest {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Failed to write clip manifest: {reason}")]
    WriteFailed { reason: String },

    #[error("Unknown clip id: {id}")]
    UnknownClip { id: u64 },

    #[error("Clip {id} has an invalid duration: {value}")]
    InvalidDuration { id: u64, value: f64 },
}

/// Convenience type alias for Results using CompilerError
pub type Result<T> = std::result::Result<T, CompilerError>;

/// Result type for media operations
pub type MediaResult<T> = std::result::Result<T, MediaError>;

impl CompilerError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // IO errors might be temporary
            Self::Io(_) => true,
            Self::Media(MediaError::Timeout { .. }) => true,
            Self::Media(MediaError::Io(_)) => true,
            // A larger clip pool later may satisfy the profile
            Self::Selection(_) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Selection(SelectionError::InsufficientDuration { planned, target }) => {
                format!(
                    "Not enough content yet: {:.1}s available of the {:.1}s needed. Add more clips and try again.",
                    planned, target
                )
            }
            Self::Selection(SelectionError::NothingSelected { .. }) => {
                "No clips available for this video type.".to_string()
            }
            Self::Media(MediaError::ToolNotFound { tool }) => {
                format!("'{}' is not installed or not on PATH.", tool)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            Self::Manifest(ManifestError::NotFound { path }) => {
                format!("Clip manifest '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

impl MediaError {
    /// Build a tool failure, keeping only the tail of stderr
    pub fn tool_failed(tool: impl Into<String>, exit_code: Option<i32>, stderr: &[u8]) -> Self {
        let stderr = String::from_utf8_lossy(stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(5)..].join("\n");
        Self::ToolFailed {
            tool: tool.into(),
            exit_code,
            stderr: tail,
        }
    }
}
