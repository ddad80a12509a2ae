use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for the compilation engine
///
/// The codec profile and the per-clip timing constants are deliberately absent:
/// they live in [`crate::media::encoding`] and [`crate::clip::types`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External tool locations
    pub tools: ToolsConfig,

    /// Subprocess time limits
    pub timeouts: TimeoutConfig,

    /// Where artifacts and scratch files go
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.tools.validate()?;
        self.timeouts.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

/// External tool locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Encoder program name or path
    pub ffmpeg: PathBuf,

    /// Probe program name or path
    pub ffprobe: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl ToolsConfig {
    fn validate(&self) -> Result<()> {
        for (key, value) in [("tools.ffmpeg", &self.ffmpeg), ("tools.ffprobe", &self.ffprobe)] {
            if value.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: String::new(),
                }.into());
            }
        }
        Ok(())
    }
}

/// Subprocess time limits, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Duration and stream queries
    pub probe_secs: u64,

    /// One content segment encode
    pub render_secs: u64,

    /// One gap segment encode
    pub gap_secs: u64,

    /// Final concatenation
    pub concat_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_secs: 30,
            render_secs: 120,
            gap_secs: 30,
            concat_secs: 300,
        }
    }
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn render(&self) -> Duration {
        Duration::from_secs(self.render_secs)
    }

    pub fn gap(&self) -> Duration {
        Duration::from_secs(self.gap_secs)
    }

    pub fn concat(&self) -> Duration {
        Duration::from_secs(self.concat_secs)
    }

    fn validate(&self) -> Result<()> {
        let entries = [
            ("timeouts.probe_secs", self.probe_secs),
            ("timeouts.render_secs", self.render_secs),
            ("timeouts.gap_secs", self.gap_secs),
            ("timeouts.concat_secs", self.concat_secs),
        ];

        for (key, value) in entries {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string()
                }.into());
            }
        }

        Ok(())
    }
}

/// Output and scratch locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives finished compilations
    pub directory: PathBuf,

    /// Parent of the per-run scratch directories (system temp dir when unset)
    pub scratch_root: Option<PathBuf>,

    /// Smallest segment file accepted as a successful encode
    pub min_segment_bytes: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("static/videos"),
            scratch_root: None,
            min_segment_bytes: 1000,
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "output.directory".to_string(),
                value: String::new(),
            }.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original_config = Config::default();
        original_config.timeouts.concat_secs = 600;
        original_config.output.scratch_root = Some(dir.path().to_path_buf());

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(loaded_config.timeouts.concat_secs, 600);
        assert_eq!(loaded_config.output.scratch_root.as_deref(), Some(dir.path()));
        assert_eq!(loaded_config.tools.ffmpeg, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[tools]\nffmpeg = \"/opt/ffmpeg/bin/ffmpeg\"\n").unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.tools.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.tools.ffprobe, PathBuf::from("ffprobe"));
        assert_eq!(config.timeouts.render_secs, 120);
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let mut config = Config::default();
        config.timeouts.probe_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/definitely/not/here.toml");
        assert!(matches!(
            result,
            Err(crate::error::CompilerError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
