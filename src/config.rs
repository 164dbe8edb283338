use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::workspace::validate_project_name;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub toolchain: ToolchainConfig,
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory that holds one subdirectory per job
    pub scratch_root: PathBuf,
    /// Grace period before a finished job's workspace is deleted
    pub cleanup_delay_secs: u64,
    /// Maximum size of a single staged file in bytes
    pub max_file_size: u64,
    /// Maximum number of files per build request
    pub max_files: usize,
}

/// Wall-clock limits for external tool invocations, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Single-step compiles: javac, gcc/g++
    pub compile_timeout_secs: u64,
    /// Archiving steps such as `jar`
    pub archive_timeout_secs: u64,
    /// `go build`
    pub go_timeout_secs: u64,
    /// Multi-stage toolchains: pyinstaller, cargo
    pub multi_stage_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Project name used when a request does not carry one
    pub default_project_name: String,
    /// Concurrent builds when several requests are given at once
    pub parallel_jobs: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            scratch_root: std::env::temp_dir().join("artifact-forge"),
            cleanup_delay_secs: 60,
            max_file_size: 50 * 1024 * 1024, // 50 MB
            max_files: 100,
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compile_timeout_secs: 60,
            archive_timeout_secs: 30,
            go_timeout_secs: 120,
            multi_stage_timeout_secs: 180,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            default_project_name: "compiled-project".to_string(),
            parallel_jobs: 4,
        }
    }
}

const MAX_TIMEOUT_SECS: u64 = 3600;

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist and parse. Without one, the default
    /// location is used when present, otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
            path: path.clone(),
            source,
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ParseError {
                path: path.clone(),
                source,
            })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/artifact-forge/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("artifact-forge").join("config.toml"))
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.workspace.cleanup_delay_secs == 0 {
            return Err(ConfigError::Invalid(
                "workspace.cleanup_delay_secs must be greater than 0".into(),
            ));
        }
        if self.workspace.max_file_size == 0 || self.workspace.max_files == 0 {
            return Err(ConfigError::Invalid(
                "workspace limits must be greater than 0".into(),
            ));
        }
        if self.build.parallel_jobs == 0 {
            return Err(ConfigError::Invalid(
                "build.parallel_jobs must be greater than 0".into(),
            ));
        }
        let t = &self.toolchain;
        for (name, secs) in [
            ("compile_timeout_secs", t.compile_timeout_secs),
            ("archive_timeout_secs", t.archive_timeout_secs),
            ("go_timeout_secs", t.go_timeout_secs),
            ("multi_stage_timeout_secs", t.multi_stage_timeout_secs),
        ] {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(ConfigError::Invalid(format!(
                    "toolchain.{} must be between 1 and {}",
                    name, MAX_TIMEOUT_SECS
                )));
            }
        }
        if let Err(reason) = validate_project_name(&self.build.default_project_name) {
            return Err(ConfigError::Invalid(format!(
                "build.default_project_name: {}",
                reason
            )));
        }
        Ok(())
    }
}

impl WorkspaceConfig {
    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.cleanup_delay_secs)
    }
}

impl ToolchainConfig {
    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn archive_timeout(&self) -> Duration {
        Duration::from_secs(self.archive_timeout_secs)
    }

    pub fn go_timeout(&self) -> Duration {
        Duration::from_secs(self.go_timeout_secs)
    }

    pub fn multi_stage_timeout(&self) -> Duration {
        Duration::from_secs(self.multi_stage_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workspace.cleanup_delay_secs, 60);
        assert_eq!(config.workspace.max_files, 100);
    }

    #[test]
    fn config_serializes_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[workspace]"));
        assert!(toml_str.contains("[toolchain]"));
    }

    #[test]
    fn default_timeouts_match_tool_weight() {
        let config = ToolchainConfig::default();
        assert_eq!(config.compile_timeout(), Duration::from_secs(60));
        assert!(config.multi_stage_timeout() > config.compile_timeout());
        assert!(config.multi_stage_timeout_secs <= 180);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.toolchain.go_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("go_timeout_secs"));
    }

    #[test]
    fn bad_default_project_name_is_rejected() {
        let mut config = Config::default();
        config.build.default_project_name = "../escape".into();
        assert!(config.validate().is_err());
    }
}
