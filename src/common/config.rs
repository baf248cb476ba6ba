//! Configuration file handling
//!
//! Settings are read from `config.toml` in the platform config directory
//! and overridden field by field from the command line.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Remote target settings
    #[serde(default)]
    pub target: TargetConfig,

    /// Project settings for breakpoint path resolution
    #[serde(default)]
    pub project: ProjectConfig,

    /// Diagnostic log settings
    #[serde(default)]
    pub log: LogConfig,

    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Remote target settings
#[derive(Debug, Deserialize)]
pub struct TargetConfig {
    /// Address of the script runtime's debug agent, `host:port`
    #[serde(default)]
    pub address: Option<String>,

    /// Script context to attach the debugger to
    #[serde(default = "default_script_context")]
    pub script_context: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            address: None,
            script_context: default_script_context(),
        }
    }
}

fn default_script_context() -> String {
    "Default".to_string()
}

/// Project settings
#[derive(Debug, Deserialize, Default)]
pub struct ProjectConfig {
    /// Project root that breakpoint source paths are made relative to
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Diagnostic log settings
#[derive(Debug, Deserialize, Default)]
pub struct LogConfig {
    /// Mirror the raw DAP wire traffic to this file
    #[serde(default)]
    pub wire_log: Option<PathBuf>,
}

/// Scheduler settings
#[derive(Debug, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between remote-message polls, in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

fn default_tick_ms() -> u64 {
    50
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if the file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.target.address.is_none());
        assert_eq!(config.target.script_context, "Default");
        assert_eq!(config.scheduler.tick_ms, 50);
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [target]
            address = "127.0.0.1:6777"

            [project]
            root = "/work/game"
            "#,
        )
        .unwrap();

        assert_eq!(config.target.address.as_deref(), Some("127.0.0.1:6777"));
        assert_eq!(config.project.root, Some(PathBuf::from("/work/game")));
        assert_eq!(config.target.script_context, "Default");
        assert!(config.log.wire_log.is_none());
    }
}
