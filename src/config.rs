//! Configuration types for the batch compiler

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// External compiler command line
///
/// `{input}` and `{output}` in `args` are substituted with the staged
/// source path and the compiled artifact path for every invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerCommand {
    /// Program to execute (looked up in PATH when not absolute)
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
}

impl Default for CompilerCommand {
    fn default() -> Self {
        Self {
            program: "jasperstarter".into(),
            args: vec![
                "compile".into(),
                "{input}".into(),
                "-o".into(),
                "{output}".into(),
            ],
        }
    }
}

/// Settings for one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory (or single file) holding the report designs
    pub source_dir: PathBuf,

    /// Directory receiving compiled reports (None = next to each source)
    pub output_dir: Option<PathBuf>,

    /// Walk the full subtree instead of the immediate children only
    pub recursive: bool,

    /// Parallelize per-file work and skip the throttle delay
    pub high_performance: bool,

    /// Overwrite the original designs with the patched content
    pub replace_originals: bool,

    /// Attribute whose value is rewritten
    pub attribute: String,

    /// New value for the attribute
    pub replacement: String,

    /// Extension of the report designs (without dot, case-insensitive)
    pub source_extension: String,

    /// Extension of the compiled reports (without dot)
    pub output_extension: String,

    /// Number of worker threads in high-performance mode (0 = auto)
    pub threads: usize,

    /// Upper bound of the random delay before each compile in sequential mode
    pub throttle_max_ms: u64,

    /// Refresh interval of the progress ticker
    pub progress_interval_ms: u64,

    /// Directory for the success / error / fail-list logs (None = disabled)
    pub log_dir: Option<PathBuf>,

    /// External report compiler
    pub compiler: CompilerCommand,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            output_dir: None,
            recursive: false,
            high_performance: false,
            replace_originals: false,
            attribute: "fontName".into(),
            replacement: "mbc".into(),
            source_extension: "jrxml".into(),
            output_extension: "jasper".into(),
            threads: 0, // Auto-detect
            throttle_max_ms: 3000,
            progress_interval_ms: 100,
            log_dir: None,
            compiler: CompilerCommand::default(),
        }
    }
}

impl RunConfig {
    /// Throttle upper bound, zero when high-performance mode is on
    pub fn throttle_max(&self) -> Duration {
        if self.high_performance {
            Duration::ZERO
        } else {
            Duration::from_millis(self.throttle_max_ms)
        }
    }

    /// Progress ticker interval (never zero)
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: RunConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Jasper Batch Configuration File
# This file uses TOML format (https://toml.io)

# Directory containing the .jrxml report designs
source_dir = "C:/Reports/jrxml"

# Directory receiving the compiled .jasper reports
# Leave unset to write each compiled report next to its design
output_dir = "C:/Reports/jasper"

# Walk all sub-directories instead of the top level only
recursive = false

# Compile in parallel and skip the artificial delay between files
high_performance = false

# Overwrite the original designs with the rewritten content
replace_originals = false

# Attribute to rewrite and its new value
attribute = "fontName"
replacement = "mbc"

# File extensions (without dot)
source_extension = "jrxml"
output_extension = "jasper"

# Number of worker threads in high performance mode (0 = auto-detect)
threads = 0

# Maximum random delay before each compile in sequential mode
throttle_max_ms = 3000

# Progress refresh interval
progress_interval_ms = 100

# Directory for the success, error and fail-list logs
log_dir = "C:/ProgramData"

# External report compiler, {input} and {output} are substituted per file
[compiler]
program = "jasperstarter"
args = ["compile", "{input}", "-o", "{output}"]
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError {
        source: toml::ser::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sample_config_parses() {
        let config: RunConfig = toml::from_str(&RunConfig::sample_config()).unwrap();
        assert_eq!(config.attribute, "fontName");
        assert_eq!(config.replacement, "mbc");
        assert_eq!(config.output_dir, Some(PathBuf::from("C:/Reports/jasper")));
        assert_eq!(config.compiler, CompilerCommand::default());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: RunConfig = toml::from_str("source_dir = \"reports\"\nrecursive = true").unwrap();
        assert_eq!(config.source_dir, PathBuf::from("reports"));
        assert!(config.recursive);
        assert_eq!(config.source_extension, "jrxml");
        assert_eq!(config.throttle_max_ms, 3000);
    }

    #[test]
    fn test_throttle_disabled_in_high_performance() {
        let mut config = RunConfig::default();
        assert_eq!(config.throttle_max(), Duration::from_millis(3000));
        config.high_performance = true;
        assert_eq!(config.throttle_max(), Duration::ZERO);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Config").join("run.toml");

        let config = RunConfig {
            source_dir: PathBuf::from("/reports"),
            replacement: "Arial".into(),
            high_performance: true,
            ..RunConfig::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = RunConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.source_dir, PathBuf::from("/reports"));
        assert_eq!(loaded.replacement, "Arial");
        assert!(loaded.high_performance);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let err = RunConfig::load_from_file(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().contains("nope.toml"));
    }
}
