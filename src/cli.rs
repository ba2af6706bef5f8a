//! CLI argument parsing with clap

use crate::config::{CompilerCommand, RunConfig};
use clap::Parser;
use std::path::PathBuf;

/// Jasper Batch - batch compiler for JasperReports designs
///
/// Rewrites one attribute (by default `fontName`) in every .jrxml design
/// of a directory, compiles the rewritten copies and keeps success, error
/// and fail-list logs of the run.
#[derive(Parser, Debug, Default)]
#[command(name = "jasper-batch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Directory (or single design file) to compile
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory for compiled reports (default: next to each design)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include designs in all sub-directories
    #[arg(short, long)]
    pub recursive: bool,

    /// Compile in parallel without the delay between files
    #[arg(short = 'H', long)]
    pub high_performance: bool,

    /// Overwrite the original designs with the rewritten content
    #[arg(long)]
    pub replace_originals: bool,

    /// Attribute to rewrite
    #[arg(long)]
    pub attribute: Option<String>,

    /// New value for the rewritten attribute
    #[arg(short = 'f', long = "font")]
    pub replacement: Option<String>,

    /// Extension of the design files (without dot)
    #[arg(long)]
    pub extension: Option<String>,

    /// Number of threads in high-performance mode (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Maximum random delay before each compile, in milliseconds
    #[arg(long)]
    pub throttle_ms: Option<u64>,

    /// Directory for the run logs (success, errors, fail list)
    #[arg(long, env = "JASPER_BATCH_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Report compiler program, e.g. a path to jasperstarter
    #[arg(long, env = "JASPER_BATCH_COMPILER")]
    pub compiler: Option<String>,

    /// Show a terminal progress view
    #[arg(long)]
    pub tui: bool,

    /// Write a JSON summary of the run to this file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Write a sample configuration file and exit
    #[arg(long, value_name = "PATH")]
    pub init_config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: RunConfig) -> RunConfig {
        if let Some(ref input) = self.input {
            config.source_dir = input.clone();
        }
        if let Some(ref output) = self.output {
            config.output_dir = Some(output.clone());
        }
        if self.recursive {
            config.recursive = true;
        }
        if self.high_performance {
            config.high_performance = true;
        }
        if self.replace_originals {
            config.replace_originals = true;
        }
        if let Some(ref attribute) = self.attribute {
            config.attribute = attribute.clone();
        }
        if let Some(ref replacement) = self.replacement {
            config.replacement = replacement.clone();
        }
        if let Some(ref extension) = self.extension {
            config.source_extension = extension.trim_start_matches('.').to_string();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(throttle_ms) = self.throttle_ms {
            config.throttle_max_ms = throttle_ms;
        }
        if let Some(ref log_dir) = self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }
        if let Some(ref program) = self.compiler {
            config.compiler = CompilerCommand {
                program: program.clone(),
                ..config.compiler
            };
        }

        config
    }

    /// Convert CLI arguments to a config (when no config file is used)
    pub fn to_config(&self) -> RunConfig {
        self.merge_with_config(RunConfig::default())
    }
}
