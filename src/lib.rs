//! Jasper Batch - batch compiler for JasperReports designs
//!
//! This library rewrites one attribute across a set of report designs and
//! compiles the rewritten copies, with support for:
//! - Flat or recursive discovery of design files
//! - Attribute rewriting through a staging directory
//! - Optional promotion of rewritten designs over the originals
//! - Sequential throttled compilation, or parallel compilation with Rayon
//! - Success, error and fail-list run logs
//! - Progress notifications and a terminal progress view

pub mod batch;
pub mod cli;
pub mod compile;
pub mod config;
pub mod error;
pub mod logs;
pub mod patch;
pub mod progress;
pub mod scan;
pub mod staging;
pub mod tui;

pub use batch::{BatchOrchestrator, BatchSummary, Phase};
pub use cli::Cli;
pub use compile::{CommandCompiler, CompileResult, ReportCompiler};
pub use config::{CompilerCommand, ConfigError, RunConfig};
pub use error::{Error, Result};
pub use progress::{BatchSnapshot, BatchStats, CancelToken, ProgressEvent, ProgressSink};
pub use tui::{display_summary, run_with_progress};
