//! Report compilation
//!
//! The compilation itself is delegated to an external engine behind the
//! `ReportCompiler` trait. `CompileInvoker` adds what happens around a
//! single call: the optional throttle delay, output directory creation,
//! and folding the outcome into a `CompileResult`. There are no retries.

use crate::config::CompilerCommand;
use crate::error::{Error, Result};
use crate::progress::CancelToken;
use crate::staging::StagedDocument;
use rand::Rng;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Granularity of the throttle delay's cancellation checks
const THROTTLE_SLICE: Duration = Duration::from_millis(50);

/// External report compiler
pub trait ReportCompiler: Send + Sync {
    /// Compile the design at `source` into a report at `output`
    fn compile(&self, source: &Path, output: &Path) -> Result<()>;
}

impl<F> ReportCompiler for F
where
    F: Fn(&Path, &Path) -> Result<()> + Send + Sync,
{
    fn compile(&self, source: &Path, output: &Path) -> Result<()> {
        self(source, output)
    }
}

/// Runs a compiler program once per design
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    command: CompilerCommand,
}

impl CommandCompiler {
    pub fn new(command: CompilerCommand) -> Self {
        Self { command }
    }

    pub fn program(&self) -> &str {
        &self.command.program
    }

    /// Check whether the program can be started at all
    pub fn is_available(&self) -> bool {
        match Command::new(&self.command.program).arg("--version").output() {
            Ok(_) => true,
            Err(e) => e.kind() != ErrorKind::NotFound,
        }
    }

    /// Arguments with `{input}`, `{output}` and `{output_dir}` substituted
    pub fn expand_args(&self, source: &Path, output: &Path) -> Vec<String> {
        let input = source.display().to_string();
        let output_file = output.display().to_string();
        let output_dir = output
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        self.command
            .args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output_dir}", &output_dir)
                    .replace("{output}", &output_file)
            })
            .collect()
    }
}

impl ReportCompiler for CommandCompiler {
    fn compile(&self, source: &Path, output: &Path) -> Result<()> {
        let args = self.expand_args(source, output);
        debug!(program = %self.command.program, ?args, "Running report compiler");

        let result = Command::new(&self.command.program).args(&args).output();
        let output_data = match result {
            Ok(output_data) => output_data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::CompilerNotFound {
                    program: self.command.program.clone(),
                });
            }
            Err(e) => {
                return Err(Error::Compile {
                    path: source.to_path_buf(),
                    message: format!("Failed to execute {}: {}", self.command.program, e),
                });
            }
        };

        if output_data.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output_data.stderr);
        let stdout = String::from_utf8_lossy(&output_data.stdout);
        let message = if !stderr.trim().is_empty() {
            stderr.trim().to_string()
        } else if !stdout.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            format!("{} exited with {}", self.command.program, output_data.status)
        };

        Err(Error::Compile {
            path: source.to_path_buf(),
            message,
        })
    }
}

/// Outcome of one compile attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CompileResult {
    Success { source: PathBuf, output: PathBuf },
    Failure { source: PathBuf, message: String },
}

impl CompileResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CompileResult::Success { .. })
    }

    /// The original design this result belongs to
    pub fn source(&self) -> &Path {
        match self {
            CompileResult::Success { source, .. } | CompileResult::Failure { source, .. } => source,
        }
    }
}

/// Random delay before each compile
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    max: Duration,
}

impl Throttle {
    pub fn new(max: Duration) -> Self {
        Self { max }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.max.is_zero()
    }

    /// Sleep a random duration below the maximum
    ///
    /// Returns `false` when the delay was cut short by cancellation.
    pub fn pause(&self, cancel: &CancelToken) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let max_ms = self.max.as_millis() as u64;
        if max_ms == 0 {
            return true;
        }
        let delay = Duration::from_millis(rand::rng().random_range(0..max_ms));
        let deadline = Instant::now() + delay;

        loop {
            if cancel.is_cancelled() {
                warn!("Throttle delay interrupted");
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(THROTTLE_SLICE.min(deadline - now));
        }
    }
}

/// One compile attempt per staged design
#[derive(Clone)]
pub struct CompileInvoker {
    compiler: Arc<dyn ReportCompiler>,
    throttle: Throttle,
}

impl CompileInvoker {
    pub fn new(compiler: Arc<dyn ReportCompiler>, throttle: Throttle) -> Self {
        Self { compiler, throttle }
    }

    /// Compile `doc.staged` into `output`
    ///
    /// An interrupted throttle delay is only a warning; the compile still
    /// happens.
    pub fn invoke(&self, doc: &StagedDocument, output: &Path, cancel: &CancelToken) -> CompileResult {
        self.throttle.pause(cancel);

        if let Some(parent) = output.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            return CompileResult::Failure {
                source: doc.source.clone(),
                message: format!("Failed to create output directory {}: {}", parent.display(), e),
            };
        }

        match self.compiler.compile(&doc.staged, output) {
            Ok(()) => CompileResult::Success {
                source: doc.source.clone(),
                output: output.to_path_buf(),
            },
            Err(e) => CompileResult::Failure {
                source: doc.source.clone(),
                message: failure_message(e),
            },
        }
    }
}

/// Engine message without the path prefix added by `Error::Compile`
fn failure_message(error: Error) -> String {
    match error {
        Error::Compile { message, .. } => message,
        other => other.to_string(),
    }
}
