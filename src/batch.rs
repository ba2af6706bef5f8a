//! Batch orchestration
//!
//! Drives one run through `Initializing -> Patching -> Compiling ->
//! Finalizing`. The traversal strategy (flat or recursive) only decides
//! how the list of pending documents is produced; the compile stage is
//! the same for both. Per-file failures are counted, logged and never
//! abort the batch.

use crate::compile::{CompileInvoker, CompileResult, ReportCompiler, Throttle};
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::logs::RunLogs;
use crate::patch::AttributeRule;
use crate::progress::{
    BatchSnapshot, BatchStats, CancelToken, NullSink, ProgressEvent, ProgressSink, run_ticker,
};
use crate::scan::{TraversalMode, scan_sources, walk_sources};
use crate::staging::{StagedDocument, StagingArea};
use rayon::ThreadPool;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{Level, error, info, span, warn};

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Initializing,
    Patching,
    Compiling,
    Finalizing,
}

/// A discovered design waiting for its compile attempt
#[derive(Debug, Clone)]
pub enum PendingDocument {
    /// Patched copy ready to compile
    Staged(StagedDocument),
    /// Patching failed; counted as a failed unit during compilation
    Failed { source: PathBuf, message: String },
}

impl PendingDocument {
    pub fn source(&self) -> &Path {
        match self {
            PendingDocument::Staged(doc) => &doc.source,
            PendingDocument::Failed { source, .. } => source,
        }
    }

    /// Name written to the run logs
    fn log_name(&self) -> String {
        match self {
            PendingDocument::Staged(doc) => doc.staged_name(),
            PendingDocument::Failed { source, .. } => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

/// Final outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// The run stopped early on request; some files were not attempted
    pub cancelled: bool,
    pub elapsed_ms: u128,
    /// Why the staging directory could not be removed, if it could not
    pub cleanup_error: Option<String>,
    pub results: Vec<CompileResult>,
}

impl BatchSummary {
    pub fn failures(&self) -> impl Iterator<Item = &CompileResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}

/// Runs batches of patch-then-compile over a source directory
pub struct BatchOrchestrator {
    config: RunConfig,
    compiler: Arc<dyn ReportCompiler>,
    sink: Arc<dyn ProgressSink>,
    stats: Arc<BatchStats>,
    cancel: CancelToken,
    phase: Phase,
}

impl BatchOrchestrator {
    pub fn new<C>(config: RunConfig, compiler: C) -> Self
    where
        C: ReportCompiler + 'static,
    {
        Self {
            config,
            compiler: Arc::new(compiler),
            sink: Arc::new(NullSink),
            stats: Arc::new(BatchStats::new()),
            cancel: CancelToken::new(),
            phase: Phase::Idle,
        }
    }

    /// Deliver progress notifications to `sink`
    pub fn with_sink<S>(mut self, sink: S) -> Self
    where
        S: ProgressSink + 'static,
    {
        self.set_sink(sink);
        self
    }

    pub fn set_sink<S>(&mut self, sink: S)
    where
        S: ProgressSink + 'static,
    {
        self.sink = Arc::new(sink);
    }

    /// Replace the settings used by the next run
    pub fn reconfigure(&mut self, config: RunConfig) {
        info!(source = %config.source_dir.display(), "Configuration updated");
        self.config = config;
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Token that stops the current run before its next file
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    /// Shared counters, readable from other threads while a run is going
    pub fn stats_arc(&self) -> Arc<BatchStats> {
        self.stats.clone()
    }

    pub fn total(&self) -> usize {
        self.stats.total()
    }

    pub fn processed(&self) -> usize {
        self.stats.processed()
    }

    pub fn succeeded(&self) -> usize {
        self.stats.succeeded()
    }

    pub fn failed(&self) -> usize {
        self.stats.failed()
    }

    /// Run one complete batch
    ///
    /// Only setup problems are returned as errors (invalid attribute rule,
    /// staging directory not creatable, worker pool not buildable). Every
    /// per-file problem ends up in the summary instead.
    pub fn run(&mut self) -> Result<BatchSummary> {
        let _span = span!(Level::INFO, "batch_run", source = %self.config.source_dir.display())
            .entered();
        let started = Instant::now();

        self.enter(Phase::Initializing);
        self.stats.reset();

        let setup = self.initialize();
        let (rule, logs, staging, pool) = match setup {
            Ok(setup) => setup,
            Err(e) => {
                error!(error = %e, "Batch setup failed");
                self.cancel.reset();
                self.enter(Phase::Idle);
                return Err(e);
            }
        };

        self.enter(Phase::Patching);
        let pending = self.stage_all(&staging, &rule, &logs, pool.as_ref());
        self.stats.set_total(pending.len());
        self.sink.notify(ProgressEvent::Started {
            total: pending.len(),
        });
        info!(count = pending.len(), "Designs staged");

        self.enter(Phase::Compiling);
        let results = self.compile_all(&pending, &staging, &logs, pool.as_ref());

        self.enter(Phase::Finalizing);
        let cleanup_error = if self.config.replace_originals {
            staging.cleanup().err().map(|e| {
                logs.record_error(&format!(
                    "Fail to delete temp change directory {}",
                    staging.dir().display()
                ));
                e.to_string()
            })
        } else {
            None
        };

        let snapshot = self.stats.snapshot();
        let cancelled = self.cancel.is_cancelled() && snapshot.processed < snapshot.total;
        if cancelled {
            warn!(
                processed = snapshot.processed,
                total = snapshot.total,
                "Batch cancelled before all files were attempted"
            );
        }
        // A cancel only ever applies to the run it was raised for
        self.cancel.reset();
        self.sink.notify(ProgressEvent::Complete(snapshot.clone()));
        self.enter(Phase::Idle);
        info!("{}", self.stats.summary());

        Ok(BatchSummary {
            total: snapshot.total,
            succeeded: snapshot.succeeded,
            failed: snapshot.failed,
            cancelled,
            elapsed_ms: started.elapsed().as_millis(),
            cleanup_error,
            results,
        })
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.sink.notify(ProgressEvent::Phase(phase));
    }

    fn initialize(&self) -> Result<(AttributeRule, RunLogs, StagingArea, Option<ThreadPool>)> {
        let rule = AttributeRule::new(&self.config.attribute, &self.config.replacement)?;

        let logs = match &self.config.log_dir {
            Some(dir) => RunLogs::in_dir(dir),
            None => RunLogs::disabled(),
        };
        if let Err(e) = logs.reset() {
            warn!(error = %e, "Failed to create or delete log files");
        }

        let staging = StagingArea::create(&self.config.source_dir)?;

        let pool = if self.config.high_performance {
            let mut builder = rayon::ThreadPoolBuilder::new();
            if self.config.threads > 0 {
                builder = builder.num_threads(self.config.threads);
            }
            Some(builder.build()?)
        } else {
            None
        };

        Ok((rule, logs, staging, pool))
    }

    /// Discover designs and patch each into the staging area
    fn stage_all(
        &self,
        staging: &StagingArea,
        rule: &AttributeRule,
        logs: &RunLogs,
        pool: Option<&ThreadPool>,
    ) -> Vec<PendingDocument> {
        let root = &self.config.source_dir;
        let ext = &self.config.source_extension;
        let mode = TraversalMode::from_recursive(self.config.recursive);

        // Sequential recursive runs stage each design as soon as it is found
        if mode == TraversalMode::Recursive && pool.is_none() {
            let mut pending = Vec::new();
            let errors = walk_sources(root, ext, Some(staging.dir()), |source| {
                pending.push(stage_one(staging, rule, source));
                self.sink.notify(ProgressEvent::Discovered {
                    count: pending.len(),
                });
            });
            for e in &errors {
                logs.record_error(&e.to_string());
            }
            return pending;
        }

        let report = scan_sources(root, mode, ext, Some(staging.dir()));
        for e in &report.errors {
            logs.record_error(&e.to_string());
        }
        self.sink.notify(ProgressEvent::Discovered {
            count: report.files.len(),
        });

        match pool {
            Some(pool) => pool.install(|| {
                report
                    .files
                    .par_iter()
                    .map(|source| stage_one(staging, rule, source))
                    .collect()
            }),
            None => report
                .files
                .iter()
                .map(|source| stage_one(staging, rule, source))
                .collect(),
        }
    }

    /// Compile every pending document, notifying after each one
    fn compile_all(
        &self,
        pending: &[PendingDocument],
        staging: &StagingArea,
        logs: &RunLogs,
        pool: Option<&ThreadPool>,
    ) -> Vec<CompileResult> {
        let throttle = Throttle::new(self.config.throttle_max());
        let invoker = CompileInvoker::new(self.compiler.clone(), throttle);
        let stop = AtomicBool::new(false);
        let interval = self.config.progress_interval();

        std::thread::scope(|scope| {
            scope.spawn(|| run_ticker(&self.stats, self.sink.as_ref(), interval, &stop));

            let results: Vec<CompileResult> = match pool {
                Some(pool) => pool.install(|| {
                    pending
                        .par_iter()
                        .filter_map(|doc| self.compile_one(doc, staging, logs, &invoker))
                        .collect()
                }),
                None => pending
                    .iter()
                    .map_while(|doc| self.compile_one(doc, staging, logs, &invoker))
                    .collect(),
            };

            stop.store(true, Ordering::Relaxed);
            results
        })
    }

    /// One unit of compile work; `None` when the run was cancelled first
    fn compile_one(
        &self,
        doc: &PendingDocument,
        staging: &StagingArea,
        logs: &RunLogs,
        invoker: &CompileInvoker,
    ) -> Option<CompileResult> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let snapshot = self.stats.set_current_file(doc.source());
        self.sink.notify(ProgressEvent::FileStarted {
            path: doc.source().to_path_buf(),
            snapshot,
        });

        let result = match doc {
            PendingDocument::Staged(staged) => {
                let output = self.output_path_for(&staged.source, staging);
                let result = invoker.invoke(staged, &output, &self.cancel);
                if let Err(e) = staging.finish_document(staged, self.config.replace_originals) {
                    warn!(source = %staged.source.display(), error = %e, "Failed to settle staged copy");
                    logs.record_error(&e.to_string());
                }
                result
            }
            PendingDocument::Failed { source, message } => CompileResult::Failure {
                source: source.clone(),
                message: message.clone(),
            },
        };

        let name = doc.log_name();
        match &result {
            CompileResult::Success { .. } => logs.record_success(&name),
            CompileResult::Failure { message, .. } => logs.record_failure(&name, message),
        }

        self.stats.record(result.is_success(), |snapshot: &BatchSnapshot| {
            self.sink.notify(ProgressEvent::FileFinished {
                result: result.clone(),
                snapshot: snapshot.clone(),
            });
        });

        Some(result)
    }

    /// Where the compiled report for `source` goes
    ///
    /// With an output directory the design's sub-directory is mirrored
    /// below it; without one the report lands next to the design.
    pub fn output_path_for(&self, source: &Path, staging: &StagingArea) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{}.{}", stem, self.config.output_extension);

        match &self.config.output_dir {
            Some(output_dir) => output_dir.join(staging.relative_dir(source)).join(name),
            None => source.with_file_name(name),
        }
    }
}

/// Patch one design into the staging area
fn stage_one(staging: &StagingArea, rule: &AttributeRule, source: &Path) -> PendingDocument {
    let staged = staging.prepare(source).and_then(|doc| {
        rule.patch_file(&doc.source, &doc.staged)?;
        Ok(doc)
    });

    match staged {
        Ok(doc) => PendingDocument::Staged(doc),
        Err(e) => {
            warn!(source = %source.display(), error = %e, "Failed to patch design");
            PendingDocument::Failed {
                source: source.to_path_buf(),
                message: patch_failure_message(e),
            }
        }
    }
}

fn patch_failure_message(error: Error) -> String {
    match error {
        Error::Patch { path, source } => format!("{}: {}", path.display(), source),
        other => other.to_string(),
    }
}
