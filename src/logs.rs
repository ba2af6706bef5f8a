//! Run logs: success list, error messages and fail list
//!
//! Three append-only text files, recreated at the start of every run.
//! Writes are serialized so parallel workers never interleave lines.
//! Failing to write a log line is reported but never fails the run.

use crate::error::Result;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

pub const SUCCESS_LOG_NAME: &str = "JasperReportCompileLogs.txt";
pub const ERROR_LOG_NAME: &str = "JasperReportCompileErrors.txt";
pub const FAIL_LIST_LOG_NAME: &str = "JasperReportCompileFailList.txt";

#[derive(Debug, Clone)]
struct LogPaths {
    success: PathBuf,
    error: PathBuf,
    fail_list: PathBuf,
}

#[derive(Debug)]
pub struct RunLogs {
    paths: Option<LogPaths>,
    write_lock: Mutex<()>,
}

impl RunLogs {
    /// Logs that are never written
    pub fn disabled() -> Self {
        Self {
            paths: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Logs stored in `dir` under their standard names
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            paths: Some(LogPaths {
                success: dir.join(SUCCESS_LOG_NAME),
                error: dir.join(ERROR_LOG_NAME),
                fail_list: dir.join(FAIL_LIST_LOG_NAME),
            }),
            write_lock: Mutex::new(()),
        }
    }

    /// Truncate (or create) all three files
    pub fn reset(&self) -> Result<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = paths.success.parent() {
            fs::create_dir_all(parent)?;
        }
        for path in [&paths.success, &paths.error, &paths.fail_list] {
            File::create(path)?;
        }
        Ok(())
    }

    /// A staged design compiled successfully
    pub fn record_success(&self, name: &str) {
        if let Some(paths) = &self.paths {
            self.append(&[(&paths.success, name)]);
        }
    }

    /// A design failed: message to the error log, name to the fail list
    ///
    /// Multi-line messages are folded onto one line, one entry per line.
    pub fn record_failure(&self, name: &str, message: &str) {
        if let Some(paths) = &self.paths {
            let message = message
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" | ");
            let error_line = format!("{} - {}", name, message);
            self.append(&[(&paths.error, error_line.as_str()), (&paths.fail_list, name)]);
        }
    }

    /// A non-file error such as a failed cleanup
    pub fn record_error(&self, message: &str) {
        if let Some(paths) = &self.paths {
            self.append(&[(&paths.error, message)]);
        }
    }

    fn append(&self, lines: &[(&PathBuf, &str)]) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        for (path, line) in lines {
            let result = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| writeln!(file, "{}", line));
            if let Err(e) = result {
                warn!(path = %path.display(), error = %e, "Failed to write run log");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reset_truncates() {
        let dir = tempdir().unwrap();
        let logs = RunLogs::in_dir(dir.path());
        fs::write(dir.path().join(SUCCESS_LOG_NAME), "stale\n").unwrap();

        logs.reset().unwrap();
        for name in [SUCCESS_LOG_NAME, ERROR_LOG_NAME, FAIL_LIST_LOG_NAME] {
            assert_eq!(fs::read_to_string(dir.path().join(name)).unwrap(), "");
        }
    }

    #[test]
    fn test_record_lines() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("Log");
        let logs = RunLogs::in_dir(&log_dir);
        logs.reset().unwrap();

        logs.record_success("a_temp_changed.jrxml");
        logs.record_failure("b_temp_changed.jrxml", "bad expression");
        logs.record_error("Fail to delete temp change directory");

        assert_eq!(
            fs::read_to_string(log_dir.join(SUCCESS_LOG_NAME)).unwrap(),
            "a_temp_changed.jrxml\n"
        );
        assert_eq!(
            fs::read_to_string(log_dir.join(ERROR_LOG_NAME)).unwrap(),
            "b_temp_changed.jrxml - bad expression\nFail to delete temp change directory\n"
        );
        assert_eq!(
            fs::read_to_string(log_dir.join(FAIL_LIST_LOG_NAME)).unwrap(),
            "b_temp_changed.jrxml\n"
        );
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let logs = RunLogs::disabled();
        logs.reset().unwrap();
        logs.record_success("a");
        logs.record_failure("a", "b");
        logs.record_error("c");
    }

    #[test]
    fn test_multi_line_failure_is_one_entry() {
        let dir = tempdir().unwrap();
        let logs = RunLogs::in_dir(dir.path());
        logs.reset().unwrap();

        logs.record_failure(
            "b_temp_changed.jrxml",
            "Errors were encountered when compiling report expressions class file:\r\n1. $F{amount} cannot be resolved\n\n2. Syntax error\n",
        );
        logs.record_failure("c_temp_changed.jrxml", "bad expression");

        assert_eq!(
            fs::read_to_string(dir.path().join(ERROR_LOG_NAME)).unwrap(),
            "b_temp_changed.jrxml - Errors were encountered when compiling report expressions class file: | 1. $F{amount} cannot be resolved | 2. Syntax error\n\
             c_temp_changed.jrxml - bad expression\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join(FAIL_LIST_LOG_NAME)).unwrap(),
            "b_temp_changed.jrxml\nc_temp_changed.jrxml\n"
        );
    }
}
