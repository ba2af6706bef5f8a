//! Report design discovery
//!
//! Lists the files under a source root whose extension matches the target
//! format. Unreadable directories never abort a scan: they are logged and
//! reported alongside the files that could be found.

use crate::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// How the source root is traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalMode {
    /// Immediate children of the source root only
    #[default]
    Flat,
    /// The full subtree, depth-first
    Recursive,
}

impl TraversalMode {
    pub fn from_recursive(recursive: bool) -> Self {
        if recursive {
            TraversalMode::Recursive
        } else {
            TraversalMode::Flat
        }
    }
}

/// Outcome of a scan
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Matching files, in deterministic traversal order
    pub files: Vec<PathBuf>,
    /// Directories that could not be read
    pub errors: Vec<Error>,
}

/// Case-insensitive extension check (`ext` given without the dot)
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Scan `root` for files with extension `ext`
///
/// `exclude` names a directory that is never entered (the staging area).
/// A `root` that is a single file yields that file when its extension
/// matches.
pub fn scan_sources(
    root: &Path,
    mode: TraversalMode,
    ext: &str,
    exclude: Option<&Path>,
) -> ScanReport {
    if root.is_file() {
        let files = if has_extension(root, ext) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        };
        return ScanReport {
            files,
            errors: Vec::new(),
        };
    }

    let report = match mode {
        TraversalMode::Flat => scan_flat(root, ext),
        TraversalMode::Recursive => scan_recursive(root, ext, exclude),
    };

    debug!(
        root = %root.display(),
        ?mode,
        found = report.files.len(),
        errors = report.errors.len(),
        "Scan finished"
    );

    report
}

/// Visit matching files one at a time as they are discovered
///
/// Used by recursive runs, which stage each design as soon as it is found.
pub fn walk_sources<F>(root: &Path, ext: &str, exclude: Option<&Path>, mut visit: F) -> Vec<Error>
where
    F: FnMut(&Path),
{
    if root.is_file() {
        if has_extension(root, ext) {
            visit(root);
        }
        return Vec::new();
    }

    let mut errors = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| exclude.is_none_or(|ex| e.path() != ex))
    {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_extension(entry.path(), ext) {
                    visit(entry.path());
                }
            }
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                errors.push(Error::Discovery {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    errors
}

fn scan_recursive(root: &Path, ext: &str, exclude: Option<&Path>) -> ScanReport {
    let mut files = Vec::new();
    let errors = walk_sources(root, ext, exclude, |path| files.push(path.to_path_buf()));
    ScanReport { files, errors }
}

fn scan_flat(root: &Path, ext: &str) -> ScanReport {
    let mut report = ScanReport::default();

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %root.display(), error = %e, "Failed to read source directory");
            report.errors.push(Error::Discovery {
                path: root.to_path_buf(),
                message: e.to_string(),
            });
            return report;
        }
    };

    for entry in entries {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() && has_extension(&path, ext) {
                    report.files.push(path);
                }
            }
            Err(e) => {
                warn!(path = %root.display(), error = %e, "Failed to read directory entry");
                report.errors.push(Error::Discovery {
                    path: root.to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
    }

    // read_dir order is platform dependent
    report.files.sort();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "<jasperReport/>\n").unwrap();
    }

    #[test]
    fn test_has_extension_case_insensitive() {
        assert!(has_extension(Path::new("a/report.jrxml"), "jrxml"));
        assert!(has_extension(Path::new("a/REPORT.JRXML"), "jrxml"));
        assert!(!has_extension(Path::new("a/report.jasper"), "jrxml"));
        assert!(!has_extension(Path::new("a/README"), "jrxml"));
        assert!(!has_extension(Path::new("a/.jrxml"), "jrxml"));
    }

    #[test]
    fn test_flat_scan_filters_extension() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.jrxml"));
        touch(&dir.path().join("b.JRXML"));
        touch(&dir.path().join("c.Jrxml"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("noext"));
        touch(&dir.path().join("nested").join("deep.jrxml"));
        fs::create_dir_all(dir.path().join("dir.jrxml")).unwrap();

        let report = scan_sources(dir.path(), TraversalMode::Flat, "jrxml", None);
        assert!(report.errors.is_empty());
        assert_eq!(report.files.len(), 3);
        assert!(report.files.iter().all(|p| p.parent() == Some(dir.path())));
    }

    #[test]
    fn test_recursive_scan_all_depths() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("top.jrxml"));
        touch(&dir.path().join("one").join("mid.jrxml"));
        touch(&dir.path().join("one").join("two").join("deep.jrxml"));
        touch(&dir.path().join("one").join("two").join("skip.xml"));

        let report = scan_sources(dir.path(), TraversalMode::Recursive, "jrxml", None);
        let names: Vec<_> = report
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(report.files.len(), 3);
        assert!(names.contains(&"top.jrxml".to_string()));
        assert!(names.contains(&"mid.jrxml".to_string()));
        assert!(names.contains(&"deep.jrxml".to_string()));
    }

    #[test]
    fn test_recursive_scan_is_deterministic() {
        let dir = tempdir().unwrap();
        for name in ["c.jrxml", "a.jrxml", "b/x.jrxml", "b/a.jrxml"] {
            touch(&dir.path().join(name));
        }
        let first = scan_sources(dir.path(), TraversalMode::Recursive, "jrxml", None);
        let second = scan_sources(dir.path(), TraversalMode::Recursive, "jrxml", None);
        assert_eq!(first.files, second.files);
    }

    #[test]
    fn test_recursive_scan_skips_excluded_dir() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("jrxml_temp_change");
        touch(&dir.path().join("a.jrxml"));
        touch(&staging.join("a_temp_changed.jrxml"));

        let report = scan_sources(dir.path(), TraversalMode::Recursive, "jrxml", Some(&staging));
        assert_eq!(report.files, vec![dir.path().join("a.jrxml")]);
    }

    #[test]
    fn test_single_file_root() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("only.jrxml");
        touch(&file);
        let other = dir.path().join("only.txt");
        touch(&other);

        let report = scan_sources(&file, TraversalMode::Flat, "jrxml", None);
        assert_eq!(report.files, vec![file.clone()]);

        let report = scan_sources(&other, TraversalMode::Recursive, "jrxml", None);
        assert!(report.files.is_empty());
    }

    #[test]
    fn test_missing_root_is_reported_not_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");

        let report = scan_sources(&missing, TraversalMode::Flat, "jrxml", None);
        assert!(report.files.is_empty());
        assert_eq!(report.errors.len(), 1);

        let report = scan_sources(&missing, TraversalMode::Recursive, "jrxml", None);
        assert!(report.files.is_empty());
        assert_eq!(report.errors.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_recursive_scan_continues_past_unreadable_entry() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.jrxml"));
        touch(&dir.path().join("one").join("b.jrxml"));
        touch(&dir.path().join("one").join("z.jrxml"));
        touch(&dir.path().join("two").join("c.jrxml"));
        let dangling = dir.path().join("one").join("m_link");
        std::os::unix::fs::symlink(dir.path().join("gone"), &dangling).unwrap();

        let report = scan_sources(dir.path(), TraversalMode::Recursive, "jrxml", None);

        let names: Vec<_> = report
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.jrxml", "b.jrxml", "z.jrxml", "c.jrxml"]);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].to_string().contains("m_link"));
        match &report.errors[0] {
            Error::Discovery { path, .. } => assert_eq!(path, &dangling),
            other => panic!("unexpected error: {other}"),
        }
    }
}
