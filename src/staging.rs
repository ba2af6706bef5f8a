//! Staging area for patched designs
//!
//! Patched copies live in a temporary directory nested under the source
//! root. Designs found in sub-directories keep their relative location
//! inside the staging area so equal file names never collide.

use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Name of the staging directory created under the source root
pub const STAGING_DIR_NAME: &str = "jrxml_temp_change";

/// Suffix appended to the file stem of a staged copy
pub const STAGED_SUFFIX: &str = "_temp_changed";

/// A patched working copy of a source design
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDocument {
    /// Original design
    pub source: PathBuf,
    /// Patched copy inside the staging area
    pub staged: PathBuf,
}

impl StagedDocument {
    /// File name of the staged copy, as written to the run logs
    pub fn staged_name(&self) -> String {
        self.staged
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Temporary directory holding staged copies for one run
#[derive(Debug)]
pub struct StagingArea {
    base: PathBuf,
    dir: PathBuf,
}

impl StagingArea {
    /// Create (idempotently) the staging directory under `source_root`
    ///
    /// When `source_root` names a single file the staging directory is
    /// created next to it. The source root itself is never created, so a
    /// missing root fails here. Failure here is the only fatal error of a
    /// run.
    pub fn create(source_root: &Path) -> Result<Self> {
        let base = if source_root.is_file() {
            source_root
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        } else {
            source_root.to_path_buf()
        };
        let dir = base.join(STAGING_DIR_NAME);

        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => {}
            Err(e) => {
                return Err(Error::StagingSetup {
                    path: dir.clone(),
                    source: e,
                });
            }
        }
        debug!(dir = %dir.display(), "Staging directory ready");

        Ok(Self { base, dir })
    }

    /// Root the staged paths are relative to
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The staging directory itself
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory of `source` relative to the source root (empty at top level)
    pub fn relative_dir(&self, source: &Path) -> PathBuf {
        source
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.base).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Staged path for `source`: `<stem>_temp_changed.<ext>` in the mirrored sub-directory
    pub fn staged_path_for(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match source.extension() {
            Some(ext) => format!("{}{}.{}", stem, STAGED_SUFFIX, ext.to_string_lossy()),
            None => format!("{}{}", stem, STAGED_SUFFIX),
        };
        self.dir.join(self.relative_dir(source)).join(name)
    }

    /// Compute the staged path and make sure its directory exists
    pub fn prepare(&self, source: &Path) -> Result<StagedDocument> {
        let staged = self.staged_path_for(source);
        if let Some(parent) = staged.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Patch {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        Ok(StagedDocument {
            source: source.to_path_buf(),
            staged,
        })
    }

    /// Settle a staged copy once its compile attempt is over
    ///
    /// With `replace_originals` the staged content overwrites the original
    /// and the staged copy is removed. Otherwise both are left in place.
    pub fn finish_document(&self, doc: &StagedDocument, replace_originals: bool) -> Result<()> {
        if !replace_originals {
            return Ok(());
        }

        fs::copy(&doc.staged, &doc.source).map_err(|e| Error::Promote {
            path: doc.source.clone(),
            source: e,
        })?;
        fs::remove_file(&doc.staged).map_err(|e| Error::Cleanup {
            path: doc.staged.clone(),
            source: e,
        })?;

        debug!(source = %doc.source.display(), "Replaced original with patched copy");
        Ok(())
    }

    /// Remove the staging directory at the end of a run
    ///
    /// Only empty directories are removed. Leftover staged files make this
    /// fail with a cleanup error; they are never force-deleted.
    pub fn cleanup(&self) -> Result<()> {
        let subdirs: Vec<PathBuf> = WalkDir::new(&self.dir)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect();

        for subdir in subdirs {
            if let Err(e) = fs::remove_dir(&subdir) {
                debug!(dir = %subdir.display(), error = %e, "Staging sub-directory not removed");
            }
        }

        fs::remove_dir(&self.dir).map_err(|e| {
            warn!(dir = %self.dir.display(), error = %e, "Failed to remove staging directory");
            Error::Cleanup {
                path: self.dir.clone(),
                source: e,
            }
        })
    }
}
