//! Output workspace.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::ArtifactError;

/// Directories every generated project starts with.
pub const LAYOUT_DIRS: [&str; 3] = ["src", "docs", "tests"];

/// Where artifacts land on disk.
pub trait Workspace: Send + Sync {
    /// Root directory of the workspace.
    fn root(&self) -> &Path;

    /// Create the `src`, `docs` and `tests` directories.
    fn create_layout(&self) -> Result<(), ArtifactError>;

    /// Write `content` at the workspace-relative `path`, returning the absolute path.
    fn write_artifact(&self, path: &Path, content: &str) -> Result<PathBuf, ArtifactError>;

    /// Workspace-relative paths of every file written so far.
    fn list_artifacts(&self) -> Result<Vec<PathBuf>, ArtifactError>;
}

/// Workspace backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    root: PathBuf,
}

impl FsWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reject absolute paths and anything that climbs out of the root.
    fn resolve(&self, path: &Path) -> Result<PathBuf, ArtifactError> {
        let escapes = path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || path.as_os_str().is_empty() {
            return Err(ArtifactError::InvalidPath(path.to_path_buf()));
        }
        Ok(self.root.join(path))
    }
}

impl Workspace for FsWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn create_layout(&self) -> Result<(), ArtifactError> {
        for dir in LAYOUT_DIRS {
            fs::create_dir_all(self.root.join(dir))?;
        }
        debug!("Created workspace layout at {:?}", self.root);
        Ok(())
    }

    fn write_artifact(&self, path: &Path, content: &str) -> Result<PathBuf, ArtifactError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|source| ArtifactError::Write {
                path: full.clone(),
                source,
            })?;
        }
        fs::write(&full, content).map_err(|source| ArtifactError::Write {
            path: full.clone(),
            source,
        })?;
        Ok(full)
    }

    fn list_artifacts(&self) -> Result<Vec<PathBuf>, ArtifactError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| ArtifactError::Workspace(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path());
            // Run journals are bookkeeping, not project output
            if relative.starts_with(".squad") {
                continue;
            }
            files.push(relative.to_path_buf());
        }
        Ok(files)
    }
}
