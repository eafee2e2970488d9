//! Artifact registry.
//!
//! Artifacts are immutable. Writing the same `(work item, kind)` pair again
//! creates a new revision; revision numbers start at 1 and are assigned only
//! here. Puts to one pair are serialized by a per-pair lock; the registry
//! lock is never held across a disk write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ArtifactError;
use crate::role::Role;
use crate::work_item::WorkItemId;
use crate::workspace::Workspace;

/// Kind of artifact a role produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Document,
    Code,
    ReviewReport,
    TestResult,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Code => "code",
            Self::ReviewReport => "review_report",
            Self::TestResult => "test_result",
        }
    }

    /// File extension used when the artifact is written to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Document => "md",
            Self::Code => "txt",
            Self::ReviewReport | Self::TestResult => "json",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable revision of a work item's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub work_item_id: WorkItemId,
    pub kind: ArtifactKind,
    pub revision: u32,
    pub role: Role,
    pub content: String,
    /// Workspace-relative path when the artifact was written to disk.
    pub location: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

type ArtifactKey = (WorkItemId, ArtifactKind);

/// Append-only registry of artifacts.
pub struct ArtifactStore {
    entries: Mutex<HashMap<ArtifactKey, Vec<Artifact>>>,
    writers: Mutex<HashMap<ArtifactKey, Arc<Mutex<()>>>>,
    workspace: Option<Arc<dyn Workspace>>,
}

impl ArtifactStore {
    /// A store that keeps artifacts in memory only.
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            writers: Mutex::new(HashMap::new()),
            workspace: None,
        }
    }

    /// A store that also writes every artifact into `workspace`.
    pub fn with_workspace(workspace: Arc<dyn Workspace>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            writers: Mutex::new(HashMap::new()),
            workspace: Some(workspace),
        }
    }

    /// Record a new revision for `(work_item, kind)`.
    ///
    /// If the disk write fails nothing is registered and the next put reuses
    /// the same revision number.
    pub fn put(
        &self,
        work_item: WorkItemId,
        kind: ArtifactKind,
        content: impl Into<String>,
        role: Role,
    ) -> Result<Artifact, ArtifactError> {
        let content = content.into();
        let key = (work_item, kind);
        let writer = Arc::clone(self.writers.lock().entry(key).or_default());
        let _writing = writer.lock();

        let revision = self
            .entries
            .lock()
            .get(&key)
            .map_or(1, |revisions| revisions.len() as u32 + 1);

        let location = match &self.workspace {
            Some(workspace) => {
                let relative = artifact_path(work_item, kind, revision);
                workspace.write_artifact(&relative, &content)?;
                Some(relative)
            }
            None => None,
        };

        let artifact = Artifact {
            id: Uuid::new_v4(),
            work_item_id: work_item,
            kind,
            revision,
            role,
            content,
            location,
            created_at: Utc::now(),
        };

        debug!(
            "Stored {} r{} for work item {} from {}",
            kind,
            revision,
            work_item.short(),
            role
        );
        self.entries
            .lock()
            .entry(key)
            .or_default()
            .push(artifact.clone());
        Ok(artifact)
    }

    /// Write a generated project file at the workspace-relative `path`.
    ///
    /// Returns the absolute path, or `None` for an in-memory store.
    pub fn write_file(
        &self,
        path: &Path,
        content: &str,
    ) -> Result<Option<PathBuf>, ArtifactError> {
        match &self.workspace {
            Some(workspace) => workspace.write_artifact(path, content).map(Some),
            None => Ok(None),
        }
    }

    /// Highest revision for `(work_item, kind)`.
    pub fn get_latest(
        &self,
        work_item: WorkItemId,
        kind: ArtifactKind,
    ) -> Result<Artifact, ArtifactError> {
        self.entries
            .lock()
            .get(&(work_item, kind))
            .and_then(|revisions| revisions.last().cloned())
            .ok_or(ArtifactError::NotFound { work_item, kind })
    }

    /// Every revision for `(work_item, kind)`, oldest first.
    pub fn history(&self, work_item: WorkItemId, kind: ArtifactKind) -> Vec<Artifact> {
        self.entries
            .lock()
            .get(&(work_item, kind))
            .cloned()
            .unwrap_or_default()
    }

    /// Latest revision of every kind a work item produced.
    pub fn for_work_item(&self, work_item: WorkItemId) -> Vec<Artifact> {
        let entries = self.entries.lock();
        let mut latest: Vec<Artifact> = entries
            .iter()
            .filter(|((id, _), _)| *id == work_item)
            .filter_map(|(_, revisions)| revisions.last().cloned())
            .collect();
        latest.sort_by_key(|a| a.kind);
        latest
    }

    /// Every stored revision, ordered by creation time.
    pub fn all(&self) -> Vec<Artifact> {
        let entries = self.entries.lock();
        let mut all: Vec<Artifact> = entries.values().flatten().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.revision.cmp(&b.revision)));
        all
    }

    /// Total number of revisions stored.
    pub fn len(&self) -> usize {
        self.entries.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("artifacts", &self.len())
            .field("on_disk", &self.workspace.is_some())
            .finish()
    }
}

/// `docs/artifacts/<work-item>/<kind>.r<revision>.<ext>`
fn artifact_path(work_item: WorkItemId, kind: ArtifactKind, revision: u32) -> PathBuf {
    PathBuf::from("docs")
        .join("artifacts")
        .join(work_item.to_string())
        .join(format!("{}.r{}.{}", kind.as_str(), revision, kind.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    struct BrokenWorkspace;

    impl Workspace for BrokenWorkspace {
        fn root(&self) -> &Path {
            Path::new("/nonexistent")
        }

        fn create_layout(&self) -> Result<(), ArtifactError> {
            Ok(())
        }

        fn write_artifact(&self, path: &Path, _content: &str) -> Result<PathBuf, ArtifactError> {
            Err(ArtifactError::Write {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }

        fn list_artifacts(&self) -> Result<Vec<PathBuf>, ArtifactError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_revisions_increase_from_one() {
        let store = ArtifactStore::in_memory();
        let item = WorkItemId::new();

        for n in 1..=3 {
            let artifact = store
                .put(item, ArtifactKind::Code, format!("v{}", n), Role::Developer)
                .unwrap();
            assert_eq!(artifact.revision, n);
        }

        let history = store.history(item, ArtifactKind::Code);
        let revisions: Vec<u32> = history.iter().map(|a| a.revision).collect();
        assert_eq!(revisions, vec![1, 2, 3]);
        assert_eq!(store.get_latest(item, ArtifactKind::Code).unwrap(), history[2]);
    }

    #[test]
    fn test_kinds_are_independent() {
        let store = ArtifactStore::in_memory();
        let item = WorkItemId::new();
        store.put(item, ArtifactKind::Code, "code", Role::Developer).unwrap();
        let report = store
            .put(item, ArtifactKind::ReviewReport, "ok", Role::TechLead)
            .unwrap();
        assert_eq!(report.revision, 1);
        assert_eq!(store.for_work_item(item).len(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_missing_latest_is_not_found() {
        let store = ArtifactStore::in_memory();
        let err = store
            .get_latest(WorkItemId::new(), ArtifactKind::TestResult)
            .unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
        assert!(store.history(WorkItemId::new(), ArtifactKind::TestResult).is_empty());
    }

    #[test]
    fn test_failed_write_leaves_registry_untouched() {
        let store = ArtifactStore::with_workspace(Arc::new(BrokenWorkspace));
        let item = WorkItemId::new();
        assert!(store.put(item, ArtifactKind::Document, "doc", Role::Architect).is_err());
        assert!(store.is_empty());
        assert!(store.get_latest(item, ArtifactKind::Document).is_err());
    }

    #[test]
    fn test_concurrent_puts_get_distinct_revisions() {
        let store = Arc::new(ArtifactStore::in_memory());
        let item = WorkItemId::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .put(item, ArtifactKind::TestResult, format!("run {}", i), Role::QaEngineer)
                        .unwrap()
                        .revision
                })
            })
            .collect();

        let mut revisions: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        revisions.sort();
        assert_eq!(revisions, (1..=8).collect::<Vec<_>>());
    }

    /// Holds every code write until released.
    struct GatedWorkspace {
        started: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl Workspace for GatedWorkspace {
        fn root(&self) -> &Path {
            Path::new("/gated")
        }

        fn create_layout(&self) -> Result<(), ArtifactError> {
            Ok(())
        }

        fn write_artifact(&self, path: &Path, _content: &str) -> Result<PathBuf, ArtifactError> {
            if path.to_string_lossy().contains("/code.") {
                let _ = self.started.lock().send(());
                self.release
                    .lock()
                    .recv_timeout(Duration::from_secs(5))
                    .map_err(|e| ArtifactError::Write {
                        path: path.to_path_buf(),
                        source: std::io::Error::new(std::io::ErrorKind::TimedOut, e.to_string()),
                    })?;
            }
            Ok(path.to_path_buf())
        }

        fn list_artifacts(&self) -> Result<Vec<PathBuf>, ArtifactError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_slow_write_does_not_block_readers() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Arc::new(ArtifactStore::with_workspace(Arc::new(GatedWorkspace {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        })));
        let item = WorkItemId::new();
        store.put(item, ArtifactKind::Document, "design", Role::Architect).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                store.put(item, ArtifactKind::Code, "fn main() {}", Role::Developer)
            })
        };
        started_rx.recv().unwrap();

        // The code write is still pending
        assert_eq!(store.get_latest(item, ArtifactKind::Document).unwrap().content, "design");
        assert!(store.history(item, ArtifactKind::Code).is_empty());
        let review = store.put(item, ArtifactKind::ReviewReport, "ok", Role::TechLead).unwrap();
        assert_eq!(review.revision, 1);
        assert_eq!(store.len(), 2);

        release_tx.send(()).unwrap();
        let code = writer.join().unwrap().unwrap();
        assert_eq!(code.revision, 1);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_artifact_path_layout() {
        let item = WorkItemId::new();
        let path = artifact_path(item, ArtifactKind::TestResult, 2);
        assert_eq!(
            path,
            PathBuf::from(format!("docs/artifacts/{}/test_result.r2.json", item))
        );
    }
}
