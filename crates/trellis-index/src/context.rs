//! The sync context and diff model handed to every index updater.

use std::path::{Path, PathBuf};

use trellis_core::{normalize_path, Label, TargetTags, VertexId};
use trellis_graph::TargetGraph;

/// Full rebuild vs. incremental pass scoped to specific targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    Full,
    Partial,
}

impl SyncScope {
    pub fn is_full(self) -> bool {
        matches!(self, SyncScope::Full)
    }
}

/// Build-target data supplied by the target-resolution bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTargetInfo {
    pub tags: TargetTags,
    /// Declared source references; resolved to real paths via [`PathResolver`].
    pub sources: Vec<PathBuf>,
    pub display_name: Option<String>,
    /// First-class for presentation (target-tree indexing).
    pub in_universe: bool,
}

/// Resolution bridge: maps a target reference to its build-target data.
///
/// Returning `None` means the target cannot be resolved right now; updaters
/// skip the item and keep applying the rest of the diff.
pub trait TargetResolver {
    fn build_target(&self, label: &Label) -> Option<BuildTargetInfo>;
}

/// Maps declared source references to canonical real filesystem paths.
pub trait PathResolver {
    fn resolve(&self, declared: &Path) -> Option<PathBuf>;
}

/// Default path resolver: anchors relative references at the workspace root
/// and normalizes lexically, without touching the filesystem.
#[derive(Debug, Clone)]
pub struct WorkspacePathResolver {
    root: PathBuf,
}

impl WorkspacePathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PathResolver for WorkspacePathResolver {
    fn resolve(&self, declared: &Path) -> Option<PathBuf> {
        let absolute = if declared.is_absolute() {
            declared.to_path_buf()
        } else {
            self.root.join(declared)
        };
        Some(normalize_path(&absolute))
    }
}

/// One target reference in a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRef {
    pub label: Label,
    pub vertex_id: VertexId,
}

impl TargetRef {
    pub fn new(label: Label, vertex_id: VertexId) -> Self {
        Self { label, vertex_id }
    }
}

/// Target-level diff driving one index update: targets changed (added or
/// modified) and targets removed since the previous sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncColdDiff {
    pub changed: Vec<TargetRef>,
    pub removed: Vec<TargetRef>,
}

impl SyncColdDiff {
    pub fn split(&self) -> (&[TargetRef], &[TargetRef]) {
        (&self.changed, &self.removed)
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Shared state for one sync pass.
pub struct SyncContext<'a> {
    pub scope: SyncScope,
    pub first_sync: bool,
    pub graph: &'a TargetGraph,
    pub targets: &'a dyn TargetResolver,
    pub paths: &'a dyn PathResolver,
}
