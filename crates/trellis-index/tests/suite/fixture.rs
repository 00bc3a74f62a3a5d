use std::collections::HashMap;
use std::path::PathBuf;

use trellis_core::{Label, TargetTags, VertexId};
use trellis_graph::{TargetEdge, TargetGraph, TargetVertex};
use trellis_index::{
    BuildTargetInfo, SyncColdDiff, SyncContext, SyncScope, TargetRef, TargetResolver,
    WorkspacePathResolver,
};
use trellis_storage::StorageContext;

/// In-memory target-resolution bridge for tests.
#[derive(Default)]
pub struct FakeResolver {
    targets: HashMap<Label, BuildTargetInfo>,
}

impl FakeResolver {
    pub fn insert(&mut self, label: Label, info: BuildTargetInfo) {
        self.targets.insert(label, info);
    }

    pub fn remove(&mut self, label: &Label) {
        self.targets.remove(label);
    }
}

impl TargetResolver for FakeResolver {
    fn build_target(&self, label: &Label) -> Option<BuildTargetInfo> {
        self.targets.get(label).cloned()
    }
}

pub struct Fixture {
    pub storage: StorageContext,
    pub graph: TargetGraph,
    pub resolver: FakeResolver,
    pub paths: WorkspacePathResolver,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_storage(StorageContext::ephemeral())
    }

    pub fn with_storage(storage: StorageContext) -> Self {
        let graph = TargetGraph::open(&storage).expect("open graph");
        Self {
            storage,
            graph,
            resolver: FakeResolver::default(),
            paths: WorkspacePathResolver::new("/ws"),
        }
    }

    /// Registers a universe target with the graph and the resolver.
    pub fn add_target(&mut self, label: &str, tags: TargetTags, sources: &[&str]) -> VertexId {
        let label = Label::parse(label).unwrap();
        let sources: Vec<PathBuf> = sources.iter().map(PathBuf::from).collect();
        let vertex_id = self.graph.next_vertex_id();

        self.graph
            .add_vertex(TargetVertex {
                vertex_id,
                label: label.clone(),
                tags,
                base_directory: None,
                sources: sources.clone(),
                display_name: None,
                in_universe: true,
            })
            .unwrap();
        self.resolver.insert(
            label,
            BuildTargetInfo {
                tags,
                sources,
                display_name: None,
                in_universe: true,
            },
        );
        vertex_id
    }

    /// Adds a dependency edge: `from` depends on `to`.
    pub fn add_dep(&mut self, from: VertexId, to: VertexId) {
        let edge_id = self.graph.next_edge_id();
        self.graph
            .add_edge(TargetEdge { edge_id, from, to })
            .unwrap();
    }

    /// Changes a target's resolver-visible data without touching the graph.
    pub fn set_target_info(&mut self, label: &str, info: BuildTargetInfo) {
        self.resolver.insert(Label::parse(label).unwrap(), info);
    }

    /// Removes a target from the graph and the resolver, returning the
    /// diff entry for the removal.
    pub fn remove_target(&mut self, label: &str) -> TargetRef {
        let label = Label::parse(label).unwrap();
        let vertex_id = self
            .graph
            .vertex_id_by_label(&label)
            .unwrap()
            .expect("target present");
        self.graph.remove_vertex(vertex_id).unwrap();
        self.resolver.remove(&label);
        TargetRef::new(label, vertex_id)
    }

    pub fn target_ref(&self, label: &str) -> TargetRef {
        let label = Label::parse(label).unwrap();
        let vertex_id = self
            .graph
            .vertex_id_by_label(&label)
            .unwrap()
            .expect("target present");
        TargetRef::new(label, vertex_id)
    }

    pub fn ctx(&self, scope: SyncScope) -> SyncContext<'_> {
        SyncContext {
            scope,
            first_sync: false,
            graph: &self.graph,
            targets: &self.resolver,
            paths: &self.paths,
        }
    }

    pub fn changed_diff(&self, labels: &[&str]) -> SyncColdDiff {
        SyncColdDiff {
            changed: labels.iter().map(|label| self.target_ref(label)).collect(),
            removed: Vec::new(),
        }
    }
}
