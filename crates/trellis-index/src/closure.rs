//! Reverse transitive closure over the executable universe.
//!
//! For every vertex, the index stores the set of executable targets that
//! depend on it, transitively, including itself when executable. The index
//! is recomputed in full from the current executable set and the edge
//! relation on every sync; it is never mutated per edge. The snapshot is
//! persisted wholesale as one flat store.

use std::io::{Read, Write};

use anyhow::Context;
use hashbrown::{HashMap, HashSet};

use trellis_core::VertexId;
use trellis_graph::{BitStore, BitStoreCodec, TargetGraph};
use trellis_storage::codec::{versioned, Codec, HashMapCodec, VecCodec, VertexIdCodec};
use trellis_storage::{CodecError, FlatStore, StorageContext, StorageError, StorageHints};

use crate::context::SyncContext;
use crate::executable::ExecutableTargetIndex;

const STATE_NOT_VISITED: u8 = 0;
const STATE_VISITING: u8 = 1;
const STATE_VISITED: u8 = 2;

/// One rebuilt closure: the compact executable universe plus a bit-set per
/// vertex with a non-empty reachable-executable set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitiveClosureSnapshot {
    /// Index into the executable universe → vertex id.
    pub idx_to_vertex: Vec<VertexId>,
    /// Vertex id → bits over `idx_to_vertex`. Vertices with an empty set
    /// store nothing.
    pub closures: HashMap<VertexId, BitStore>,
}

pub struct TransitiveClosureSnapshotCodec;

impl Codec<TransitiveClosureSnapshot> for TransitiveClosureSnapshotCodec {
    fn encode(&self, w: &mut dyn Write, value: &TransitiveClosureSnapshot) -> Result<(), CodecError> {
        VecCodec(VertexIdCodec).encode(w, &value.idx_to_vertex)?;
        HashMapCodec(VertexIdCodec, BitStoreCodec).encode(w, &value.closures)
    }

    fn decode(&self, r: &mut dyn Read) -> Result<TransitiveClosureSnapshot, CodecError> {
        Ok(TransitiveClosureSnapshot {
            idx_to_vertex: VecCodec(VertexIdCodec).decode(r)?,
            closures: HashMapCodec(VertexIdCodec, BitStoreCodec).decode(r)?,
        })
    }
}

pub struct TransitiveClosureIndex {
    snapshot: FlatStore<TransitiveClosureSnapshot>,
}

impl TransitiveClosureIndex {
    pub fn open(storage: &StorageContext) -> Result<Self, StorageError> {
        let snapshot = storage.flat_store(
            "index.target2ReverseTransitiveExecutableTargetIds",
            StorageHints::UseInMemory,
            versioned(1, TransitiveClosureSnapshotCodec),
            TransitiveClosureSnapshot::default,
        )?;
        Ok(Self { snapshot })
    }

    /// Full rebuild for this sync. Runs after the executable-target set has
    /// been finalized by its own updater.
    pub fn update_indexes(
        &mut self,
        ctx: &SyncContext<'_>,
        executable: &ExecutableTargetIndex,
    ) -> anyhow::Result<()> {
        if ctx.scope.is_full() {
            self.snapshot.reset();
        }

        let rebuilt = compute_closure(ctx.graph, executable.ids())?;
        tracing::debug!(
            target = "trellis.index",
            universe = rebuilt.idx_to_vertex.len(),
            materialized = rebuilt.closures.len(),
            "rebuilt reverse transitive closure"
        );
        self.snapshot.replace(rebuilt);
        self.snapshot
            .flush()
            .context("flushing transitive-closure snapshot")?;
        Ok(())
    }

    pub fn snapshot(&self) -> &TransitiveClosureSnapshot {
        self.snapshot.get()
    }

    /// Executable targets transitively depending on `vertex_id`, restricted
    /// to the currently-executable set.
    pub fn all_reverse_transitive_executable_target_ids(
        &self,
        vertex_id: VertexId,
        executable: &ExecutableTargetIndex,
    ) -> Vec<VertexId> {
        self.reverse_transitive_ids(vertex_id, Some(executable.ids()))
    }

    /// Unfiltered variant for generic reachability queries.
    pub fn all_reverse_transitive_target_ids(&self, vertex_id: VertexId) -> Vec<VertexId> {
        self.reverse_transitive_ids(vertex_id, None)
    }

    /// Vertex ids for set bits, optionally filtered by an external set.
    /// A vertex absent from the map yields an empty result, not an error.
    pub fn reverse_transitive_ids(
        &self,
        vertex_id: VertexId,
        filter: Option<&HashSet<VertexId>>,
    ) -> Vec<VertexId> {
        let snapshot = self.snapshot.get();
        let Some(bits) = snapshot.closures.get(&vertex_id) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        bits.for_each(|idx| {
            let id = snapshot.idx_to_vertex[idx as usize];
            if filter.is_none_or(|allowed| allowed.contains(&id)) {
                out.push(id);
            }
        });
        out
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.snapshot.flush()
    }
}

/// Iterative post-order traversal with tri-color marking.
///
/// Explicit stack, never call-stack recursion: graphs can have tens of
/// thousands of vertices and arbitrary depth.
fn compute_closure(
    graph: &TargetGraph,
    execs: &HashSet<VertexId>,
) -> anyhow::Result<TransitiveClosureSnapshot> {
    let mut idx_to_vertex: Vec<VertexId> = execs.iter().copied().collect();
    idx_to_vertex.sort_unstable();

    let exec_index: HashMap<VertexId, u32> = idx_to_vertex
        .iter()
        .enumerate()
        .map(|(idx, id)| (*id, idx as u32))
        .collect();
    let universe = idx_to_vertex.len();

    let mut closures: HashMap<VertexId, BitStore> = HashMap::new();
    let mut state: HashMap<VertexId, u8> = HashMap::new();
    let mut stack: Vec<VertexId> = Vec::new();

    for start in graph.all_vertex_ids() {
        if state.get(&start).copied().unwrap_or(STATE_NOT_VISITED) == STATE_VISITED {
            continue;
        }
        stack.push(start);

        while let Some(&vertex_id) = stack.last() {
            match state.get(&vertex_id).copied().unwrap_or(STATE_NOT_VISITED) {
                STATE_NOT_VISITED => {
                    state.insert(vertex_id, STATE_VISITING);
                    for predecessor in graph.predecessors(vertex_id) {
                        if state.get(&predecessor).copied().unwrap_or(STATE_NOT_VISITED)
                            != STATE_VISITED
                        {
                            stack.push(predecessor);
                        }
                    }
                }
                STATE_VISITING => {
                    stack.pop();
                    state.insert(vertex_id, STATE_VISITED);

                    let mut bits: Option<BitStore> = None;
                    for predecessor in graph.predecessors(vertex_id) {
                        let Some(predecessor_bits) = closures.get(&predecessor) else {
                            continue;
                        };
                        match &mut bits {
                            None => bits = Some(predecessor_bits.clone()),
                            Some(acc) => acc.union_in_place(predecessor_bits)?,
                        }
                    }

                    if let Some(exec_idx) = exec_index.get(&vertex_id) {
                        bits.get_or_insert_with(|| BitStore::with_universe(universe))
                            .insert(*exec_idx);
                    }

                    if let Some(bits) = bits {
                        if !bits.is_empty() {
                            closures.insert(vertex_id, bits);
                        }
                    }
                }
                _ => {
                    stack.pop();
                }
            }
        }
    }

    Ok(TransitiveClosureSnapshot {
        idx_to_vertex,
        closures,
    })
}
