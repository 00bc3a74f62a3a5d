//! The target graph: integer-identified vertices, directed dependency
//! edges, and label lookup, all persisted through [`trellis_storage`].
//!
//! The graph is a DAG by construction (build graphs do not contain
//! cycles); the closure algorithms rely on this invariant rather than
//! detecting violations.

use std::io::{Read, Write};

use hashbrown::HashMap;

use trellis_core::{EdgeId, Label, VertexId};
use trellis_storage::codec::{
    versioned, Codec, EdgeIdCodec, HashMapCodec, Hash128Codec, U32Codec, U64Codec, VecCodec,
    VertexIdCodec,
};
use trellis_storage::{
    CodecError, FlatStore, Hash128, KvStore, SortedKvStore, StorageContext, StorageError,
    StorageHints,
};

use crate::vertex::{
    TargetCompact, TargetCompactCodec, TargetEdge, TargetEdgeCodec, TargetVertex,
    TargetVertexCodec,
};

type Adjacency = HashMap<VertexId, Vec<VertexId>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct GraphMetadata {
    vertex_id_counter: u32,
    edge_id_counter: u32,
}

struct GraphMetadataCodec;

impl Codec<GraphMetadata> for GraphMetadataCodec {
    fn encode(&self, w: &mut dyn Write, value: &GraphMetadata) -> Result<(), CodecError> {
        U32Codec.encode(w, &value.vertex_id_counter)?;
        U32Codec.encode(w, &value.edge_id_counter)
    }

    fn decode(&self, r: &mut dyn Read) -> Result<GraphMetadata, CodecError> {
        Ok(GraphMetadata {
            vertex_id_counter: U32Codec.decode(r)?,
            edge_id_counter: U32Codec.decode(r)?,
        })
    }
}

fn pack_edge_link(from: VertexId, to: VertexId) -> u64 {
    (u64::from(from.as_u32()) << 32) | u64::from(to.as_u32())
}

pub struct TargetGraph {
    metadata: FlatStore<GraphMetadata>,
    id_to_vertex: KvStore<VertexId, TargetVertex>,
    id_to_compact: KvStore<VertexId, TargetCompact>,
    id_to_edge: KvStore<EdgeId, TargetEdge>,
    label_hash_to_vertex: SortedKvStore<Hash128, VertexId>,
    edge_link_to_edge: KvStore<u64, EdgeId>,
    successors: FlatStore<Adjacency>,
    predecessors: FlatStore<Adjacency>,
}

impl TargetGraph {
    pub fn open(storage: &StorageContext) -> Result<Self, StorageError> {
        let adjacency_codec =
            || versioned(1, HashMapCodec(VertexIdCodec, VecCodec(VertexIdCodec)));

        Ok(Self {
            metadata: storage.flat_store(
                "graph.metadata",
                StorageHints::UseInMemory,
                versioned(1, GraphMetadataCodec),
                GraphMetadata::default,
            )?,
            id_to_vertex: storage.kv_store(
                "graph.id2vertex",
                StorageHints::UsePagedStore,
                VertexIdCodec,
                versioned(1, TargetVertexCodec),
            )?,
            id_to_compact: storage.kv_store(
                "graph.id2compact",
                StorageHints::UsePagedStore,
                VertexIdCodec,
                versioned(1, TargetCompactCodec),
            )?,
            id_to_edge: storage.kv_store(
                "graph.id2edge",
                StorageHints::UsePagedStore,
                EdgeIdCodec,
                versioned(1, TargetEdgeCodec),
            )?,
            label_hash_to_vertex: storage.sorted_kv_store(
                "graph.labelHash2vertexId",
                StorageHints::UseInMemory,
                Hash128Codec,
                VertexIdCodec,
            )?,
            edge_link_to_edge: storage.kv_store(
                "graph.edgeLink2edgeId",
                StorageHints::UsePagedStore,
                U64Codec,
                EdgeIdCodec,
            )?,
            successors: storage.flat_store(
                "graph.id2successors",
                StorageHints::UseInMemory,
                adjacency_codec(),
                HashMap::new,
            )?,
            predecessors: storage.flat_store(
                "graph.id2predecessors",
                StorageHints::UseInMemory,
                adjacency_codec(),
                HashMap::new,
            )?,
        })
    }

    pub fn vertices(&self) -> Result<Vec<TargetVertex>, StorageError> {
        self.id_to_vertex.values()
    }

    pub fn compacts(&self) -> Result<Vec<TargetCompact>, StorageError> {
        self.id_to_compact.values()
    }

    pub fn vertex_by_id(&self, id: VertexId) -> Result<Option<TargetVertex>, StorageError> {
        self.id_to_vertex.get(&id)
    }

    pub fn vertex_id_by_label(&self, label: &Label) -> Result<Option<VertexId>, StorageError> {
        self.label_hash_to_vertex.get(&Hash128::of_label(label))
    }

    pub fn vertex_by_label(&self, label: &Label) -> Result<Option<TargetVertex>, StorageError> {
        match self.vertex_id_by_label(label)? {
            Some(id) => self.vertex_by_id(id),
            None => Ok(None),
        }
    }

    pub fn label_by_vertex_id(&self, id: VertexId) -> Result<Option<Label>, StorageError> {
        Ok(self.compact_by_id(id)?.map(|compact| compact.label))
    }

    pub fn compact_by_id(&self, id: VertexId) -> Result<Option<TargetCompact>, StorageError> {
        self.id_to_compact.get(&id)
    }

    pub fn edge_by_id(&self, id: EdgeId) -> Result<Option<TargetEdge>, StorageError> {
        self.id_to_edge.get(&id)
    }

    /// Vertices this one depends on.
    pub fn successors(&self, id: VertexId) -> Vec<VertexId> {
        self.successors.get().get(&id).cloned().unwrap_or_default()
    }

    /// Vertices depending on this one.
    pub fn predecessors(&self, id: VertexId) -> Vec<VertexId> {
        self.predecessors.get().get(&id).cloned().unwrap_or_default()
    }

    pub fn edge_between(
        &self,
        from: VertexId,
        to: VertexId,
    ) -> Result<Option<EdgeId>, StorageError> {
        self.edge_link_to_edge.get(&pack_edge_link(from, to))
    }

    pub fn outgoing_edges(&self, id: VertexId) -> Result<Vec<EdgeId>, StorageError> {
        let mut edges = Vec::new();
        for successor in self.successors(id) {
            if let Some(edge_id) = self.edge_between(id, successor)? {
                edges.push(edge_id);
            }
        }
        Ok(edges)
    }

    pub fn incoming_edges(&self, id: VertexId) -> Result<Vec<EdgeId>, StorageError> {
        let mut edges = Vec::new();
        for predecessor in self.predecessors(id) {
            if let Some(edge_id) = self.edge_between(predecessor, id)? {
                edges.push(edge_id);
            }
        }
        Ok(edges)
    }

    /// Inserts or replaces a vertex; the compact projection and the label
    /// index are kept in step.
    pub fn add_vertex(&mut self, vertex: TargetVertex) -> Result<(), StorageError> {
        let compact = vertex.to_compact();
        let label_hash = Hash128::of_label(&vertex.label);
        let id = vertex.vertex_id;

        self.id_to_vertex.put(id, vertex)?;
        self.id_to_compact.put(id, compact)?;
        self.label_hash_to_vertex.put(label_hash, id)?;
        Ok(())
    }

    pub fn add_edge(&mut self, edge: TargetEdge) -> Result<(), StorageError> {
        self.id_to_edge.put(edge.edge_id, edge)?;
        self.successors.mutate(|adjacency| {
            adjacency.entry(edge.from).or_default().push(edge.to);
        });
        self.predecessors.mutate(|adjacency| {
            adjacency.entry(edge.to).or_default().push(edge.from);
        });
        self.edge_link_to_edge
            .put(pack_edge_link(edge.from, edge.to), edge.edge_id)?;
        Ok(())
    }

    pub fn remove_vertex(&mut self, id: VertexId) -> Result<Option<TargetVertex>, StorageError> {
        let Some(vertex) = self.id_to_vertex.remove(&id)? else {
            return Ok(None);
        };
        self.id_to_compact.remove(&id)?;
        self.label_hash_to_vertex
            .remove(&Hash128::of_label(&vertex.label))?;

        for successor in self.successors(id) {
            self.predecessors
                .mutate(|adjacency| remove_adjacent(adjacency, successor, id));
            if let Some(edge_id) = self
                .edge_link_to_edge
                .remove(&pack_edge_link(id, successor))?
            {
                self.id_to_edge.remove(&edge_id)?;
            }
        }

        for predecessor in self.predecessors(id) {
            self.successors
                .mutate(|adjacency| remove_adjacent(adjacency, predecessor, id));
            if let Some(edge_id) = self
                .edge_link_to_edge
                .remove(&pack_edge_link(predecessor, id))?
            {
                self.id_to_edge.remove(&edge_id)?;
            }
        }

        self.successors.mutate(|adjacency| {
            adjacency.remove(&id);
        });
        self.predecessors.mutate(|adjacency| {
            adjacency.remove(&id);
        });

        Ok(Some(vertex))
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Option<TargetEdge>, StorageError> {
        let Some(edge) = self.id_to_edge.remove(&id)? else {
            return Ok(None);
        };
        self.successors
            .mutate(|adjacency| remove_adjacent(adjacency, edge.from, edge.to));
        self.predecessors
            .mutate(|adjacency| remove_adjacent(adjacency, edge.to, edge.from));
        self.edge_link_to_edge
            .remove(&pack_edge_link(edge.from, edge.to))?;
        Ok(Some(edge))
    }

    /// Every vertex currently in the graph, including isolated ones.
    pub fn all_vertex_ids(&self) -> Vec<VertexId> {
        self.id_to_vertex.keys()
    }

    pub fn vertex_count(&self) -> usize {
        self.id_to_vertex.len()
    }

    pub fn next_vertex_id(&mut self) -> VertexId {
        self.metadata.mutate(|metadata| {
            metadata.vertex_id_counter += 1;
        });
        VertexId::new(self.metadata.get().vertex_id_counter)
    }

    pub fn next_edge_id(&mut self) -> EdgeId {
        self.metadata.mutate(|metadata| {
            metadata.edge_id_counter += 1;
        });
        EdgeId::new(self.metadata.get().edge_id_counter)
    }

    pub fn clear(&mut self) {
        self.id_to_vertex.clear();
        self.id_to_compact.clear();
        self.id_to_edge.clear();
        self.label_hash_to_vertex.clear();
        self.edge_link_to_edge.clear();
        self.successors.mutate(HashMap::clear);
        self.predecessors.mutate(HashMap::clear);
        tracing::debug!(target = "trellis.graph", "cleared target graph");
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.metadata.flush()?;
        self.id_to_vertex.flush()?;
        self.id_to_compact.flush()?;
        self.id_to_edge.flush()?;
        self.label_hash_to_vertex.flush()?;
        self.edge_link_to_edge.flush()?;
        self.successors.flush()?;
        self.predecessors.flush()
    }
}

fn remove_adjacent(adjacency: &mut Adjacency, key: VertexId, value: VertexId) {
    if let Some(list) = adjacency.get_mut(&key) {
        if let Some(position) = list.iter().position(|candidate| *candidate == value) {
            list.remove(position);
        }
        if list.is_empty() {
            adjacency.remove(&key);
        }
    }
}
