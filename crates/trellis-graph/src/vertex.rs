use std::io::{Read, Write};
use std::path::PathBuf;

use trellis_core::{EdgeId, Label, TargetTags, VertexId};
use trellis_storage::codec::{
    BoolCodec, Codec, EdgeIdCodec, LabelCodec, OptionCodec, PathCodec, StringCodec,
    TargetTagsCodec, VecCodec, VertexIdCodec,
};
use trellis_storage::CodecError;

/// A target vertex: the full per-target record owned by the graph.
///
/// Created when a target first appears in a sync, removed when absent from
/// a later full/partial sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetVertex {
    pub vertex_id: VertexId,
    pub label: Label,
    pub tags: TargetTags,
    pub base_directory: Option<PathBuf>,
    /// Declared source paths, as reported by the target-resolution bridge.
    pub sources: Vec<PathBuf>,
    pub display_name: Option<String>,
    /// First-class for presentation (a strict subset of all vertices).
    pub in_universe: bool,
}

impl TargetVertex {
    pub fn to_compact(&self) -> TargetCompact {
        TargetCompact {
            vertex_id: self.vertex_id,
            label: self.label.clone(),
            is_executable: self.tags.contains(TargetTags::EXECUTABLE),
        }
    }
}

/// A dependency edge: `from` depends on `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetEdge {
    pub edge_id: EdgeId,
    pub from: VertexId,
    pub to: VertexId,
}

/// Lightweight projection of a vertex for cheap enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCompact {
    pub vertex_id: VertexId,
    pub label: Label,
    pub is_executable: bool,
}

pub struct TargetVertexCodec;

impl Codec<TargetVertex> for TargetVertexCodec {
    fn encode(&self, w: &mut dyn Write, value: &TargetVertex) -> Result<(), CodecError> {
        VertexIdCodec.encode(w, &value.vertex_id)?;
        LabelCodec.encode(w, &value.label)?;
        TargetTagsCodec.encode(w, &value.tags)?;
        OptionCodec(PathCodec).encode(w, &value.base_directory)?;
        VecCodec(PathCodec).encode(w, &value.sources)?;
        OptionCodec(StringCodec).encode(w, &value.display_name)?;
        BoolCodec.encode(w, &value.in_universe)
    }

    fn decode(&self, r: &mut dyn Read) -> Result<TargetVertex, CodecError> {
        Ok(TargetVertex {
            vertex_id: VertexIdCodec.decode(r)?,
            label: LabelCodec.decode(r)?,
            tags: TargetTagsCodec.decode(r)?,
            base_directory: OptionCodec(PathCodec).decode(r)?,
            sources: VecCodec(PathCodec).decode(r)?,
            display_name: OptionCodec(StringCodec).decode(r)?,
            in_universe: BoolCodec.decode(r)?,
        })
    }
}

pub struct TargetEdgeCodec;

impl Codec<TargetEdge> for TargetEdgeCodec {
    fn encode(&self, w: &mut dyn Write, value: &TargetEdge) -> Result<(), CodecError> {
        EdgeIdCodec.encode(w, &value.edge_id)?;
        VertexIdCodec.encode(w, &value.from)?;
        VertexIdCodec.encode(w, &value.to)
    }

    fn decode(&self, r: &mut dyn Read) -> Result<TargetEdge, CodecError> {
        Ok(TargetEdge {
            edge_id: EdgeIdCodec.decode(r)?,
            from: VertexIdCodec.decode(r)?,
            to: VertexIdCodec.decode(r)?,
        })
    }
}

pub struct TargetCompactCodec;

impl Codec<TargetCompact> for TargetCompactCodec {
    fn encode(&self, w: &mut dyn Write, value: &TargetCompact) -> Result<(), CodecError> {
        VertexIdCodec.encode(w, &value.vertex_id)?;
        LabelCodec.encode(w, &value.label)?;
        BoolCodec.encode(w, &value.is_executable)
    }

    fn decode(&self, r: &mut dyn Read) -> Result<TargetCompact, CodecError> {
        Ok(TargetCompact {
            vertex_id: VertexIdCodec.decode(r)?,
            label: LabelCodec.decode(r)?,
            is_executable: BoolCodec.decode(r)?,
        })
    }
}
