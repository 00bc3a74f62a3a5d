//! The Trellis target graph and its compact-set primitive.

mod bits;
mod graph;
mod vertex;

pub use bits::{BitStore, BitStoreCodec, BitStoreError, DENSE_THRESHOLD};
pub use graph::TargetGraph;
pub use vertex::{
    TargetCompact, TargetCompactCodec, TargetEdge, TargetEdgeCodec, TargetVertex,
    TargetVertexCodec,
};
