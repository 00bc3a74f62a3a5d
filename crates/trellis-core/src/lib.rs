//! Core shared types for Trellis.
//!
//! This crate is intentionally small and dependency-free.

mod ids;
mod label;
mod paths;
mod tags;

pub use ids::{EdgeId, VertexId};
pub use label::{Label, LabelParseError};
pub use paths::normalize_path;
pub use tags::{TargetTags, TreeFlag};
