//! # saga-graph
//!
//! Semantic-spacetime graph model for SagaDB.
//!
//! Nodes carry text payloads partitioned by size class; links carry a
//! typed arrow, a weight and a free-form context set. Every node owns
//! seven adjacency buckets indexed by the signed st-type of the arrow
//! (±1 causation, ±2 containment, ±3 property, 0 similarity), and every
//! written edge keeps its mirrored inverse half-edge in step.
//!
//! - [`model`]      — pointers, links, nodes, size classifier, st-types
//! - [`arrows`]     — arrow name ↔ pointer ↔ st-type registry with inverses
//! - [`directory`]  — size-classed, append-only node directory
//! - [`matching`]   — context/chapter/name predicates and accent folding
//! - [`traversal`]  — cones, path enumeration, story starts over [`traversal::LinkSource`]
//! - [`paths`]      — adjoint reversal, wavefronts, DAG separation
//! - [`marshal`]    — tabular wire-format rendering and tolerant parsing

pub mod arrows;
pub mod directory;
pub mod error;
pub mod marshal;
pub mod matching;
pub mod model;
pub mod paths;
pub mod traversal;

pub use arrows::{Arrow, ArrowDirectory};
pub use directory::{merge_contexts, merge_links, NodeDirectory, WARN_DIFFERENT_CAPITALS};
pub use error::{GraphError, LogSink, WarningSink};
pub use model::{
    st_index_to_type, st_type_name, st_type_to_index, storage_class, ArrowPtr, Link, Node,
    NodeArrowNode, NodePtr, PageMap, CONTAINS, EXPRESS, GT1024, LEADS_TO, LT1024, LT128, N1GRAM,
    N2GRAM, N3GRAM, NEAR, SEQUENCE_TOKEN, ST_TOP, ST_ZERO,
};
pub use traversal::LinkSource;
