use serde::{Deserialize, Serialize};

use saga_graph::{NodePtr, ST_TOP};

/// One satellite in a node's neighborhood: the arrow that reached it,
/// its radius, and the destination's text payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    pub radius: usize,
    pub arrow: String,
    pub st_index: usize,
    pub dst: NodePtr,
    pub ctx: String,
    pub text: String,
}

/// A node's orbit grouped by the st-index of the first-hop arrow.
pub type OrbitMap = [Vec<Orbit>; ST_TOP];

/// One event along a story axis, with its own orbit attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEvent {
    pub text: String,
    pub len: usize,
    pub chap: String,
    pub nptr: NodePtr,
    pub orbits: OrbitMap,
}

/// A story: the containing title node (when one exists), the arrow that
/// links the sequence to it, and the axis of events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub container: NodePtr,
    pub text: String,
    pub arrow: String,
    pub axis: Vec<NodeEvent>,
}
