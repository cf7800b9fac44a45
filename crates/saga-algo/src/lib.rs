//! # saga-algo
//!
//! Path analytics over the saga graph.
//!
//! - [`solver`]     — bidirectional wavefront search with DAG/loop separation
//! - [`supernodes`] — equivalence classes of nodes sharing path position
//! - [`centrality`] — betweenness tallies over solution paths
//!
//! Everything is generic over `saga_graph::LinkSource`, so the same
//! analytics run against the in-memory directory and the persistent
//! store.

pub mod centrality;
pub mod solver;
pub mod supernodes;

pub use centrality::{betweenness_tally, tally_path};
pub use solver::{paths_and_symmetries, wave_fronts_overlap, SolverConfig};
pub use supernodes::{supernodes_by_conic_path, together};
