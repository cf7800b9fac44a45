//! Bidirectional path discovery: expand a forward wavefront from the
//! start set and a backward wavefront from the end set until they meet,
//! splice the overlapping path pairs, and separate DAG solutions from
//! recorded loops.

use saga_graph::paths::{adjoint_link_path, is_dag, nodes_overlap, splice, wave_front};
use saga_graph::traversal::{super_nc_paths_as_links, LinkSource};
use saga_graph::{ArrowDirectory, GraphError, Link, NodePtr};

/// Depth budget for the alternating wavefront expansion.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub max_depth: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig { max_depth: 8 }
    }
}

/// Splice every left/right path pair whose wavefront nodes coincide.
/// Splices without repeated destinations are solutions; the rest are
/// loops, returned separately.
pub fn wave_fronts_overlap(
    arrows: &ArrowDirectory,
    left_paths: &[Vec<Link>],
    right_paths: &[Vec<Link>],
) -> (Vec<Vec<Link>>, Vec<Vec<Link>>) {
    let mut solutions = Vec::new();
    let mut loops = Vec::new();

    let leftfront = wave_front(left_paths);
    let rightfront = wave_front(right_paths);

    for (l, r) in nodes_overlap(&leftfront, &rightfront) {
        let adjoint = adjoint_link_path(&right_paths[r], arrows);
        let spliced = splice(&left_paths[l], &adjoint);

        if is_dag(&spliced) {
            solutions.push(spliced);
        } else {
            loops.push(spliced);
        }
    }

    (solutions, loops)
}

/// Meet-in-the-middle search between two node sets under chapter/context
/// filters. Depths grow alternately (left first) until the wavefronts
/// overlap; the first non-empty solution set wins.
pub fn paths_and_symmetries<S: LinkSource + ?Sized>(
    src: &S,
    arrows: &ArrowDirectory,
    start_set: &[NodePtr],
    end_set: &[NodePtr],
    chapter: &str,
    context: &[String],
    config: &SolverConfig,
) -> Result<Vec<Vec<Link>>, GraphError> {
    if start_set.is_empty() || end_set.is_empty() {
        return Ok(Vec::new());
    }

    let max_depth = config.max_depth;
    let mut ldepth = 1;
    let mut rdepth = 1;
    let mut turn = 0usize;

    while ldepth < max_depth && rdepth < max_depth {
        let left_paths =
            super_nc_paths_as_links(src, start_set, chapter, context, "fwd", ldepth)?;
        let right_paths =
            super_nc_paths_as_links(src, end_set, chapter, context, "bwd", rdepth)?;

        let (solutions, loops) = wave_fronts_overlap(arrows, &left_paths, &right_paths);

        if !solutions.is_empty() {
            tracing::debug!(
                "wavefronts met at depths ({ldepth},{rdepth}): {} solutions, {} loops",
                solutions.len(),
                loops.len()
            );
            return Ok(solutions);
        }

        if turn % 2 == 0 {
            ldepth += 1;
        } else {
            rdepth += 1;
        }
        turn += 1;
    }

    Ok(Vec::new())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
