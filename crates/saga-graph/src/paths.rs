//! Path algebra for the bidirectional solver: wavefront extraction,
//! overlap detection, adjoint reversal and splicing, DAG separation.

use std::collections::HashMap;

use crate::arrows::ArrowDirectory;
use crate::model::{ArrowPtr, Link, NodePtr};

/// Reverse a link path, replacing each arrow with its inverse. The arrow
/// of each reversed element comes from the *following* link of the
/// original, so the seed arrow shifts by one position and the result
/// again starts with a sentinel seed. Involutive.
pub fn adjoint_link_path(path: &[Link], arrows: &ArrowDirectory) -> Vec<Link> {
    let mut adjoint = Vec::with_capacity(path.len());
    let mut prev = arrows.inverse_of(ArrowPtr::NONE);

    for lnk in path.iter().rev() {
        let mut out = lnk.clone();
        out.arr = arrows.inverse_of(prev);
        adjoint.push(out);
        prev = lnk.arr;
    }

    adjoint
}

/// A spliced path is a DAG solution when no destination repeats.
pub fn is_dag(path: &[Link]) -> bool {
    let mut freq: HashMap<NodePtr, usize> = HashMap::new();
    for lnk in path {
        *freq.entry(lnk.dst).or_default() += 1;
    }
    freq.values().all(|&n| n <= 1)
}

/// The cross-cutting last destinations of a path set.
pub fn wave_front(paths: &[Vec<Link>]) -> Vec<NodePtr> {
    paths
        .iter()
        .filter_map(|p| p.last())
        .map(|l| l.dst)
        .collect()
}

/// Coordinate pairs `(l, r)` whose wavefront nodes coincide.
pub fn nodes_overlap(left: &[NodePtr], right: &[NodePtr]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (l, ln) in left.iter().enumerate() {
        for (r, rn) in right.iter().enumerate() {
            if ln == rn {
                pairs.push((l, r));
            }
        }
    }
    pairs
}

/// Join a forward path with an adjoint backward path. The adjoint's seed
/// element duplicates the meet node and is dropped.
pub fn splice(left: &[Link], adjoint: &[Link]) -> Vec<Link> {
    let mut joined = left.to_vec();
    joined.extend(adjoint.iter().skip(1).cloned());
    joined
}

/// Cut a path at the first hop whose arrow differs. Returns the prefix
/// and its length.
pub fn truncate_path_by_arrow(path: &[Link], arrow: ArrowPtr) -> (Vec<Link>, usize) {
    for hop in 1..path.len() {
        if path[hop].arr != arrow {
            return (path[..hop].to_vec(), hop);
        }
    }
    (path.to_vec(), path.len())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
