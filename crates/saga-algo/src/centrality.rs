//! Betweenness tallies over solution paths: how often each node text
//! appears across the discovered routes, normalized by the number of
//! solutions and grouped in decreasing order.

use std::collections::{BTreeMap, HashMap};

use saga_graph::traversal::LinkSource;
use saga_graph::{GraphError, Link};

/// Count the occurrences of each node along one path into the running
/// tally.
pub fn tally_path<S: LinkSource + ?Sized>(
    src: &S,
    path: &[Link],
    between: &mut HashMap<String, usize>,
) -> Result<(), GraphError> {
    for leg in path {
        let text = src.text(leg.dst)?;
        *between.entry(text).or_default() += 1;
    }
    Ok(())
}

/// Betweenness groups: `(score, node texts)` in decreasing score order,
/// where score is the occurrence count divided by the solution count.
pub fn betweenness_tally<S: LinkSource + ?Sized>(
    src: &S,
    solutions: &[Vec<Link>],
) -> Result<Vec<(f64, Vec<String>)>, GraphError> {
    if solutions.is_empty() {
        return Ok(Vec::new());
    }

    let mut between: HashMap<String, usize> = HashMap::new();
    for path in solutions {
        tally_path(src, path, &mut between)?;
    }

    let mut grouped: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (text, count) in between {
        grouped.entry(count).or_default().push(text);
    }

    let total = solutions.len() as f64;
    let mut out = Vec::new();
    for (count, mut names) in grouped.into_iter().rev() {
        names.sort();
        out.push((count as f64 / total, names));
    }
    Ok(out)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use saga_graph::{ArrowPtr, Link, LogSink, NodeDirectory, NodePtr};

    fn build() -> (NodeDirectory, Vec<NodePtr>) {
        let mut dir = NodeDirectory::new();
        let ptrs = ["start", "shared", "left", "right", "finish"]
            .iter()
            .map(|t| dir.append(t, "ch", &LogSink))
            .collect();
        (dir, ptrs)
    }

    fn path(ptrs: &[NodePtr]) -> Vec<Link> {
        ptrs.iter()
            .enumerate()
            .map(|(i, &n)| {
                let arr = if i == 0 { ArrowPtr::NONE } else { ArrowPtr(1) };
                Link::new(arr, 1.0, vec![], n)
            })
            .collect()
    }

    #[test]
    fn shared_nodes_score_highest() {
        let (dir, p) = build();
        // both solutions pass through "shared"
        let solutions = vec![
            path(&[p[0], p[1], p[2], p[4]]),
            path(&[p[0], p[1], p[3], p[4]]),
        ];

        let tally = betweenness_tally(&dir, &solutions).unwrap();

        // start, shared and finish appear in both paths: score 1.0
        assert_eq!(tally[0].0, 1.0);
        assert_eq!(
            tally[0].1,
            vec!["finish".to_string(), "shared".to_string(), "start".to_string()]
        );
        // the branch nodes appear once: score 0.5
        assert_eq!(tally[1].0, 0.5);
        assert_eq!(tally[1].1, vec!["left".to_string(), "right".to_string()]);
    }

    #[test]
    fn empty_solution_set_yields_empty_tally() {
        let (dir, _) = build();
        assert!(betweenness_tally(&dir, &[]).unwrap().is_empty());
    }
}
