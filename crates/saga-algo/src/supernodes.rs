//! Supernode aggregation: nodes occupying the same position in parallel
//! solution paths (same predecessor, same successor) collapse into one
//! equivalence class.

use saga_graph::{Link, NodePtr};

/// Merge two nodes into the matroid of node classes. If either node is
/// already a member somewhere, the other joins that class; otherwise the
/// pair founds a new class.
pub fn together(mut matroid: Vec<Vec<NodePtr>>, n1: NodePtr, n2: NodePtr) -> Vec<Vec<NodePtr>> {
    for class in matroid.iter_mut() {
        if class.contains(&n1) || class.contains(&n2) {
            if !class.contains(&n1) {
                class.push(n1);
            }
            if !class.contains(&n2) {
                class.push(n2);
            }
            return matroid;
        }
    }

    let mut newsuper = vec![n1];
    if n1 != n2 {
        newsuper.push(n2);
    }
    matroid.push(newsuper);
    matroid
}

/// Sweep every depth slot of the solution set and merge nodes from
/// different paths whose immediate predecessors and successors coincide.
/// Singleton classes record the remaining path positions.
pub fn supernodes_by_conic_path(solutions: &[Vec<Link>], max_depth: usize) -> Vec<Vec<NodePtr>> {
    let mut supernodes: Vec<Vec<NodePtr>> = Vec::new();

    for depth in 0..max_depth * 2 {
        for i in 0..solutions.len() {
            let len_i = solutions[i].len();

            if depth == len_i - 1 {
                supernodes = together(supernodes, solutions[i][depth].dst, solutions[i][depth].dst);
            }
            if depth > len_i - 1 {
                continue;
            }

            supernodes = together(supernodes, solutions[i][depth].dst, solutions[i][depth].dst);

            for j in (i + 1)..solutions.len() {
                let len_j = solutions[j].len();
                if depth < 1 || depth + 2 > len_j || depth + 1 >= len_i {
                    break;
                }
                if solutions[i][depth - 1].dst == solutions[j][depth - 1].dst
                    && solutions[i][depth + 1].dst == solutions[j][depth + 1].dst
                {
                    supernodes =
                        together(supernodes, solutions[i][depth].dst, solutions[j][depth].dst);
                }
            }
        }
    }

    supernodes
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use saga_graph::ArrowPtr;

    fn np(cptr: i64) -> NodePtr {
        NodePtr::new(1, cptr)
    }

    fn path(nodes: &[i64]) -> Vec<Link> {
        nodes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let arr = if i == 0 { ArrowPtr::NONE } else { ArrowPtr(1) };
                Link::new(arr, 1.0, vec![], np(n))
            })
            .collect()
    }

    #[test]
    fn together_founds_and_grows_classes() {
        let m = together(Vec::new(), np(1), np(2));
        assert_eq!(m, vec![vec![np(1), np(2)]]);

        let m = together(m, np(2), np(3));
        assert_eq!(m, vec![vec![np(1), np(2), np(3)]]);

        let m = together(m, np(7), np(7));
        assert_eq!(m.len(), 2);
        assert_eq!(m[1], vec![np(7)]);
    }

    #[test]
    fn parallel_middles_collapse() {
        // 0→1→3 and 0→2→3 share predecessor and successor at depth 1
        let solutions = vec![path(&[0, 1, 3]), path(&[0, 2, 3])];
        let classes = supernodes_by_conic_path(&solutions, 4);

        let merged = classes
            .iter()
            .find(|c| c.contains(&np(1)))
            .expect("class with node 1");
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(&np(2)));
    }

    #[test]
    fn differing_successors_stay_apart() {
        // 0→1→3 and 0→2→4 share only the predecessor
        let solutions = vec![path(&[0, 1, 3]), path(&[0, 2, 4])];
        let classes = supernodes_by_conic_path(&solutions, 4);

        let with_1 = classes.iter().find(|c| c.contains(&np(1))).unwrap();
        assert!(!with_1.contains(&np(2)));
    }

    #[test]
    fn endpoints_form_their_own_classes() {
        let solutions = vec![path(&[0, 1, 3]), path(&[0, 2, 3])];
        let classes = supernodes_by_conic_path(&solutions, 4);

        assert!(classes.iter().any(|c| c == &vec![np(0)]));
        assert!(classes.iter().any(|c| c == &vec![np(3)]));
    }
}
