//! Orbit extraction: the radius-limited neighborhood of a node, grouped
//! by the st-index of the first-hop arrow. Deeper satellites along each
//! probe path are kept unless they backtrack (an arrow whose st-type is
//! the exact negation of the previous hop).

use saga_graph::marshal::context_string;
use saga_graph::traversal::{all_paths_as_links, LinkSource};
use saga_graph::{st_index_to_type, ArrowDirectory, NodePtr};

use crate::error::NarrativeError;
use crate::model::{Orbit, OrbitMap};

/// Probe radius for orbit sweeps.
pub const PROBE_RADIUS: usize = 3;

fn idemp_add_note(list: &mut Vec<Orbit>, note: Orbit) {
    let duplicate = list
        .iter()
        .any(|o| o.dst == note.dst && o.arrow == note.arrow && o.text == note.text);
    if !duplicate {
        list.push(note);
    }
}

/// Sweep every probe path around a node and organize the satellites by
/// the leading arrow's st-index. An arrow named `exclude_arrow` (long or
/// short form) is left out of the orbit; beyond radius 1 it cuts the
/// whole probe angle short.
pub fn node_orbit<S: LinkSource + ?Sized>(
    src: &S,
    arrows: &ArrowDirectory,
    nptr: NodePtr,
    exclude_arrow: &str,
) -> Result<OrbitMap, NarrativeError> {
    let sweep = all_paths_as_links(src, nptr, "any", PROBE_RADIUS)?;
    let mut notes: OrbitMap = std::array::from_fn(|_| Vec::new());

    for (st_index, bucket) in notes.iter_mut().enumerate() {
        for path in &sweep {
            if path.len() <= 1 {
                continue;
            }

            let first = &path[1];
            let arrow = arrows.by_ptr(first.arr)?;
            if arrow.st_index != st_index {
                continue;
            }
            if arrow.long == exclude_arrow || arrow.short == exclude_arrow {
                continue;
            }

            idemp_add_note(
                bucket,
                Orbit {
                    radius: 1,
                    arrow: arrow.long.clone(),
                    st_index: arrow.st_index,
                    dst: first.dst,
                    ctx: String::new(),
                    text: src.text(first.dst)?,
                },
            );

            // deeper satellites at this angle, backtracking suppressed
            let mut prev_st = st_index_to_type(arrow.st_index);
            for depth in 2..PROBE_RADIUS.min(path.len()) {
                let next = &path[depth];
                let arrow = arrows.by_ptr(next.arr)?;
                if arrow.long == exclude_arrow || arrow.short == exclude_arrow {
                    break;
                }

                let this_st = st_index_to_type(arrow.st_index);
                if this_st != -prev_st {
                    idemp_add_note(
                        bucket,
                        Orbit {
                            radius: depth,
                            arrow: arrow.long.clone(),
                            st_index: arrow.st_index,
                            dst: next.dst,
                            ctx: context_string(&next.ctx),
                            text: src.text(next.dst)?,
                        },
                    );
                    prev_st = this_st;
                }
            }
        }
    }

    Ok(notes)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use saga_graph::{Link, LogSink, NodeDirectory};

    fn story_arrows() -> ArrowDirectory {
        let mut arrows = ArrowDirectory::new();
        arrows
            .insert("similarity", "near", "close to", "+")
            .unwrap();
        arrows
            .insert_pair("leadsto", ("then", "leads to"), ("prior", "comes from"))
            .unwrap();
        arrows
            .insert_pair("contains", ("has", "contains"), ("in", "part of"))
            .unwrap();
        arrows
            .insert_pair("properties", ("expr", "expresses"), ("by", "expressed by"))
            .unwrap();
        arrows
    }

    struct Fixture {
        dir: NodeDirectory,
        arrows: ArrowDirectory,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                dir: NodeDirectory::new(),
                arrows: story_arrows(),
            }
        }

        fn node(&mut self, text: &str) -> NodePtr {
            self.dir.append(text, "ch", &LogSink)
        }

        fn edge(&mut self, src: NodePtr, arrow: &str, ctx: &[&str], dst: NodePtr) {
            let arr = self.arrows.by_name(arrow).unwrap();
            let ctx = ctx.iter().map(|s| s.to_string()).collect();
            self.dir
                .add_edge(src, Link::new(arr, 1.0, ctx, dst), dst, &self.arrows)
                .unwrap();
        }
    }

    #[test]
    fn satellites_group_by_first_hop_st_index() {
        let mut fx = Fixture::new();
        let hub = fx.node("hub");
        let successor = fx.node("successor");
        let property = fx.node("property");
        fx.edge(hub, "then", &[], successor);
        fx.edge(hub, "expr", &[], property);

        let orbit = node_orbit(&fx.dir, &fx.arrows, hub, "").unwrap();

        // +1 bucket (index 4) holds the successor
        assert_eq!(orbit[4].len(), 1);
        assert_eq!(orbit[4][0].text, "successor");
        assert_eq!(orbit[4][0].radius, 1);

        // +3 bucket (index 6) holds the property
        assert_eq!(orbit[6].len(), 1);
        assert_eq!(orbit[6][0].text, "property");
    }

    #[test]
    fn deeper_satellites_carry_their_radius_and_context() {
        let mut fx = Fixture::new();
        let hub = fx.node("hub");
        let mid = fx.node("mid");
        let far = fx.node("far");
        fx.edge(hub, "then", &[], mid);
        fx.edge(mid, "then", &["distant shore"], far);

        let orbit = node_orbit(&fx.dir, &fx.arrows, hub, "").unwrap();

        let bucket = &orbit[4];
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].radius, 1);
        assert_eq!(bucket[1].radius, 2);
        assert_eq!(bucket[1].text, "far");
        assert_eq!(bucket[1].ctx, "distant shore");
    }

    #[test]
    fn backtracking_hops_are_suppressed() {
        let mut fx = Fixture::new();
        let hub = fx.node("hub");
        let mid = fx.node("mid");
        let side = fx.node("side");
        fx.edge(hub, "then", &[], mid);
        fx.edge(side, "then", &[], mid);

        // the probe hub→mid→(prior)→side backtracks on the causal axis
        let orbit = node_orbit(&fx.dir, &fx.arrows, hub, "").unwrap();
        let bucket = &orbit[4];
        assert!(bucket.iter().all(|o| o.text != "side"));
    }

    #[test]
    fn excluded_arrow_is_left_out() {
        let mut fx = Fixture::new();
        let hub = fx.node("hub");
        let successor = fx.node("successor");
        let title = fx.node("title");
        fx.edge(hub, "then", &[], successor);
        fx.edge(title, "has", &[], hub);

        let orbit = node_orbit(&fx.dir, &fx.arrows, hub, "then").unwrap();
        assert!(orbit[4].is_empty());
        // the containment satellite survives in the -2 bucket
        assert_eq!(orbit[1].len(), 1);
        assert_eq!(orbit[1][0].text, "title");
    }

    #[test]
    fn orbit_notes_are_deduplicated() {
        let mut fx = Fixture::new();
        let hub = fx.node("hub");
        let successor = fx.node("successor");
        fx.edge(hub, "then", &["x"], successor);
        fx.edge(hub, "then", &["y"], successor);

        let orbit = node_orbit(&fx.dir, &fx.arrows, hub, "").unwrap();
        assert_eq!(orbit[4].len(), 1);
    }
}
