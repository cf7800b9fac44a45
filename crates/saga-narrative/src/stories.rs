//! Sequence containers: find the nodes that open a story for a causal
//! arrow, pull the containing title from their orbit, and walk the
//! longest axial path, attaching an orbit to every event along it.

use saga_graph::paths::truncate_path_by_arrow;
use saga_graph::traversal::{fwd_paths_as_links, ncc_story_start_nodes, LinkSource};
use saga_graph::{st_index_to_type, ArrowDirectory, ArrowPtr, Link, NodePtr, CONTAINS, ST_ZERO};

use crate::error::NarrativeError;
use crate::model::{NodeEvent, OrbitMap, Story};
use crate::orbit::node_orbit;

/// Hard limit on story length when probing axial paths.
const MAX_STORY_DEPTH: usize = 100;

/// Whether a search term occurs in a node's text or anywhere in its near
/// orbit.
pub fn orbit_matching(node_text: &str, orbit: &OrbitMap, search: &str) -> bool {
    if node_text.contains(search) || search.contains(node_text) {
        return true;
    }
    orbit.iter().flatten().any(|note| {
        note.text.contains(search) || search.contains(&note.text)
    })
}

/// The longest run of `arrow` hops leaving a node. Paths are cut at the
/// first foreign arrow; runs of a single seed element do not count.
pub fn longest_axial_path<S: LinkSource + ?Sized>(
    src: &S,
    arrows: &ArrowDirectory,
    nptr: NodePtr,
    arrow: ArrowPtr,
) -> Result<Vec<Link>, NarrativeError> {
    let sttype = st_index_to_type(arrows.by_ptr(arrow)?.st_index);
    let paths = fwd_paths_as_links(src, nptr, sttype, MAX_STORY_DEPTH)?;

    let mut best: Vec<Link> = Vec::new();
    for path in &paths {
        let (cut, depth) = truncate_path_by_arrow(path, arrow);
        if cut.len() <= 1 {
            continue;
        }
        if depth > best.len() {
            best = cut;
        }
    }

    Ok(best)
}

/// Stories opened by a causal arrow under chapter/context filters.
///
/// Several openings yield a title list (no axes); a single opening is
/// expanded into a full story: its container satellite from the `-2`
/// orbit bucket, and the axis of events when the search term matches the
/// opening's orbit.
pub fn sequence_containers<S: LinkSource + ?Sized>(
    src: &S,
    arrows: &ArrowDirectory,
    arrow_name: &str,
    search: &str,
    chapter: &str,
    context: &[String],
) -> Result<Vec<Story>, NarrativeError> {
    let arrname = if arrow_name.is_empty() {
        "then"
    } else {
        arrow_name
    };
    let arrow = arrows.by_name(arrname)?;
    let sttype = st_index_to_type(arrows.by_ptr(arrow)?.st_index);

    let openings = ncc_story_start_nodes(
        src,
        arrow,
        arrows.inverse_of(arrow),
        sttype,
        chapter,
        context,
    )?;

    let mut stories = Vec::new();

    if openings.len() > 1 {
        // just the table of openings
        for nptr in openings {
            stories.push(Story {
                container: NodePtr::NONE,
                text: src.text(nptr)?,
                arrow: src.chapter(nptr)?,
                axis: Vec::new(),
            });
        }
        return Ok(stories);
    }

    for nptr in openings {
        let orbit = node_orbit(src, arrows, nptr, arrname)?;

        let mut story = match orbit[(ST_ZERO - CONTAINS) as usize].first() {
            Some(container) => Story {
                container: container.dst,
                text: container.text.clone(),
                arrow: container.arrow.clone(),
                axis: Vec::new(),
            },
            None => Story {
                container: NodePtr::NONE,
                text: "(untitled sequence without a containing node)".to_string(),
                arrow: String::new(),
                axis: Vec::new(),
            },
        };

        if orbit_matching(&src.text(nptr)?, &orbit, search) {
            let axis = longest_axial_path(src, arrows, nptr, arrow)?;
            for lnk in &axis {
                let text = src.text(lnk.dst)?;
                story.axis.push(NodeEvent {
                    len: text.len(),
                    text,
                    chap: src.chapter(lnk.dst)?,
                    nptr: lnk.dst,
                    orbits: node_orbit(src, arrows, lnk.dst, arrname)?,
                });
            }
        }

        if !story.axis.is_empty() {
            stories.push(story);
        }
    }

    Ok(stories)
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

        fn edge(&mut self, src: NodePtr, arrow: &str, dst: NodePtr) {
            let arr = self.arrows.by_name(arrow).unwrap();
            self.dir
                .add_edge(src, Link::new(arr, 1.0, vec![], dst), dst, &self.arrows)
                .unwrap();
        }
    }

    #[test]
    fn axial_path_follows_one_arrow() {
        let mut fx = Fixture::new();
        let a = fx.node("opening line");
        let b = fx.node("second line");
        let c = fx.node("third line");
        let d = fx.node("aside");
        fx.edge(a, "then", b);
        fx.edge(b, "then", c);
        fx.edge(c, "has", d); // foreign arrow ends the axis

        let then = fx.arrows.by_name("then").unwrap();
        let axis = longest_axial_path(&fx.dir, &fx.arrows, a, then).unwrap();

        assert_eq!(axis.len(), 3);
        assert_eq!(axis[0].dst, a);
        assert_eq!(axis[2].dst, c);
    }

    #[test]
    fn single_opening_builds_a_full_story() {
        let mut fx = Fixture::new();
        let title = fx.node("the voyage");
        let a = fx.node("departure at dawn");
        let b = fx.node("storm at sea");
        let c = fx.node("landfall");
        fx.edge(title, "has", a);
        fx.edge(a, "then", b);
        fx.edge(b, "then", c);

        let stories =
            sequence_containers(&fx.dir, &fx.arrows, "then", "voyage", "", &[]).unwrap();

        assert_eq!(stories.len(), 1);
        let story = &stories[0];
        assert_eq!(story.container, title);
        assert_eq!(story.text, "the voyage");
        assert_eq!(story.axis.len(), 3);
        assert_eq!(story.axis[0].text, "departure at dawn");
        assert_eq!(story.axis[2].text, "landfall");
    }

    #[test]
    fn several_openings_return_a_title_list() {
        let mut fx = Fixture::new();
        let a1 = fx.node("first tale opens");
        let a2 = fx.node("first tale ends");
        let b1 = fx.node("second tale opens");
        let b2 = fx.node("second tale ends");
        fx.edge(a1, "then", a2);
        fx.edge(b1, "then", b2);

        let stories = sequence_containers(&fx.dir, &fx.arrows, "then", "", "", &[]).unwrap();

        assert_eq!(stories.len(), 2);
        assert!(stories.iter().all(|s| s.axis.is_empty()));
        let texts: Vec<&str> = stories.iter().map(|s| s.text.as_str()).collect();
        assert!(texts.contains(&"first tale opens"));
        assert!(texts.contains(&"second tale opens"));
    }

    #[test]
    fn unmatched_search_suppresses_the_story() {
        let mut fx = Fixture::new();
        let a = fx.node("departure at dawn");
        let b = fx.node("storm at sea");
        fx.edge(a, "then", b);

        let stories =
            sequence_containers(&fx.dir, &fx.arrows, "then", "volcano eruption", "", &[])
                .unwrap();
        assert!(stories.is_empty());
    }

    #[test]
    fn default_arrow_is_the_causal_then() {
        let mut fx = Fixture::new();
        let a = fx.node("dawn chorus");
        let b = fx.node("morning bells");
        fx.edge(a, "then", b);

        let stories = sequence_containers(&fx.dir, &fx.arrows, "", "dawn", "", &[]).unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].axis.len(), 2);
    }
}
