//! Typed traversal over any link source: forward cones (BFS), forward
//! path enumeration (DFS with exclude-set threading), chapter/context
//! filtered variants, and story-start detection.
//!
//! The [`LinkSource`] trait is the seam between the in-memory directory
//! and the persistent store: every traversal here runs unchanged against
//! either tier.

use std::collections::HashSet;

use crate::error::GraphError;
use crate::matching::{match_chapter, match_context};
use crate::model::{st_type_to_index, ArrowPtr, Link, Node, NodePtr, EXPRESS};

// ─────────────────────────────────────────────
// LinkSource
// ─────────────────────────────────────────────

/// Read access to typed adjacency, the minimum surface traversal needs.
pub trait LinkSource {
    /// The adjacency bucket of a node for one signed st-type.
    fn typed_links(&self, nptr: NodePtr, sttype: i32) -> Result<Vec<Link>, GraphError>;

    /// The comma-joined chapter multiset of a node ("" when unknown).
    fn chapter(&self, nptr: NodePtr) -> Result<String, GraphError>;

    /// The text payload of a node ("" when unknown).
    fn text(&self, nptr: NodePtr) -> Result<String, GraphError>;

    /// Every node, for whole-graph scans (story starts, filters).
    fn scan_nodes(&self) -> Result<Vec<Node>, GraphError>;
}

impl LinkSource for crate::directory::NodeDirectory {
    fn typed_links(&self, nptr: NodePtr, sttype: i32) -> Result<Vec<Link>, GraphError> {
        let idx = st_type_to_index(sttype)?;
        Ok(self
            .get_node(nptr)
            .map(|n| n.links[idx].clone())
            .unwrap_or_default())
    }

    fn chapter(&self, nptr: NodePtr) -> Result<String, GraphError> {
        Ok(self
            .get_node(nptr)
            .map(|n| n.chap.clone())
            .unwrap_or_default())
    }

    fn text(&self, nptr: NodePtr) -> Result<String, GraphError> {
        Ok(self.text_of(nptr).unwrap_or_default().to_string())
    }

    fn scan_nodes(&self) -> Result<Vec<Node>, GraphError> {
        Ok(self.iter().cloned().collect())
    }
}

// ─────────────────────────────────────────────
// Neighbour probes
// ─────────────────────────────────────────────

/// One bucket, sentinel links skipped, excluded destinations dropped.
pub fn fwd_links<S: LinkSource + ?Sized>(
    src: &S,
    nptr: NodePtr,
    exclude: &HashSet<NodePtr>,
    sttype: i32,
) -> Result<Vec<Link>, GraphError> {
    let mut out = Vec::new();
    for lnk in src.typed_links(nptr, sttype)? {
        if lnk.arr == ArrowPtr::NONE {
            continue;
        }
        if exclude.contains(&lnk.dst) {
            continue;
        }
        out.push(lnk);
    }
    Ok(out)
}

/// Chapter/context filtered probe: the chapter predicate gates the node
/// whose bucket is read, the context predicate gates each link.
pub fn nc_fwd_links<S: LinkSource + ?Sized>(
    src: &S,
    nptr: NodePtr,
    chapter: &str,
    context: &[String],
    exclude: &HashSet<NodePtr>,
    sttype: i32,
) -> Result<Vec<Link>, GraphError> {
    if !match_chapter(&src.chapter(nptr)?, chapter) {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for lnk in src.typed_links(nptr, sttype)? {
        if lnk.arr == ArrowPtr::NONE {
            continue;
        }
        if !match_context(&lnk.ctx, context) {
            continue;
        }
        if exclude.contains(&lnk.dst) {
            continue;
        }
        out.push(lnk);
    }
    Ok(out)
}

// ─────────────────────────────────────────────
// Forward cones (BFS)
// ─────────────────────────────────────────────

/// The set of nodes reachable along one st-type within `max_depth` hops,
/// in discovery order. Depth 0 is the start node alone.
pub fn fwd_cone_as_nodes<S: LinkSource + ?Sized>(
    src: &S,
    start: NodePtr,
    sttype: i32,
    max_depth: usize,
) -> Result<Vec<NodePtr>, GraphError> {
    let mut cone = Vec::new();
    let mut exclude: HashSet<NodePtr> = HashSet::from([NodePtr::new(0, 0)]);
    let mut level = vec![start];

    for _ in 0..=max_depth {
        if level.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for nptr in level {
            if exclude.contains(&nptr) {
                continue;
            }
            cone.push(nptr);
            exclude.insert(nptr);
            for lnk in fwd_links(src, nptr, &exclude, sttype)? {
                next.push(lnk.dst);
            }
        }
        level = next;
    }

    Ok(cone)
}

/// Same wavefront control as [`fwd_cone_as_nodes`] but carrying the links
/// that discovered each node. The sentinel seed never appears in the
/// result.
pub fn fwd_cone_as_links<S: LinkSource + ?Sized>(
    src: &S,
    start: NodePtr,
    sttype: i32,
    max_depth: usize,
) -> Result<Vec<Link>, GraphError> {
    let mut cone = Vec::new();
    let mut exclude: HashSet<NodePtr> = HashSet::from([NodePtr::new(0, 0)]);
    let mut level = vec![Link::seed(start)];

    for _ in 0..=max_depth {
        if level.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for lnk in level {
            if exclude.contains(&lnk.dst) {
                continue;
            }
            exclude.insert(lnk.dst);
            if lnk.arr != ArrowPtr::NONE {
                cone.push(lnk.clone());
            }
            next.extend(fwd_links(src, lnk.dst, &exclude, sttype)?);
        }
        level = next;
    }

    Ok(cone)
}

/// Chapter/context filtered cone: the filters gate every hop.
pub fn nc_fwd_cone_as_nodes<S: LinkSource + ?Sized>(
    src: &S,
    start: NodePtr,
    chapter: &str,
    context: &[String],
    sttype: i32,
    max_depth: usize,
) -> Result<Vec<NodePtr>, GraphError> {
    let mut cone = Vec::new();
    let mut exclude: HashSet<NodePtr> = HashSet::from([NodePtr::new(0, 0)]);
    let mut level = vec![start];

    for _ in 0..=max_depth {
        if level.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for nptr in level {
            if exclude.contains(&nptr) {
                continue;
            }
            cone.push(nptr);
            exclude.insert(nptr);
            for lnk in nc_fwd_links(src, nptr, chapter, context, &exclude, sttype)? {
                next.push(lnk.dst);
            }
        }
        level = next;
    }

    Ok(cone)
}

/// Chapter/context filtered [`fwd_cone_as_links`].
pub fn nc_fwd_cone_as_links<S: LinkSource + ?Sized>(
    src: &S,
    start: NodePtr,
    chapter: &str,
    context: &[String],
    sttype: i32,
    max_depth: usize,
) -> Result<Vec<Link>, GraphError> {
    let mut cone = Vec::new();
    let mut exclude: HashSet<NodePtr> = HashSet::from([NodePtr::new(0, 0)]);
    let mut level = vec![Link::seed(start)];

    for _ in 0..=max_depth {
        if level.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for lnk in level {
            if exclude.contains(&lnk.dst) {
                continue;
            }
            exclude.insert(lnk.dst);
            if lnk.arr != ArrowPtr::NONE {
                cone.push(lnk.clone());
            }
            next.extend(nc_fwd_links(src, lnk.dst, chapter, context, &exclude, sttype)?);
        }
        level = next;
    }

    Ok(cone)
}

// ─────────────────────────────────────────────
// Path enumeration (DFS)
// ─────────────────────────────────────────────

/// Probe order for the unfiltered enumerators.
fn orientation_types(orientation: &str) -> &'static [i32] {
    match orientation {
        "fwd" => &[0, 1, 2, 3],
        "bwd" => &[-3, -2, -1, 0],
        _ => &[-3, -2, -1, 0, 1, 2, 3],
    }
}

/// Probe order for the chapter/context filtered enumerators. The causal
/// `+1` comes last so narrative sequences close each branch.
fn nc_orientation_types(orientation: &str) -> &'static [i32] {
    match orientation {
        "fwd" => &[0, 2, 3, 1],
        "bwd" => &[-1, 0, -2, -3],
        _ => &[-1, 0, 2, -2, 3, -3, 1],
    }
}

/// Depth-first path walk shared by all enumerators. Emits the running
/// path when the depth budget is reached or no extension survives the
/// filters. Sibling branches share exclusions within one call; child
/// recursion works on a snapshot. Returns whether anything was emitted.
#[allow(clippy::too_many_arguments)]
fn sum_paths<S: LinkSource + ?Sized>(
    src: &S,
    probe: &[i32],
    nc: Option<(&str, &[String])>,
    start: &Link,
    path: &[Link],
    depth: usize,
    max_depth: usize,
    exclude: &HashSet<NodePtr>,
    out: &mut Vec<Vec<Link>>,
) -> Result<bool, GraphError> {
    if depth == max_depth {
        out.push(path.to_vec());
        return Ok(true);
    }

    let mut fwdlinks = Vec::new();
    for &sttype in probe {
        let links = match nc {
            Some((chapter, context)) => {
                nc_fwd_links(src, start.dst, chapter, context, exclude, sttype)?
            }
            None => fwd_links(src, start.dst, exclude, sttype)?,
        };
        fwdlinks.extend(links);
    }

    let mut emitted = false;
    let mut local = exclude.clone();

    for lnk in fwdlinks {
        if local.contains(&lnk.dst) {
            continue;
        }
        local.insert(lnk.dst);

        let mut tot_path = path.to_vec();
        tot_path.push(lnk.clone());

        let sub = sum_paths(
            src,
            probe,
            nc,
            &lnk,
            &tot_path,
            depth + 1,
            max_depth,
            &local,
            out,
        )?;
        if !sub {
            // dead end: the branch itself is a complete path
            out.push(tot_path);
        }
        emitted = true;
    }

    Ok(emitted)
}

fn enumerate_paths<S: LinkSource + ?Sized>(
    src: &S,
    probe: &[i32],
    nc: Option<(&str, &[String])>,
    start: NodePtr,
    max_depth: usize,
) -> Result<Vec<Vec<Link>>, GraphError> {
    let seed = Link::seed(start);
    let exclude = HashSet::from([start]);
    let mut out = Vec::new();
    sum_paths(
        src,
        probe,
        nc,
        &seed,
        &[seed.clone()],
        1,
        max_depth,
        &exclude,
        &mut out,
    )?;
    out.retain(|p| p.len() >= 2);
    Ok(out)
}

/// All simple paths along one st-type, up to `max_depth` links including
/// the seed. Trivial single-element paths are dropped.
pub fn fwd_paths_as_links<S: LinkSource + ?Sized>(
    src: &S,
    start: NodePtr,
    sttype: i32,
    max_depth: usize,
) -> Result<Vec<Vec<Link>>, GraphError> {
    enumerate_paths(src, &[sttype], None, start, max_depth)
}

/// All simple paths over a caller-chosen orientation set, shortest first.
pub fn all_paths_as_links<S: LinkSource + ?Sized>(
    src: &S,
    start: NodePtr,
    orientation: &str,
    max_depth: usize,
) -> Result<Vec<Vec<Link>>, GraphError> {
    let mut paths = enumerate_paths(src, orientation_types(orientation), None, start, max_depth)?;
    paths.sort_by_key(|p| p.len());
    Ok(paths)
}

/// Chapter/context filtered variant of [`all_paths_as_links`].
pub fn all_nc_paths_as_links<S: LinkSource + ?Sized>(
    src: &S,
    start: NodePtr,
    chapter: &str,
    context: &[String],
    orientation: &str,
    max_depth: usize,
) -> Result<Vec<Vec<Link>>, GraphError> {
    enumerate_paths(
        src,
        nc_orientation_types(orientation),
        Some((chapter, context)),
        start,
        max_depth,
    )
}

/// Multi-start variant: one seed per start node, the whole start set
/// excluded from every expansion.
pub fn super_nc_paths_as_links<S: LinkSource + ?Sized>(
    src: &S,
    starts: &[NodePtr],
    chapter: &str,
    context: &[String],
    orientation: &str,
    max_depth: usize,
) -> Result<Vec<Vec<Link>>, GraphError> {
    let probe = nc_orientation_types(orientation);
    let exclude: HashSet<NodePtr> = starts.iter().copied().collect();
    let mut out = Vec::new();

    for &start in starts {
        let seed = Link::seed(start);
        sum_paths(
            src,
            probe,
            Some((chapter, context)),
            &seed,
            &[seed.clone()],
            1,
            max_depth,
            &exclude,
            &mut out,
        )?;
    }

    out.retain(|p| p.len() >= 2);
    Ok(out)
}

// ─────────────────────────────────────────────
// Story starts
// ─────────────────────────────────────────────

fn arrow_in_list(arrow: ArrowPtr, links: &[Link]) -> bool {
    links.iter().any(|l| l.arr == arrow)
}

fn arrow_in_context_list(arrow: ArrowPtr, links: &[Link], context: &[String]) -> bool {
    links
        .iter()
        .any(|l| l.arr == arrow && match_context(&l.ctx, context))
}

/// Nodes that begin a story: at least one outbound `arrow` link on the
/// `sttype` bucket and no inbound `inverse` link on the mirror bucket.
pub fn story_start_nodes<S: LinkSource + ?Sized>(
    src: &S,
    arrow: ArrowPtr,
    inverse: ArrowPtr,
    sttype: i32,
) -> Result<Vec<NodePtr>, GraphError> {
    if !(-EXPRESS..=EXPRESS).contains(&sttype) {
        return Err(GraphError::OutOfBoundsStType(sttype));
    }

    let fwd = st_type_to_index(sttype)?;
    let bwd = st_type_to_index(-sttype)?;

    let mut out = Vec::new();
    for node in src.scan_nodes()? {
        if arrow_in_list(arrow, &node.links[fwd]) && !arrow_in_list(inverse, &node.links[bwd]) {
            out.push(node.nptr);
        }
    }
    Ok(out)
}

/// Chapter/context filtered story starts.
pub fn ncc_story_start_nodes<S: LinkSource + ?Sized>(
    src: &S,
    arrow: ArrowPtr,
    inverse: ArrowPtr,
    sttype: i32,
    chapter: &str,
    context: &[String],
) -> Result<Vec<NodePtr>, GraphError> {
    let fwd = st_type_to_index(sttype)?;
    let bwd = st_type_to_index(-sttype)?;

    let mut out = Vec::new();
    for node in src.scan_nodes()? {
        if !match_chapter(&node.chap, chapter) {
            continue;
        }
        if arrow_in_context_list(arrow, &node.links[fwd], context)
            && !arrow_in_context_list(inverse, &node.links[bwd], context)
        {
            out.push(node.nptr);
        }
    }
    Ok(out)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
