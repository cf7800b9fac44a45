//! In-memory node directory: six append-only lanes keyed by text size
//! class. The n-gram lanes carry a hash index; the long-text lanes are
//! scanned linearly with a length pre-filter. Slot indices are stable for
//! the process lifetime and preserved by persistence.

use std::collections::HashMap;

use crate::arrows::ArrowDirectory;
use crate::error::{GraphError, WarningSink};
use crate::model::{
    st_index_to_type, st_type_to_index, Link, Node, NodePtr, GT1024, LT1024, LT128, N1GRAM,
    N2GRAM, N3GRAM, SEQUENCE_TOKEN,
};

pub const WARN_DIFFERENT_CAPITALS: &str = "WARNING: Another capitalization exists";

// ─────────────────────────────────────────────
// Link merging
// ─────────────────────────────────────────────

/// Union two context sets, dropping the reserved sequence token and
/// preserving first-seen order.
pub fn merge_contexts(one: &[String], two: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(one.len() + two.len());
    for s in one.iter().chain(two.iter()) {
        if s != SEQUENCE_TOKEN && !merged.contains(s) {
            merged.push(s.clone());
        }
    }
    merged
}

/// Idempotently merge a link into a bucket: an existing `(arrow, dst)`
/// entry absorbs the contexts, otherwise the link is appended.
pub fn merge_links(list: &mut Vec<Link>, mut link: Link) {
    link.ctx.retain(|c| c != SEQUENCE_TOKEN);

    for existing in list.iter_mut() {
        if existing.arr == link.arr && existing.dst == link.dst {
            existing.ctx = merge_contexts(&existing.ctx, &link.ctx);
            return;
        }
    }

    list.push(link);
}

// ─────────────────────────────────────────────
// NodeDirectory
// ─────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct NodeDirectory {
    n1_grams: HashMap<String, i64>,
    n1: Vec<Node>,
    n2_grams: HashMap<String, i64>,
    n2: Vec<Node>,
    n3_grams: HashMap<String, i64>,
    n3: Vec<Node>,
    lt128: Vec<Node>,
    lt1024: Vec<Node>,
    gt1024: Vec<Node>,
}

impl NodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane(&self, class: i32) -> Result<&Vec<Node>, GraphError> {
        match class {
            N1GRAM => Ok(&self.n1),
            N2GRAM => Ok(&self.n2),
            N3GRAM => Ok(&self.n3),
            LT128 => Ok(&self.lt128),
            LT1024 => Ok(&self.lt1024),
            GT1024 => Ok(&self.gt1024),
            other => Err(GraphError::IllegalLinkClass(other)),
        }
    }

    fn lane_mut(&mut self, class: i32) -> Result<&mut Vec<Node>, GraphError> {
        match class {
            N1GRAM => Ok(&mut self.n1),
            N2GRAM => Ok(&mut self.n2),
            N3GRAM => Ok(&mut self.n3),
            LT128 => Ok(&mut self.lt128),
            LT1024 => Ok(&mut self.lt1024),
            GT1024 => Ok(&mut self.gt1024),
            other => Err(GraphError::IllegalLinkClass(other)),
        }
    }

    /// Next free slot in a lane; monotonic for the process lifetime.
    pub fn lane_top(&self, class: i32) -> i64 {
        self.lane(class).map(|l| l.len() as i64).unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        self.n1.len()
            + self.n2.len()
            + self.n3.len()
            + self.lt128.len()
            + self.lt1024.len()
            + self.gt1024.len()
    }

    /// All nodes across the lanes in class order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.n1
            .iter()
            .chain(self.n2.iter())
            .chain(self.n3.iter())
            .chain(self.lt128.iter())
            .chain(self.lt1024.iter())
            .chain(self.gt1024.iter())
    }

    pub fn get_node(&self, nptr: NodePtr) -> Option<&Node> {
        if nptr.cptr < 0 {
            return None;
        }
        self.lane(nptr.class).ok()?.get(nptr.cptr as usize)
    }

    pub fn text_of(&self, nptr: NodePtr) -> Option<&str> {
        self.get_node(nptr).map(|n| n.text.as_str())
    }

    // ── Dedup / append ─────────────────────────────────

    /// Register a text blob under a chapter tag. On an exact hit the
    /// existing pointer is returned and the chapter tag merged in; a
    /// case-variant neighbour only raises a warning through the sink.
    pub fn append(&mut self, text: &str, chap: &str, sink: &dyn WarningSink) -> NodePtr {
        let node = Node::new(text, chap);
        let class = node.nptr.class;

        if let Some(slot) = self.check_existing_or_alt_caps(&node, sink) {
            let nptr = NodePtr::new(class, slot);
            self.add_chapter(nptr, chap);
            return nptr;
        }

        // miss: allocate the next slot in the class lane
        let slot = self.lane_top(class);
        let mut node = node;
        node.nptr = NodePtr::new(class, slot);

        match class {
            N1GRAM => {
                self.n1_grams.insert(node.text.clone(), slot);
            }
            N2GRAM => {
                self.n2_grams.insert(node.text.clone(), slot);
            }
            N3GRAM => {
                self.n3_grams.insert(node.text.clone(), slot);
            }
            _ => {}
        }

        let nptr = node.nptr;
        match self.lane_mut(class) {
            Ok(lane) => lane.push(node),
            Err(_) => return NodePtr::NONE,
        }
        nptr
    }

    /// Exact-match probe, followed by a case-variant sweep that warns but
    /// never merges.
    fn check_existing_or_alt_caps(&self, node: &Node, sink: &dyn WarningSink) -> Option<i64> {
        let hit = match node.nptr.class {
            N1GRAM => self.n1_grams.get(&node.text).copied(),
            N2GRAM => self.n2_grams.get(&node.text).copied(),
            N3GRAM => self.n3_grams.get(&node.text).copied(),
            LT128 => linear_find(&self.lt128, node, false),
            LT1024 => linear_find(&self.lt1024, node, false),
            GT1024 => linear_find(&self.gt1024, node, false),
            _ => None,
        };

        if hit.is_some() {
            return hit;
        }

        let alternative_caps = match node.nptr.class {
            N1GRAM => hash_lane_has_case_variant(&self.n1_grams, &node.text),
            N2GRAM => hash_lane_has_case_variant(&self.n2_grams, &node.text),
            N3GRAM => hash_lane_has_case_variant(&self.n3_grams, &node.text),
            LT128 => linear_find(&self.lt128, node, true).is_some(),
            LT1024 => linear_find(&self.lt1024, node, true).is_some(),
            GT1024 => linear_find(&self.gt1024, node, true).is_some(),
            _ => false,
        };

        if alternative_caps {
            sink.warn(&format!("{WARN_DIFFERENT_CAPITALS} ({})", node.text));
        }

        None
    }

    /// Merge a chapter tag into a node. Tags already present as a
    /// substring of the comma-joined multiset are not re-added.
    pub fn add_chapter(&mut self, nptr: NodePtr, chap: &str) {
        let Ok(lane) = self.lane_mut(nptr.class) else {
            return;
        };
        let Some(node) = lane.get_mut(nptr.cptr as usize) else {
            return;
        };
        if node.chap.contains(chap) {
            return;
        }
        node.chap = format!("{},{}", node.chap, chap);
    }

    // ── Link insertion ─────────────────────────────────

    /// Merge a half-edge into the source node's bucket. The bucket is
    /// selected by the arrow's st-index; contexts union on collision.
    pub fn append_link(
        &mut self,
        src: NodePtr,
        link: Link,
        arrows: &ArrowDirectory,
    ) -> Result<(), GraphError> {
        let st_index = arrows.by_ptr(link.arr)?.st_index;
        self.append_link_bucket(src, link, st_index)
    }

    fn append_link_bucket(
        &mut self,
        src: NodePtr,
        link: Link,
        st_index: usize,
    ) -> Result<(), GraphError> {
        let lane = self.lane_mut(src.class)?;
        let Some(node) = lane.get_mut(src.cptr as usize) else {
            return Err(GraphError::Storage(format!(
                "no node at ({},{})",
                src.class, src.cptr
            )));
        };
        merge_links(&mut node.links[st_index], link);
        Ok(())
    }

    /// Insert a logical edge: the forward half-edge on the source and the
    /// mirrored inverse half-edge on the destination are written jointly.
    /// Self-loops and unregistered arrows fail the insert.
    pub fn add_edge(
        &mut self,
        src: NodePtr,
        mut link: Link,
        dst: NodePtr,
        arrows: &ArrowDirectory,
    ) -> Result<(), GraphError> {
        link.dst = dst;

        if src == dst {
            let text = self.text_of(src).unwrap_or_default().to_string();
            return Err(GraphError::SelfLoop(text));
        }

        let arrow = arrows.by_ptr(link.arr)?;
        let sttype = st_index_to_type(arrow.st_index);

        let inverse = Link {
            arr: arrows.inverse_of(link.arr),
            wgt: link.wgt,
            ctx: Vec::new(),
            dst: src,
        };

        self.append_link_bucket(src, link, st_type_to_index(sttype)?)?;
        self.append_link_bucket(dst, inverse, st_type_to_index(-sttype)?)?;
        Ok(())
    }
}

fn hash_lane_has_case_variant(lane: &HashMap<String, i64>, text: &str) -> bool {
    let lowered = text.to_lowercase();
    lane.keys().any(|key| key.to_lowercase() == lowered)
}

fn linear_find(lane: &[Node], node: &Node, ignore_caps: bool) -> Option<i64> {
    for (i, candidate) in lane.iter().enumerate() {
        if candidate.len != node.len {
            continue;
        }
        let hit = if ignore_caps {
            candidate.text.to_lowercase() == node.text.to_lowercase()
        } else {
            candidate.text == node.text
        };
        if hit {
            return Some(i as i64);
        }
    }
    None
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArrowPtr;
    use std::cell::RefCell;

    #[derive(Default)]
    struct CollectSink {
        messages: RefCell<Vec<String>>,
    }

    impl WarningSink for CollectSink {
        fn warn(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }

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

    #[test]
    fn append_deduplicates_exact_text() {
        let mut dir = NodeDirectory::new();
        let sink = CollectSink::default();

        let a = dir.append("alice", "ch1", &sink);
        let b = dir.append("alice", "ch1", &sink);
        assert_eq!(a, b);
        assert_eq!(dir.node_count(), 1);
        assert!(sink.messages.borrow().is_empty());
    }

    #[test]
    fn case_variants_stay_distinct_but_warn() {
        let mut dir = NodeDirectory::new();
        let sink = CollectSink::default();

        let a = dir.append("Alice", "ch1", &sink);
        let b = dir.append("ALICE", "ch1", &sink);

        assert_ne!(a, b);
        assert_eq!(a.class, b.class);
        assert_eq!(dir.node_count(), 2);
        let messages = sink.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains(WARN_DIFFERENT_CAPITALS));
    }

    #[test]
    fn case_variant_warning_in_linear_lane() {
        let mut dir = NodeDirectory::new();
        let sink = CollectSink::default();

        dir.append("one two three four", "ch1", &sink);
        dir.append("One Two Three Four", "ch1", &sink);

        assert_eq!(dir.node_count(), 2);
        assert_eq!(sink.messages.borrow().len(), 1);
    }

    #[test]
    fn chapter_merges_on_dedup_hit() {
        let mut dir = NodeDirectory::new();
        let sink = CollectSink::default();

        let a = dir.append("alice", "ch1", &sink);
        let b = dir.append("alice", "ch2", &sink);

        assert_eq!(a, b);
        let chap = &dir.get_node(a).unwrap().chap;
        assert!(chap.contains("ch1"));
        assert!(chap.contains("ch2"));

        // a tag already present as a substring is not appended again
        dir.append("alice", "ch1", &sink);
        assert_eq!(dir.get_node(a).unwrap().chap, "ch1,ch2");
    }

    #[test]
    fn indices_are_dense_and_monotonic() {
        let mut dir = NodeDirectory::new();
        let sink = CollectSink::default();

        let a = dir.append("one", "ch", &sink);
        let b = dir.append("two", "ch", &sink);
        let c = dir.append("one two", "ch", &sink);

        assert_eq!((a.class, a.cptr), (N1GRAM, 0));
        assert_eq!((b.class, b.cptr), (N1GRAM, 1));
        assert_eq!((c.class, c.cptr), (N2GRAM, 0));
        assert_eq!(dir.lane_top(N1GRAM), 2);
    }

    #[test]
    fn merge_links_unions_contexts_and_strips_sequence() {
        let dst = NodePtr::new(1, 1);
        let mut list = vec![];
        merge_links(
            &mut list,
            Link::new(
                ArrowPtr(1),
                1.0,
                vec!["x".into(), SEQUENCE_TOKEN.into()],
                dst,
            ),
        );
        merge_links(&mut list, Link::new(ArrowPtr(1), 1.0, vec!["y".into()], dst));

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].ctx, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn merge_links_keeps_distinct_destinations() {
        let mut list = vec![];
        merge_links(
            &mut list,
            Link::new(ArrowPtr(1), 1.0, vec![], NodePtr::new(1, 1)),
        );
        merge_links(
            &mut list,
            Link::new(ArrowPtr(1), 1.0, vec![], NodePtr::new(1, 2)),
        );
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn add_edge_mirrors_inverse_half_edge() {
        let arrows = story_arrows();
        let mut dir = NodeDirectory::new();
        let sink = CollectSink::default();

        let a = dir.append("alpha", "ch", &sink);
        let b = dir.append("beta", "ch", &sink);

        let then = arrows.by_name("then").unwrap();
        dir.add_edge(a, Link::new(then, 1.0, vec!["x".into()], b), b, &arrows)
            .unwrap();

        // +1 bucket on the source
        let fwd = dir.get_node(a).unwrap().bucket(1).unwrap();
        assert_eq!(fwd.len(), 1);
        assert_eq!(fwd[0].dst, b);
        assert_eq!(fwd[0].arr, then);

        // -1 bucket on the destination carries the inverse arrow
        let bwd = dir.get_node(b).unwrap().bucket(-1).unwrap();
        assert_eq!(bwd.len(), 1);
        assert_eq!(bwd[0].dst, a);
        assert_eq!(bwd[0].arr, arrows.by_name("prior").unwrap());
    }

    #[test]
    fn add_edge_is_idempotent_with_context_union() {
        let arrows = story_arrows();
        let mut dir = NodeDirectory::new();
        let sink = CollectSink::default();

        let a = dir.append("alpha", "ch", &sink);
        let b = dir.append("beta", "ch", &sink);
        let then = arrows.by_name("then").unwrap();

        dir.add_edge(a, Link::new(then, 1.0, vec!["x".into()], b), b, &arrows)
            .unwrap();
        dir.add_edge(a, Link::new(then, 1.0, vec!["y".into()], b), b, &arrows)
            .unwrap();

        let fwd = dir.get_node(a).unwrap().bucket(1).unwrap();
        assert_eq!(fwd.len(), 1);
        assert_eq!(fwd[0].ctx, vec!["x".to_string(), "y".to_string()]);

        let bwd = dir.get_node(b).unwrap().bucket(-1).unwrap();
        assert_eq!(bwd.len(), 1);
    }

    #[test]
    fn add_edge_rejects_self_loops() {
        let arrows = story_arrows();
        let mut dir = NodeDirectory::new();
        let sink = CollectSink::default();

        let a = dir.append("alpha", "ch", &sink);
        let then = arrows.by_name("then").unwrap();

        let err = dir
            .add_edge(a, Link::new(then, 1.0, vec![], a), a, &arrows)
            .unwrap_err();
        assert!(matches!(err, GraphError::SelfLoop(text) if text == "alpha"));
    }

    #[test]
    fn add_edge_rejects_unknown_arrows() {
        let arrows = story_arrows();
        let mut dir = NodeDirectory::new();
        let sink = CollectSink::default();

        let a = dir.append("alpha", "ch", &sink);
        let b = dir.append("beta", "ch", &sink);

        let err = dir
            .add_edge(a, Link::new(ArrowPtr(99), 1.0, vec![], b), b, &arrows)
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownArrow(_)));
    }
}
