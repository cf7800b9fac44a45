use serde::{Deserialize, Serialize};

use crate::error::GraphError;

// ─────────────────────────────────────────────
// Semantic-spacetime types
// ─────────────────────────────────────────────

/// The four base relation kinds. A signed `STType` is one of these with a
/// polarity: ±1 causation, ±2 containment, ±3 property, 0 similarity.
pub const NEAR: i32 = 0;
pub const LEADS_TO: i32 = 1;
pub const CONTAINS: i32 = 2;
pub const EXPRESS: i32 = 3;

/// Offset that shifts a signed st-type into an adjacency bucket index.
pub const ST_ZERO: i32 = EXPRESS;

/// Number of adjacency buckets per node (`-3 ..= +3` shifted by `ST_ZERO`).
pub const ST_TOP: usize = (ST_ZERO + EXPRESS + 1) as usize;

/// Reserved context token marking parser-internal sequence glue. Stripped
/// from every link context on merge.
pub const SEQUENCE_TOKEN: &str = "_sequence_";

/// Convert a signed st-type to its adjacency bucket index.
pub fn st_type_to_index(sttype: i32) -> Result<usize, GraphError> {
    if !(-EXPRESS..=EXPRESS).contains(&sttype) {
        return Err(GraphError::OutOfBoundsStType(sttype));
    }
    Ok((sttype + ST_ZERO) as usize)
}

/// Convert an adjacency bucket index back to the signed st-type.
pub fn st_index_to_type(st_index: usize) -> i32 {
    st_index as i32 - ST_ZERO
}

/// Human name of a signed st-type, used in narrative output.
pub fn st_type_name(sttype: i32) -> &'static str {
    match sttype {
        t if t == -EXPRESS => "-is property of",
        t if t == -CONTAINS => "-contained by",
        t if t == -LEADS_TO => "-comes from",
        NEAR => "=similarity",
        LEADS_TO => "+leads to",
        CONTAINS => "+contains",
        EXPRESS => "+property",
        _ => "unknown st-type",
    }
}

// ─────────────────────────────────────────────
// Size classes
// ─────────────────────────────────────────────

/// Text size classes. The discriminants are persisted inside `NodePtr`s,
/// so their values are part of the storage contract.
pub const N1GRAM: i32 = 1;
pub const N2GRAM: i32 = 2;
pub const N3GRAM: i32 = 3;
pub const LT128: i32 = 4;
pub const LT1024: i32 = 5;
pub const GT1024: i32 = 6;

/// Classify a text blob into `(byte length, size class)`.
///
/// Text usage follows a power law: short n-grams are many and repeated,
/// long strings are few. Up to two ASCII spaces selects an n-gram lane
/// regardless of length; everything else is classified by byte length.
pub fn storage_class(s: &str) -> (usize, i32) {
    let mut spaces = 0;
    for b in s.bytes() {
        if b == b' ' {
            spaces += 1;
            if spaces > 2 {
                break;
            }
        }
    }

    let l = s.len();

    match spaces {
        0 => (l, N1GRAM),
        1 => (l, N2GRAM),
        2 => (l, N3GRAM),
        _ => {
            if l < 128 {
                (l, LT128)
            } else if l < 1024 {
                (l, LT1024)
            } else {
                (l, GT1024)
            }
        }
    }
}

// ─────────────────────────────────────────────
// Pointers
// ─────────────────────────────────────────────

/// Durable handle to a node: the size class picks the lane, `cptr` is the
/// dense slot within it. Indices are append-only and survive persistence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct NodePtr {
    pub class: i32,
    pub cptr: i64,
}

impl NodePtr {
    /// The "no node" sentinel.
    pub const NONE: NodePtr = NodePtr { class: 0, cptr: -1 };

    pub fn new(class: i32, cptr: i64) -> Self {
        NodePtr { class, cptr }
    }
}

/// Index into the arrow directory. Pointer `0` doubles as the "no arrow"
/// sentinel carried by seed links in path construction; traversal skips it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct ArrowPtr(pub i32);

impl ArrowPtr {
    pub const NONE: ArrowPtr = ArrowPtr(0);
}

// ─────────────────────────────────────────────
// Links and nodes
// ─────────────────────────────────────────────

/// A directed, typed, weighted, contextualized half-edge stored on the
/// source node's adjacency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub arr: ArrowPtr,
    pub wgt: f64,
    pub ctx: Vec<String>,
    pub dst: NodePtr,
}

impl Link {
    pub fn new(arr: ArrowPtr, wgt: f64, ctx: Vec<String>, dst: NodePtr) -> Self {
        Link { arr, wgt, ctx, dst }
    }

    /// Seed link used as the starting element of a path: no arrow, unit
    /// weight, pointing at the start node.
    pub fn seed(dst: NodePtr) -> Self {
        Link {
            arr: ArrowPtr::NONE,
            wgt: 1.0,
            ctx: Vec::new(),
            dst,
        }
    }
}

/// A graph node: its text payload, the chapter multiset it occurs in, its
/// own pointer, and seven adjacency buckets indexed by shifted st-type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub len: usize,
    pub text: String,
    pub chap: String,
    pub nptr: NodePtr,
    pub links: [Vec<Link>; ST_TOP],
}

impl Node {
    /// Build a node from its text, deriving length and size class. The
    /// slot index stays unassigned until the directory allocates one.
    pub fn new(text: &str, chap: &str) -> Self {
        let (len, class) = storage_class(text);
        Node {
            len,
            text: text.to_string(),
            chap: chap.to_string(),
            nptr: NodePtr { class, cptr: -1 },
            links: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// The adjacency bucket for a signed st-type.
    pub fn bucket(&self, sttype: i32) -> Result<&[Link], GraphError> {
        Ok(&self.links[st_type_to_index(sttype)?])
    }
}

/// Normalized edge record used for query indexing. One row per half-edge;
/// a logical edge contributes a `(+k, -k)` pair of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeArrowNode {
    pub nfrom: NodePtr,
    pub sttype: i32,
    pub arr: ArrowPtr,
    pub wgt: f64,
    pub ctx: Vec<String>,
    pub nto: NodePtr,
}

/// A recorded narrative trace: one source line of a chapter together with
/// the link path it generated. Read back in line order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageMap {
    pub chapter: String,
    pub alias: String,
    pub context: Vec<String>,
    pub line: i32,
    pub path: Vec<Link>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_class_counts_spaces_first() {
        assert_eq!(storage_class("alpha"), (5, N1GRAM));
        assert_eq!(storage_class("alpha beta"), (10, N2GRAM));
        assert_eq!(storage_class("alpha beta gamma"), (16, N3GRAM));
    }

    #[test]
    fn storage_class_length_boundaries() {
        let s127 = "a b c ".to_string() + &"x".repeat(121);
        assert_eq!(s127.len(), 127);
        assert_eq!(storage_class(&s127).1, LT128);

        let s128 = "a b c ".to_string() + &"x".repeat(122);
        assert_eq!(storage_class(&s128).1, LT1024);

        let s1024 = "a b c ".to_string() + &"x".repeat(1018);
        assert_eq!(storage_class(&s1024).1, GT1024);
    }

    #[test]
    fn storage_class_ngram_ignores_length() {
        // no spaces => 1-gram lane even for a long token
        let long_token = "x".repeat(300);
        assert_eq!(storage_class(&long_token).1, N1GRAM);
    }

    #[test]
    fn st_index_round_trip() {
        for sttype in -EXPRESS..=EXPRESS {
            let idx = st_type_to_index(sttype).unwrap();
            assert_eq!(st_index_to_type(idx), sttype);
        }
    }

    #[test]
    fn st_index_rejects_out_of_bounds() {
        assert!(matches!(
            st_type_to_index(4),
            Err(GraphError::OutOfBoundsStType(4))
        ));
        assert!(matches!(
            st_type_to_index(-4),
            Err(GraphError::OutOfBoundsStType(-4))
        ));
    }

    #[test]
    fn st_type_names_are_signed() {
        assert_eq!(st_type_name(1), "+leads to");
        assert_eq!(st_type_name(-2), "-contained by");
        assert_eq!(st_type_name(0), "=similarity");
    }

    #[test]
    fn seed_link_has_no_arrow() {
        let seed = Link::seed(NodePtr::new(4, 1));
        assert_eq!(seed.arr, ArrowPtr::NONE);
        assert_eq!(seed.dst, NodePtr::new(4, 1));
        assert!(seed.ctx.is_empty());
    }

    #[test]
    fn no_node_sentinel() {
        assert_eq!(NodePtr::NONE, NodePtr { class: 0, cptr: -1 });
    }
}
