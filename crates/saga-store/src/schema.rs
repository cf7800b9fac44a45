//! Column-family layout and key encodings.
//!
//! The store mirrors the in-memory shape: full node records (seven
//! adjacency buckets included) keyed by `(class, cptr)`, a per-class
//! exact-text index, the normalized `NodeArrowNode` half-edge table with
//! an `(arrow, st-index)`-ordered secondary index, the arrow directory
//! with its inverse pairs, and the page map keyed by `(chapter, line)`.

use serde::{Deserialize, Serialize};

use saga_graph::{ArrowPtr, NodePtr};

pub const CF_NODES: &str = "nodes";
pub const CF_NODE_TEXT: &str = "node_text";
pub const CF_NAN: &str = "nan";
pub const CF_NAN_ARROW: &str = "nan_by_arrow";
pub const CF_ARROWS: &str = "arrows";
pub const CF_INVERSES: &str = "arrow_inverses";
pub const CF_PAGEMAP: &str = "pagemap";
pub const CF_META: &str = "meta";

pub const ALL_CFS: &[&str] = &[
    CF_NODES,
    CF_NODE_TEXT,
    CF_NAN,
    CF_NAN_ARROW,
    CF_ARROWS,
    CF_INVERSES,
    CF_PAGEMAP,
    CF_META,
];

/// Value half of a `NodeArrowNode` row; source, arrow and destination
/// live in the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NanRecord {
    pub sttype: i32,
    pub wgt: f64,
    pub ctx: Vec<String>,
}

// ─────────────────────────────────────────────
// Key encodings
// ─────────────────────────────────────────────

pub fn node_key(nptr: NodePtr) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = nptr.class as u8;
    key[1..].copy_from_slice(&(nptr.cptr as u64).to_be_bytes());
    key
}

pub fn parse_node_key(key: &[u8]) -> NodePtr {
    let mut cptr = [0u8; 8];
    cptr.copy_from_slice(&key[1..9]);
    NodePtr::new(key[0] as i32, u64::from_be_bytes(cptr) as i64)
}

pub fn text_key(class: i32, text: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + text.len());
    key.push(class as u8);
    key.extend_from_slice(text.as_bytes());
    key
}

pub fn nan_key(nfrom: NodePtr, arr: ArrowPtr, nto: NodePtr) -> Vec<u8> {
    let mut key = Vec::with_capacity(22);
    key.extend_from_slice(&node_key(nfrom));
    key.extend_from_slice(&arr.0.to_be_bytes());
    key.extend_from_slice(&node_key(nto));
    key
}

pub fn parse_nan_key(key: &[u8]) -> (NodePtr, ArrowPtr, NodePtr) {
    let nfrom = parse_node_key(&key[0..9]);
    let mut arr = [0u8; 4];
    arr.copy_from_slice(&key[9..13]);
    let nto = parse_node_key(&key[13..22]);
    (nfrom, ArrowPtr(i32::from_be_bytes(arr)), nto)
}

/// Secondary index mirroring `(Arr, STType)` lookups.
pub fn nan_arrow_key(arr: ArrowPtr, st_index: usize, nfrom: NodePtr, nto: NodePtr) -> Vec<u8> {
    let mut key = Vec::with_capacity(23);
    key.extend_from_slice(&arr.0.to_be_bytes());
    key.push(st_index as u8);
    key.extend_from_slice(&node_key(nfrom));
    key.extend_from_slice(&node_key(nto));
    key
}

pub fn arrow_key(ptr: ArrowPtr) -> [u8; 4] {
    ptr.0.to_be_bytes()
}

pub fn pagemap_key(chapter: &str, line: i32) -> Vec<u8> {
    let mut key = Vec::with_capacity(chapter.len() + 5);
    key.extend_from_slice(chapter.as_bytes());
    key.push(0);
    key.extend_from_slice(&(line as u32).to_be_bytes());
    key
}

pub fn top_key(class: i32) -> Vec<u8> {
    format!("top_{class}").into_bytes()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
