//! The persistent graph store.
//!
//! Every logical edge is written as a pair of half-edges (forward on the
//! source, inverse on the destination) inside a single write batch, so
//! the persisted relation always matches the in-memory one. Upserts are
//! idempotent: repeated inserts of the same node or edge are absorbed,
//! with contexts unioned on collision.

use std::path::PathBuf;

use dashmap::DashMap;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};

use saga_graph::arrows::Arrow;
use saga_graph::{
    merge_contexts, merge_links, st_index_to_type, st_type_to_index, storage_class,
    ArrowDirectory, ArrowPtr, GraphError, Link, LinkSource, Node, NodeDirectory, NodePtr,
    PageMap, SEQUENCE_TOKEN,
};

use crate::schema::*;

pub(crate) fn storage_err(e: impl std::fmt::Display) -> GraphError {
    GraphError::Storage(e.to_string())
}

pub(crate) fn codec_err(e: impl std::fmt::Display) -> GraphError {
    GraphError::Serialization(e.to_string())
}

/// Store location and the explicit, destructive wipe flag. Absent tables
/// are created on open; nothing is dropped unless `wipe` is set.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub wipe: bool,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            path: path.into(),
            wipe: false,
        }
    }
}

pub struct GraphStore {
    db: DB,
    /// Write-through hydration hint; correctness never depends on it.
    cache: DashMap<NodePtr, Node>,
}

impl GraphStore {
    // ── Open / init ────────────────────────────────────

    pub fn open(config: &StoreConfig) -> Result<Self, GraphError> {
        if config.wipe && config.path.exists() {
            tracing::info!("wiping store at {}", config.path.display());
            DB::destroy(&Options::default(), &config.path).map_err(storage_err)?;
        }

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descs: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descs).map_err(storage_err)?;

        Ok(GraphStore {
            db,
            cache: DashMap::new(),
        })
    }

    // ── Node operations ────────────────────────────────

    fn read_node(&self, nptr: NodePtr) -> Result<Option<Node>, GraphError> {
        let cf = self.db.cf_handle(CF_NODES).unwrap();
        match self.db.get_cf(&cf, node_key(nptr)).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(codec_err)?)),
            None => Ok(None),
        }
    }

    fn write_node(&self, node: &Node) -> Result<(), GraphError> {
        let cf = self.db.cf_handle(CF_NODES).unwrap();
        let bytes = bincode::serialize(node).map_err(codec_err)?;
        self.db
            .put_cf(&cf, node_key(node.nptr), bytes)
            .map_err(storage_err)?;
        self.cache.remove(&node.nptr);
        Ok(())
    }

    /// Hydrating node read. Hits the hint cache first and writes through
    /// on a store read.
    pub fn get_node(&self, nptr: NodePtr) -> Result<Option<Node>, GraphError> {
        if let Some(node) = self.cache.get(&nptr) {
            return Ok(Some(node.clone()));
        }
        match self.read_node(nptr)? {
            Some(node) => {
                self.cache.insert(nptr, node.clone());
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// Exact-text lookup within one size class.
    pub fn node_ptr_by_text(&self, text: &str) -> Result<Option<NodePtr>, GraphError> {
        let (_, class) = storage_class(text);
        Ok(self
            .text_lookup(class, text)?
            .map(|cptr| NodePtr::new(class, cptr)))
    }

    fn text_lookup(&self, class: i32, text: &str) -> Result<Option<i64>, GraphError> {
        let cf = self.db.cf_handle(CF_NODE_TEXT).unwrap();
        match self
            .db
            .get_cf(&cf, text_key(class, text))
            .map_err(storage_err)?
        {
            Some(bytes) => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[..8]);
                Ok(Some(u64::from_be_bytes(buf) as i64))
            }
            None => Ok(None),
        }
    }

    fn lane_top(&self, class: i32) -> Result<i64, GraphError> {
        let cf = self.db.cf_handle(CF_META).unwrap();
        match self.db.get_cf(&cf, top_key(class)).map_err(storage_err)? {
            Some(bytes) => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[..8]);
                Ok(u64::from_be_bytes(buf) as i64)
            }
            None => Ok(0),
        }
    }

    /// Idempotent node upsert. A known text returns its stable pointer
    /// (merging the chapter tag); an unknown text gets the next slot in
    /// its class lane.
    pub fn idemp_append_node(&self, text: &str, chap: &str) -> Result<NodePtr, GraphError> {
        let (_, class) = storage_class(text);

        if let Some(cptr) = self.text_lookup(class, text)? {
            let nptr = NodePtr::new(class, cptr);
            if let Some(mut node) = self.read_node(nptr)? {
                if !node.chap.contains(chap) {
                    node.chap = format!("{},{}", node.chap, chap);
                    self.write_node(&node)?;
                }
            }
            tracing::debug!("idemp_append_node: existing ({class},{cptr})");
            return Ok(nptr);
        }

        let cptr = self.lane_top(class)?;
        let mut node = Node::new(text, chap);
        node.nptr = NodePtr::new(class, cptr);

        let mut batch = WriteBatch::default();
        self.stage_new_node(&mut batch, &node)?;
        self.db.write(batch).map_err(storage_err)?;

        Ok(node.nptr)
    }

    fn stage_new_node(&self, batch: &mut WriteBatch, node: &Node) -> Result<(), GraphError> {
        let nodes = self.db.cf_handle(CF_NODES).unwrap();
        let texts = self.db.cf_handle(CF_NODE_TEXT).unwrap();
        let meta = self.db.cf_handle(CF_META).unwrap();

        let bytes = bincode::serialize(node).map_err(codec_err)?;
        batch.put_cf(&nodes, node_key(node.nptr), bytes);
        batch.put_cf(
            &texts,
            text_key(node.nptr.class, &node.text),
            (node.nptr.cptr as u64).to_be_bytes(),
        );

        let top = self.lane_top(node.nptr.class)?.max(node.nptr.cptr + 1);
        batch.put_cf(&meta, top_key(node.nptr.class), (top as u64).to_be_bytes());
        Ok(())
    }

    // ── Edge operations ────────────────────────────────

    /// Idempotent edge upsert: rejects self-loops and unregistered
    /// arrows, then writes the forward half-edge, the mirrored inverse
    /// half-edge and both normalized edge rows in one batch.
    pub fn idemp_add_edge(
        &self,
        src: NodePtr,
        mut link: Link,
        dst: NodePtr,
        arrows: &ArrowDirectory,
    ) -> Result<(), GraphError> {
        link.dst = dst;

        if src == dst {
            return Err(GraphError::SelfLoop(self.text(src)?));
        }

        let arrow = arrows.by_ptr(link.arr)?;
        let sttype = st_index_to_type(arrow.st_index);

        let inverse = Link {
            arr: arrows.inverse_of(link.arr),
            wgt: link.wgt,
            ctx: Vec::new(),
            dst: src,
        };

        let mut batch = WriteBatch::default();
        self.stage_half_edge(&mut batch, src, &link, sttype)?;
        self.stage_nan(&mut batch, src, sttype, &link)?;
        self.stage_half_edge(&mut batch, dst, &inverse, -sttype)?;
        self.stage_nan(&mut batch, dst, -sttype, &inverse)?;
        self.db.write(batch).map_err(storage_err)?;

        self.cache.remove(&src);
        self.cache.remove(&dst);
        Ok(())
    }

    /// Merge one half-edge into a node's bucket inside the batch. A
    /// missing anchor node is a silent no-op, matching additive upserts.
    fn stage_half_edge(
        &self,
        batch: &mut WriteBatch,
        nptr: NodePtr,
        link: &Link,
        sttype: i32,
    ) -> Result<(), GraphError> {
        let idx = st_type_to_index(sttype)?;

        let Some(mut node) = self.read_node(nptr)? else {
            tracing::debug!("no node at ({},{}), half-edge skipped", nptr.class, nptr.cptr);
            return Ok(());
        };

        merge_links(&mut node.links[idx], link.clone());

        let cf = self.db.cf_handle(CF_NODES).unwrap();
        let bytes = bincode::serialize(&node).map_err(codec_err)?;
        batch.put_cf(&cf, node_key(nptr), bytes);
        Ok(())
    }

    /// Upsert one `NodeArrowNode` row plus its `(arrow, st-index)` index
    /// entry. Duplicates are absorbed with a context union.
    fn stage_nan(
        &self,
        batch: &mut WriteBatch,
        nfrom: NodePtr,
        sttype: i32,
        link: &Link,
    ) -> Result<(), GraphError> {
        let cf = self.db.cf_handle(CF_NAN).unwrap();
        let key = nan_key(nfrom, link.arr, link.dst);

        let record = match self.db.get_cf(&cf, &key).map_err(storage_err)? {
            Some(bytes) => {
                let mut existing: NanRecord = bincode::deserialize(&bytes).map_err(codec_err)?;
                let merged = merge_contexts(&existing.ctx, &link.ctx);
                if merged == existing.ctx {
                    tracing::debug!("duplicate edge row absorbed");
                    return Ok(());
                }
                existing.ctx = merged;
                existing
            }
            None => NanRecord {
                sttype,
                wgt: link.wgt,
                ctx: link
                    .ctx
                    .iter()
                    .filter(|c| c.as_str() != SEQUENCE_TOKEN)
                    .cloned()
                    .collect(),
            },
        };

        batch.put_cf(&cf, &key, bincode::serialize(&record).map_err(codec_err)?);

        let idx_cf = self.db.cf_handle(CF_NAN_ARROW).unwrap();
        let st_index = st_type_to_index(sttype)?;
        batch.put_cf(&idx_cf, nan_arrow_key(link.arr, st_index, nfrom, link.dst), []);
        Ok(())
    }

    // ── Arrow directory ────────────────────────────────

    pub fn upload_arrows(&self, arrows: &ArrowDirectory) -> Result<(), GraphError> {
        let cf = self.db.cf_handle(CF_ARROWS).unwrap();
        let inv = self.db.cf_handle(CF_INVERSES).unwrap();

        let mut batch = WriteBatch::default();
        for arrow in arrows.iter() {
            batch.put_cf(
                &cf,
                arrow_key(arrow.ptr),
                bincode::serialize(arrow).map_err(codec_err)?,
            );
        }
        for (plus, minus) in arrows.inverse_pairs() {
            batch.put_cf(&inv, arrow_key(plus), minus.0.to_be_bytes());
        }
        self.db.write(batch).map_err(storage_err)?;

        tracing::info!("stored {} arrows", arrows.len());
        Ok(())
    }

    /// Reload the arrow directory. Keys iterate in pointer order, so the
    /// directory's monotonicity check catches any drift between store and
    /// memory.
    pub fn download_arrows(&self, arrows: &mut ArrowDirectory) -> Result<(), GraphError> {
        let cf = self.db.cf_handle(CF_ARROWS).unwrap();
        let mut list: Vec<Arrow> = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(storage_err)?;
            list.push(bincode::deserialize(&value).map_err(codec_err)?);
        }

        let inv = self.db.cf_handle(CF_INVERSES).unwrap();
        let mut inverses = Vec::new();
        for item in self.db.iterator_cf(&inv, IteratorMode::Start) {
            let (key, value) = item.map_err(storage_err)?;
            let mut plus = [0u8; 4];
            plus.copy_from_slice(&key[..4]);
            let mut minus = [0u8; 4];
            minus.copy_from_slice(&value[..4]);
            inverses.push((
                ArrowPtr(i32::from_be_bytes(plus)),
                ArrowPtr(i32::from_be_bytes(minus)),
            ));
        }

        tracing::info!(
            "loaded {} arrows and {} inverse pairs",
            list.len(),
            inverses.len()
        );
        arrows.restore(list, inverses)
    }

    // ── Page map ───────────────────────────────────────

    pub fn upsert_page(&self, page: &PageMap) -> Result<(), GraphError> {
        let cf = self.db.cf_handle(CF_PAGEMAP).unwrap();
        self.db
            .put_cf(
                &cf,
                pagemap_key(&page.chapter, page.line),
                bincode::serialize(page).map_err(codec_err)?,
            )
            .map_err(storage_err)
    }

    /// Bulk sync of an ingested graph: node records with their buckets,
    /// normalized edge rows, the arrow directory and the page map. Slot
    /// indices assigned in memory are preserved verbatim.
    pub fn upload_graph(
        &self,
        dir: &NodeDirectory,
        arrows: &ArrowDirectory,
        pages: &[PageMap],
    ) -> Result<(), GraphError> {
        tracing::info!("storing {} nodes", dir.node_count());

        for node in dir.iter() {
            self.insert_node_record(node)?;

            let mut batch = WriteBatch::default();
            for (st_index, bucket) in node.links.iter().enumerate() {
                let sttype = st_index_to_type(st_index);
                for link in bucket {
                    self.stage_nan(&mut batch, node.nptr, sttype, link)?;
                }
            }
            self.db.write(batch).map_err(storage_err)?;
        }

        self.upload_arrows(arrows)?;

        tracing::info!("storing page map ({} lines)", pages.len());
        for page in pages {
            self.upsert_page(page)?;
        }

        Ok(())
    }

    /// Insert a full node record under its in-memory pointer, or merge
    /// chapter and buckets into the already-stored record.
    fn insert_node_record(&self, node: &Node) -> Result<(), GraphError> {
        match self.text_lookup(node.nptr.class, &node.text)? {
            None => {
                let mut batch = WriteBatch::default();
                self.stage_new_node(&mut batch, node)?;
                self.db.write(batch).map_err(storage_err)?;
                Ok(())
            }
            Some(cptr) => {
                let nptr = NodePtr::new(node.nptr.class, cptr);
                let Some(mut stored) = self.read_node(nptr)? else {
                    return Ok(());
                };
                if !stored.chap.contains(&node.chap) {
                    stored.chap = format!("{},{}", stored.chap, node.chap);
                }
                for (idx, bucket) in node.links.iter().enumerate() {
                    for link in bucket {
                        merge_links(&mut stored.links[idx], link.clone());
                    }
                }
                self.write_node(&stored)
            }
        }
    }

    // ── Scans / counts ─────────────────────────────────

    pub fn scan_all_nodes(&self) -> Result<Vec<Node>, GraphError> {
        let cf = self.db.cf_handle(CF_NODES).unwrap();
        let mut nodes = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(storage_err)?;
            nodes.push(bincode::deserialize(&value).map_err(codec_err)?);
        }
        Ok(nodes)
    }

    pub(crate) fn scan_pages(&self) -> Result<Vec<PageMap>, GraphError> {
        let cf = self.db.cf_handle(CF_PAGEMAP).unwrap();
        let mut pages = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(storage_err)?;
            pages.push(bincode::deserialize(&value).map_err(codec_err)?);
        }
        Ok(pages)
    }

    /// All normalized half-edge rows originating at one node.
    pub(crate) fn nan_rows_from(
        &self,
        nfrom: NodePtr,
    ) -> Result<Vec<(NodePtr, ArrowPtr, NodePtr, NanRecord)>, GraphError> {
        let cf = self.db.cf_handle(CF_NAN).unwrap();
        let prefix = node_key(nfrom);
        let mut rows = Vec::new();

        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(storage_err)?;
            if !key.starts_with(&prefix) {
                break;
            }
            let (from, arr, to) = parse_nan_key(&key);
            rows.push((from, arr, to, bincode::deserialize(&value).map_err(codec_err)?));
        }
        Ok(rows)
    }

    pub(crate) fn scan_nan_rows(
        &self,
    ) -> Result<Vec<(NodePtr, ArrowPtr, NodePtr, NanRecord)>, GraphError> {
        let cf = self.db.cf_handle(CF_NAN).unwrap();
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item.map_err(storage_err)?;
            let (from, arr, to) = parse_nan_key(&key);
            rows.push((from, arr, to, bincode::deserialize(&value).map_err(codec_err)?));
        }
        Ok(rows)
    }

    pub fn node_count(&self) -> Result<usize, GraphError> {
        let cf = self.db.cf_handle(CF_NODES).unwrap();
        let mut count = 0;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item.map_err(storage_err)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn edge_count(&self) -> Result<usize, GraphError> {
        Ok(self.scan_nan_rows()?.len())
    }
}

// ─────────────────────────────────────────────
// LinkSource: traversal runs unchanged on the store
// ─────────────────────────────────────────────

impl LinkSource for GraphStore {
    fn typed_links(&self, nptr: NodePtr, sttype: i32) -> Result<Vec<Link>, GraphError> {
        let idx = st_type_to_index(sttype)?;
        Ok(self
            .get_node(nptr)?
            .map(|n| n.links[idx].clone())
            .unwrap_or_default())
    }

    fn chapter(&self, nptr: NodePtr) -> Result<String, GraphError> {
        Ok(self.get_node(nptr)?.map(|n| n.chap).unwrap_or_default())
    }

    fn text(&self, nptr: NodePtr) -> Result<String, GraphError> {
        Ok(self.get_node(nptr)?.map(|n| n.text).unwrap_or_default())
    }

    fn scan_nodes(&self) -> Result<Vec<Node>, GraphError> {
        self.scan_all_nodes()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
