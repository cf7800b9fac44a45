//! Query surface over the persisted graph: name/chapter/context filters,
//! arrow-set containment, paginated context and page-map listings, the
//! table of contents, and incidence histograms over the normalized edge
//! rows.

use std::collections::{BTreeMap, BTreeSet};

use saga_graph::matching::{is_bracketed_list, is_bracketed_term, match_arrows, match_chapter,
    match_context, match_name};
use saga_graph::traversal::{ncc_story_start_nodes, story_start_nodes};
use saga_graph::{
    marshal, st_index_to_type, ArrowDirectory, ArrowPtr, GraphError, NodeArrowNode, NodePtr,
    PageMap,
};

use crate::store::GraphStore;

/// Hits per page for context and page-map listings.
pub const HITS_PER_PAGE: usize = 30;

/// A node pointer qualified by the context and chapter it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QNodePtr {
    pub nptr: NodePtr,
    pub context: String,
    pub chapter: String,
}

/// One source node's distinct destinations under a single arrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrowAppointment {
    pub nfrom: NodePtr,
    pub arr: ArrowPtr,
    pub nto: Vec<NodePtr>,
}

/// One source node's distinct destinations under a single st-type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StTypeAppointment {
    pub nfrom: NodePtr,
    pub sttype: i32,
    pub nto: Vec<NodePtr>,
}

impl GraphStore {
    // ── Vocabulary probes ──────────────────────────────

    /// Distinct chapter strings matching a search term.
    pub fn chapters_matching(&self, term: &str) -> Result<Vec<String>, GraphError> {
        let mut out: BTreeSet<String> = BTreeSet::new();
        for node in self.scan_all_nodes()? {
            if match_chapter(&node.chap, term) {
                out.insert(node.chap);
            }
        }
        Ok(out.into_iter().collect())
    }

    /// Distinct context tokens whose rows match a search term.
    pub fn contexts_matching(&self, term: &str) -> Result<Vec<String>, GraphError> {
        let (_, stripped) = is_bracketed_term(term);
        let user = vec![stripped];

        let mut out: BTreeSet<String> = BTreeSet::new();
        for (_, _, _, record) in self.scan_nan_rows()? {
            if match_context(&record.ctx, &user) {
                out.extend(record.ctx);
            }
        }
        Ok(out.into_iter().collect())
    }

    // ── Node search ────────────────────────────────────

    /// Node pointers whose text matches a name filter, optionally gated
    /// by chapter.
    pub fn node_ptrs_matching_name(
        &self,
        name: &str,
        chapter: &str,
    ) -> Result<Vec<NodePtr>, GraphError> {
        if name.is_empty() || name == "empty" {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for node in self.scan_all_nodes()? {
            if match_name(&node.text, name) && match_chapter(&node.chap, chapter) {
                out.push(node.nptr);
            }
        }
        out.sort();
        Ok(out)
    }

    /// Full four-way filter: name on the node text, chapter on the node,
    /// context and arrow set on the edge rows. Nodes without edges are
    /// judged on an empty sentinel row, so an unconstrained arrow/context
    /// filter still finds them.
    pub fn node_ptrs_matching(
        &self,
        name: &str,
        chapter: &str,
        context: &[String],
        arrows: &[ArrowPtr],
    ) -> Result<Vec<NodePtr>, GraphError> {
        let (_, context) = is_bracketed_list(context);

        let mut out = BTreeSet::new();
        for node in self.scan_all_nodes()? {
            if !match_name(&node.text, name) || !match_chapter(&node.chap, chapter) {
                continue;
            }

            let rows = self.nan_rows_from(node.nptr)?;
            let hit = if rows.is_empty() {
                match_context(&[], &context) && match_arrows(arrows, ArrowPtr::NONE)
            } else {
                rows.iter().any(|(_, arr, _, record)| {
                    match_context(&record.ctx, &context) && match_arrows(arrows, *arr)
                })
            };

            if hit {
                out.insert(node.nptr);
            }
        }
        Ok(out.into_iter().collect())
    }

    /// Normalized edge rows matching chapter/context/arrow filters.
    pub fn node_arrow_nodes_matching(
        &self,
        chapter: &str,
        context: &[String],
        arrows: &[ArrowPtr],
    ) -> Result<Vec<NodeArrowNode>, GraphError> {
        let mut out = Vec::new();
        for (nfrom, arr, nto, record) in self.scan_nan_rows()? {
            if !match_arrows(arrows, arr) || !match_context(&record.ctx, context) {
                continue;
            }
            if !match_chapter(&self.chapter_of(nfrom)?, chapter) {
                continue;
            }
            out.push(NodeArrowNode {
                nfrom,
                sttype: record.sttype,
                arr,
                wgt: record.wgt,
                ctx: record.ctx,
                nto,
            });
        }
        Ok(out)
    }

    fn chapter_of(&self, nptr: NodePtr) -> Result<String, GraphError> {
        Ok(self.get_node(nptr)?.map(|n| n.chap).unwrap_or_default())
    }

    /// Paginated `(node, context, chapter)` listing, ordered by context
    /// then descending pointer. Pages are 1-based.
    pub fn node_contexts_matching(
        &self,
        chapter: &str,
        context: &[String],
        arrows: &[ArrowPtr],
        page: usize,
    ) -> Result<Vec<QNodePtr>, GraphError> {
        let mut distinct: BTreeSet<(String, NodePtr, String)> = BTreeSet::new();

        for (nfrom, arr, _, record) in self.scan_nan_rows()? {
            if !match_arrows(arrows, arr) || !match_context(&record.ctx, context) {
                continue;
            }
            let chap = self.chapter_of(nfrom)?;
            if !match_chapter(&chap, chapter) {
                continue;
            }
            let rendered = if record.ctx.is_empty() {
                "(no context)".to_string()
            } else {
                marshal::format_string_array(&record.ctx)
            };
            distinct.insert((rendered, nfrom, chap));
        }

        let mut rows: Vec<(String, NodePtr, String)> = distinct.into_iter().collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let offset = page.saturating_sub(1) * HITS_PER_PAGE;
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(HITS_PER_PAGE)
            .map(|(context, nptr, chapter)| QNodePtr {
                nptr,
                context,
                chapter,
            })
            .collect())
    }

    /// Chapter → context-token table of contents. Chapter strings are the
    /// one read path that splits the comma-joined multiset.
    pub fn table_of_contents(
        &self,
        chapter: &str,
        context: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>, GraphError> {
        let mut toc: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (nfrom, _, _, record) in self.scan_nan_rows()? {
            if !match_context(&record.ctx, context) {
                continue;
            }
            let chap = self.chapter_of(nfrom)?;
            if !match_chapter(&chap, chapter) {
                continue;
            }
            for part in chap.split(',') {
                let entry = toc.entry(part.to_string()).or_default();
                entry.extend(record.ctx.iter().cloned());
            }
        }

        Ok(toc
            .into_iter()
            .map(|(chap, ctxs)| (chap, ctxs.into_iter().collect()))
            .collect())
    }

    // ── Page map ───────────────────────────────────────

    /// Paginated page-map lines for a chapter/context filter, in line
    /// order.
    pub fn page_maps(
        &self,
        chapter: &str,
        context: &[String],
        page: usize,
    ) -> Result<Vec<PageMap>, GraphError> {
        let mut pages: Vec<PageMap> = self
            .scan_pages()?
            .into_iter()
            .filter(|p| match_chapter(&p.chapter, chapter) && match_context(&p.context, context))
            .collect();
        pages.sort_by_key(|p| p.line);

        let offset = page.saturating_sub(1) * HITS_PER_PAGE;
        Ok(pages.into_iter().skip(offset).take(HITS_PER_PAGE).collect())
    }

    // ── Incidence histograms ───────────────────────────

    /// Edge-row counts grouped by arrow.
    pub fn histogram_by_arrow(&self) -> Result<BTreeMap<ArrowPtr, usize>, GraphError> {
        let mut hist = BTreeMap::new();
        for (_, arr, _, _) in self.scan_nan_rows()? {
            *hist.entry(arr).or_default() += 1;
        }
        Ok(hist)
    }

    /// Edge-row counts grouped by signed st-type.
    pub fn histogram_by_st_type(&self) -> Result<BTreeMap<i32, usize>, GraphError> {
        let mut hist = BTreeMap::new();
        for (_, _, _, record) in self.scan_nan_rows()? {
            *hist.entry(record.sttype).or_default() += 1;
        }
        Ok(hist)
    }

    /// Distinct destinations per arrow, optionally filtered by context.
    pub fn appointments_by_arrow(
        &self,
        context: &[String],
    ) -> Result<BTreeMap<ArrowPtr, Vec<NodePtr>>, GraphError> {
        let mut map: BTreeMap<ArrowPtr, BTreeSet<NodePtr>> = BTreeMap::new();
        for (_, arr, nto, record) in self.scan_nan_rows()? {
            if !match_context(&record.ctx, context) {
                continue;
            }
            map.entry(arr).or_default().insert(nto);
        }
        Ok(map
            .into_iter()
            .map(|(arr, set)| (arr, set.into_iter().collect()))
            .collect())
    }

    /// Distinct destinations per signed st-type.
    pub fn appointments_by_st_type(&self) -> Result<BTreeMap<i32, Vec<NodePtr>>, GraphError> {
        let mut map: BTreeMap<i32, BTreeSet<NodePtr>> = BTreeMap::new();
        for (_, _, nto, record) in self.scan_nan_rows()? {
            map.entry(record.sttype).or_default().insert(nto);
        }
        Ok(map
            .into_iter()
            .map(|(sttype, set)| (sttype, set.into_iter().collect()))
            .collect())
    }

    /// Fan-out groups: source/arrow pairs appointing more than one
    /// destination, ordered by arrow.
    pub fn appointment_nodes_by_arrow(&self) -> Result<Vec<ArrowAppointment>, GraphError> {
        let mut map: BTreeMap<(ArrowPtr, NodePtr), Vec<NodePtr>> = BTreeMap::new();
        for (nfrom, arr, nto, _) in self.scan_nan_rows()? {
            map.entry((arr, nfrom)).or_default().push(nto);
        }
        Ok(map
            .into_iter()
            .filter(|(_, nto)| nto.len() > 1)
            .map(|((arr, nfrom), nto)| ArrowAppointment { nfrom, arr, nto })
            .collect())
    }

    /// Fan-out groups by st-type.
    pub fn appointment_nodes_by_st_type(&self) -> Result<Vec<StTypeAppointment>, GraphError> {
        let mut map: BTreeMap<(i32, NodePtr), Vec<NodePtr>> = BTreeMap::new();
        for (nfrom, _, nto, record) in self.scan_nan_rows()? {
            map.entry((record.sttype, nfrom)).or_default().push(nto);
        }
        Ok(map
            .into_iter()
            .filter(|(_, nto)| nto.len() > 1)
            .map(|((sttype, nfrom), nto)| StTypeAppointment { nfrom, sttype, nto })
            .collect())
    }

    // ── Story starts ───────────────────────────────────

    /// Heads of causal chains for a named arrow: outgoing matches, no
    /// incoming inverse.
    pub fn story_start_ptrs(
        &self,
        arrows: &ArrowDirectory,
        arrow_name: &str,
    ) -> Result<Vec<NodePtr>, GraphError> {
        let arrow = arrows.by_name(arrow_name)?;
        let sttype = st_index_to_type(arrows.by_ptr(arrow)?.st_index);
        story_start_nodes(self, arrow, arrows.inverse_of(arrow), sttype)
    }

    /// Chapter/context filtered story heads.
    pub fn ncc_story_start_ptrs(
        &self,
        arrows: &ArrowDirectory,
        arrow_name: &str,
        chapter: &str,
        context: &[String],
    ) -> Result<Vec<NodePtr>, GraphError> {
        let arrow = arrows.by_name(arrow_name)?;
        let sttype = st_index_to_type(arrows.by_ptr(arrow)?.st_index);
        ncc_story_start_nodes(
            self,
            arrow,
            arrows.inverse_of(arrow),
            sttype,
            chapter,
            context,
        )
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
