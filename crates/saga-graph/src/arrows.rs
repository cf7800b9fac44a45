//! Global arrow registry: name ↔ integer pointer ↔ signed st-type, with
//! inverse pairing. Populated once from the vocabulary configuration (or
//! downloaded from the store) and read-only afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::matching::similar_string;
use crate::model::{ArrowPtr, CONTAINS, EXPRESS, LEADS_TO, NEAR, ST_ZERO};

/// One registered arrow. `st_index` is the signed st-type shifted by
/// `ST_ZERO`, i.e. the adjacency bucket this arrow writes into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrow {
    pub st_index: usize,
    pub long: String,
    pub short: String,
    pub ptr: ArrowPtr,
}

/// Encode a bucket index from a base relation name and a polarity sign.
pub fn st_index_by_name(st_name: &str, polarity: &str) -> Result<usize, GraphError> {
    let sign: i32 = match polarity {
        "+" => 1,
        "-" => -1,
        other => {
            return Err(GraphError::UnknownArrow(format!(
                "bad polarity {other:?} for {st_name}"
            )))
        }
    };

    let kind = match st_name {
        "leadsto" => LEADS_TO,
        "contains" => CONTAINS,
        "properties" => EXPRESS,
        "similarity" => NEAR,
        other => return Err(GraphError::UnknownArrow(other.to_string())),
    };

    Ok((ST_ZERO + kind * sign) as usize)
}

#[derive(Debug, Default)]
pub struct ArrowDirectory {
    arrows: Vec<Arrow>,
    by_short: HashMap<String, ArrowPtr>,
    by_long: HashMap<String, ArrowPtr>,
    inverses: HashMap<ArrowPtr, ArrowPtr>,
}

impl ArrowDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an arrow and assign it the next pointer. Both the short
    /// alias and the long name become lookup keys.
    pub fn insert(
        &mut self,
        st_name: &str,
        alias: &str,
        long: &str,
        polarity: &str,
    ) -> Result<ArrowPtr, GraphError> {
        let st_index = st_index_by_name(st_name, polarity)?;
        let ptr = ArrowPtr(self.arrows.len() as i32);

        self.arrows.push(Arrow {
            st_index,
            long: long.to_string(),
            short: alias.to_string(),
            ptr,
        });
        self.by_short.insert(alias.to_string(), ptr);
        self.by_long.insert(long.to_string(), ptr);

        Ok(ptr)
    }

    /// Record an inverse pairing in both directions.
    pub fn declare_inverse(&mut self, fwd: ArrowPtr, bwd: ArrowPtr) {
        self.inverses.insert(fwd, bwd);
        self.inverses.insert(bwd, fwd);
    }

    /// Convenience for vocabulary loading: register a `(+, -)` arrow pair
    /// and its inverse coupling in one call.
    pub fn insert_pair(
        &mut self,
        st_name: &str,
        fwd: (&str, &str),
        bwd: (&str, &str),
    ) -> Result<(ArrowPtr, ArrowPtr), GraphError> {
        let f = self.insert(st_name, fwd.0, fwd.1, "+")?;
        let b = self.insert(st_name, bwd.0, bwd.1, "-")?;
        self.declare_inverse(f, b);
        Ok((f, b))
    }

    pub fn by_ptr(&self, ptr: ArrowPtr) -> Result<&Arrow, GraphError> {
        self.arrows
            .get(ptr.0 as usize)
            .ok_or_else(|| GraphError::UnknownArrow(format!("#{}", ptr.0)))
    }

    /// Look up an arrow by name, short alias first, long name second.
    pub fn by_name(&self, name: &str) -> Result<ArrowPtr, GraphError> {
        self.by_short
            .get(name)
            .or_else(|| self.by_long.get(name))
            .copied()
            .ok_or_else(|| GraphError::UnknownArrow(name.to_string()))
    }

    /// Fuzzy lookup: every arrow whose short or long name is similar to
    /// the search term.
    pub fn matching_name(&self, name: &str) -> Vec<ArrowPtr> {
        self.arrows
            .iter()
            .filter(|a| similar_string(name, &a.long) || similar_string(name, &a.short))
            .map(|a| a.ptr)
            .collect()
    }

    /// The inverse of an arrow. The sentinel (and any unpaired arrow) maps
    /// to the sentinel.
    pub fn inverse_of(&self, ptr: ArrowPtr) -> ArrowPtr {
        self.inverses.get(&ptr).copied().unwrap_or(ArrowPtr::NONE)
    }

    pub fn len(&self) -> usize {
        self.arrows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arrow> {
        self.arrows.iter()
    }

    pub fn inverse_pairs(&self) -> impl Iterator<Item = (ArrowPtr, ArrowPtr)> + '_ {
        self.inverses.iter().map(|(a, b)| (*a, *b))
    }

    /// Reload the directory from persisted records. Pointers must arrive
    /// as the monotonic sequence `0..N-1` or the store and memory have
    /// diverged.
    pub fn restore(
        &mut self,
        arrows: Vec<Arrow>,
        inverses: Vec<(ArrowPtr, ArrowPtr)>,
    ) -> Result<(), GraphError> {
        for arrow in arrows {
            if arrow.ptr.0 as usize != self.arrows.len() {
                return Err(GraphError::ArrowDirectoryMismatch);
            }
            self.by_short.insert(arrow.short.clone(), arrow.ptr);
            self.by_long.insert(arrow.long.clone(), arrow.ptr);
            self.arrows.push(arrow);
        }
        for (plus, minus) in inverses {
            self.inverses.insert(plus, minus);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn st_index_encoding() {
        assert_eq!(st_index_by_name("leadsto", "+").unwrap(), 4);
        assert_eq!(st_index_by_name("leadsto", "-").unwrap(), 2);
        assert_eq!(st_index_by_name("contains", "+").unwrap(), 5);
        assert_eq!(st_index_by_name("contains", "-").unwrap(), 1);
        assert_eq!(st_index_by_name("properties", "+").unwrap(), 6);
        assert_eq!(st_index_by_name("properties", "-").unwrap(), 0);
        assert_eq!(st_index_by_name("similarity", "+").unwrap(), 3);
        assert_eq!(st_index_by_name("similarity", "-").unwrap(), 3);
    }

    #[test]
    fn unknown_st_name_is_an_error() {
        assert!(matches!(
            st_index_by_name("teleports", "+"),
            Err(GraphError::UnknownArrow(_))
        ));
    }

    #[test]
    fn insert_assigns_monotonic_pointers() {
        let mut dir = ArrowDirectory::new();
        let a = dir.insert("similarity", "near", "close to", "+").unwrap();
        let b = dir.insert("leadsto", "then", "leads to", "+").unwrap();
        let c = dir.insert("leadsto", "prior", "comes from", "-").unwrap();
        assert_eq!((a, b, c), (ArrowPtr(0), ArrowPtr(1), ArrowPtr(2)));
    }

    #[test]
    fn lookup_prefers_short_name_then_long() {
        let mut dir = ArrowDirectory::new();
        dir.insert("leadsto", "then", "leads to", "+").unwrap();
        assert_eq!(dir.by_name("then").unwrap(), ArrowPtr(0));
        assert_eq!(dir.by_name("leads to").unwrap(), ArrowPtr(0));
        assert!(matches!(
            dir.by_name("nothing"),
            Err(GraphError::UnknownArrow(_))
        ));
    }

    #[test]
    fn inverse_pairing_is_symmetric() {
        let mut dir = ArrowDirectory::new();
        let (f, b) = dir
            .insert_pair("leadsto", ("then", "leads to"), ("prior", "comes from"))
            .unwrap();
        assert_eq!(dir.inverse_of(f), b);
        assert_eq!(dir.inverse_of(b), f);
        assert_eq!(dir.inverse_of(ArrowPtr::NONE), ArrowPtr::NONE);
    }

    #[test]
    fn restore_rejects_pointer_gaps() {
        let mut dir = ArrowDirectory::new();
        let gapped = vec![Arrow {
            st_index: 4,
            long: "leads to".into(),
            short: "then".into(),
            ptr: ArrowPtr(3),
        }];
        assert!(matches!(
            dir.restore(gapped, vec![]),
            Err(GraphError::ArrowDirectoryMismatch)
        ));
    }

    #[test]
    fn restore_preserves_assigned_pointers() {
        let mut source = ArrowDirectory::new();
        source
            .insert_pair("contains", ("has", "contains"), ("in", "part of"))
            .unwrap();

        let mut reloaded = ArrowDirectory::new();
        reloaded
            .restore(
                source.iter().cloned().collect(),
                source.inverse_pairs().collect(),
            )
            .unwrap();

        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.by_name("has").unwrap(), ArrowPtr(0));
        assert_eq!(reloaded.inverse_of(ArrowPtr(0)), ArrowPtr(1));
    }

    #[test]
    fn matching_name_is_fuzzy() {
        let mut dir = ArrowDirectory::new();
        dir.insert("leadsto", "then", "leads to", "+").unwrap();
        dir.insert("contains", "has", "contains", "+").unwrap();
        let hits = dir.matching_name("lead");
        assert_eq!(hits, vec![ArrowPtr(0)]);
    }
}
