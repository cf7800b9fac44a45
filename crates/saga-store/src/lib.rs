//! # saga-store
//!
//! RocksDB persistence for the saga graph.
//!
//! The store mirrors the in-memory directory: full node records with
//! their seven adjacency buckets, a normalized half-edge table with an
//! `(arrow, st-type)` index, the arrow directory with inverse pairs, and
//! the chapter page map. Upserts are idempotent and every logical edge
//! commits its forward and inverse half together.
//!
//! [`GraphStore`] implements `saga_graph::LinkSource`, so cones, path
//! enumeration and the bidirectional solver run against the persistent
//! tier unchanged.

pub mod query;
pub mod schema;
pub mod store;

pub use query::{ArrowAppointment, QNodePtr, StTypeAppointment, HITS_PER_PAGE};
pub use schema::NanRecord;
pub use store::{GraphStore, StoreConfig};
