//! A partitioned, append-only Merkle Mountain Range log.
//!
//! The engine is built from small, independently testable pieces that
//! mirror the system's own layering:
//!
//! - [`layout`] — massif sharding and byte-offset arithmetic (including
//!   the "spur" correction for a massif's last-leaf promotions).
//! - [`peak_stack`] — the inter-massif dependency carrier.
//! - [`bloom`] — the 4-way Bloom pre-filter.
//! - [`trie`] — the per-leaf secondary index.
//! - [`header`] — the fixed start header.
//! - [`append`] — the MMR append engine.
//! - [`massif`] — ties the above into one open massif's lifecycle.
//! - [`commit`] — delegates buffer persistence to the object-store
//!   contract under the optimistic-concurrency discipline.
//! - [`accumulator`] — deriving accumulator peak lists from raw nodes.
//! - [`checkpoint`] — signed accumulator snapshots and their verification.
//! - [`replicator`] — source-to-sink massif mirroring.

pub mod accumulator;
pub mod append;
pub mod bloom;
pub mod checkpoint;
pub mod commit;
pub mod error;
pub mod header;
pub mod layout;
pub mod massif;
pub mod peak_stack;
pub mod replicator;
pub mod trie;

pub use error::{Error, Result};
pub use massif::{MassifConfig, MassifContext};
