//! Merkle Mountain Range position arithmetic and peak bagging.
//!
//! This crate is the pure-arithmetic core shared by the massif log engine:
//! it knows how to map leaf indices to MMR positions, how to find the
//! height and peaks of an MMR of a given size, and how to combine node
//! values with SHA-256. It holds no state and does no I/O — every function
//! is a closed-form computation over integers and 32-byte values.
//!
//! # Core types
//!
//! - [`Value`] — the 32-byte value type used for every node, leaf, peak,
//!   and key in the system.
//! - [`merge`] — the SHA-256 node-promotion rule, `H(left || right)`.
//! - [`bag_peaks`] — fold a peak list into a single legacy root.
//!
//! Position arithmetic ([`leaf_index_to_pos`], [`peak_positions`], etc.)
//! lives in the [`arithmetic`] module and is re-exported at the crate root.

pub mod arithmetic;
mod bagging;
mod error;
mod value;

pub use arithmetic::{
    leaf_index_to_mmr_size, leaf_index_to_pos, mmr_size_to_leaf_count, parent_offset, peak_map,
    peak_positions, pos_height_in_tree, sibling_offset,
};
pub use bagging::bag_peaks;
pub use error::{Error, Result};
pub use value::{merge, sha256, Value};
