//! The peak stack: inter-massif dependency carrier.
//!
//! Two views are kept: an ordered LIFO view consumed during the last-leaf
//! append of a massif, and an indexed `mmr_index -> stack_position` map
//! built on demand for random reads.

use std::collections::HashMap;

use massif_mmr::Value;

use crate::error::{Error, Result};
use crate::layout;

/// A flat buffer of inherited peaks, in the order they are consumed
/// during the last-leaf append (top of stack is the end of the vec).
#[derive(Debug, Clone, Default)]
pub struct PeakStack {
    entries: Vec<Value>,
}

impl PeakStack {
    pub fn new(entries: Vec<Value>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.entries
    }

    /// The value at `nextAncestor`, counting from the top (index
    /// `len - 1`) down to the bottom (index `0`).
    pub fn at(&self, next_ancestor: usize) -> Result<Value> {
        self.entries
            .get(next_ancestor)
            .copied()
            .ok_or(Error::AncestorStackInvalid)
    }

    /// Derive the rolled-over stack for massif `k + 1`, given massif `k`'s
    /// stack and the final value it produced (its own top node, which may
    /// itself already be a spur-merged node).
    ///
    /// `(old_stack with top pop(k) entries removed) ++ [last_value]`.
    pub fn rollover(&self, massif_index: u32, last_value: Value) -> Self {
        let pop = layout::spur_height(massif_index) as usize;
        let keep = self.entries.len().saturating_sub(pop);
        let mut next = self.entries[..keep].to_vec();
        next.push(last_value);
        Self::new(next)
    }

    /// Build the indexed map `mmr_index -> stack_position`, retaining
    /// only peaks whose height is `>= h - 1`.
    ///
    /// `peaks` must be the (height, mmr_index) pairs of the stack's
    /// entries, oldest (bottom of stack) first, matching `self`'s order.
    pub fn indexed_map(&self, h: u8, peak_positions: &[u64]) -> HashMap<u64, usize> {
        let min_height = h.saturating_sub(1) as u32;
        let mut map = HashMap::new();
        for (position, &mmr_index) in peak_positions.iter().enumerate() {
            if massif_mmr::arithmetic::pos_height_in_tree(mmr_index) >= min_height {
                map.insert(mmr_index, position);
            }
        }
        map
    }
}
