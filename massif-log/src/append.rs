//! The MMR append engine: appends a leaf and the interior nodes it
//! induces, consulting the peak stack for ancestors that live in older
//! massifs.

use massif_mmr::{arithmetic, merge, Value};

use crate::error::{Error, Result};
use crate::layout;
use crate::peak_stack::PeakStack;

/// Owns one massif's local MMR log stream and drives leaf appends.
pub struct Appender {
    h: u8,
    massif_index: u32,
    first_node_index: u64,
    stream: Vec<Value>,
    peak_stack: PeakStack,
    leaves_added: u64,
}

impl Appender {
    /// Start a fresh (empty) massif.
    pub fn new(h: u8, massif_index: u32, peak_stack: PeakStack) -> Self {
        Self {
            h,
            massif_index,
            first_node_index: layout::massif_first_node_index(h, massif_index),
            stream: Vec::new(),
            peak_stack,
            leaves_added: 0,
        }
    }

    /// Resume an open massif whose log stream already holds `stream`
    /// nodes and `leaves_added` leaves.
    pub fn resume(
        h: u8,
        massif_index: u32,
        peak_stack: PeakStack,
        stream: Vec<Value>,
        leaves_added: u64,
    ) -> Self {
        Self {
            h,
            massif_index,
            first_node_index: layout::massif_first_node_index(h, massif_index),
            stream,
            peak_stack,
            leaves_added,
        }
    }

    pub fn stream(&self) -> &[Value] {
        &self.stream
    }

    pub fn leaves_added(&self) -> u64 {
        self.leaves_added
    }

    pub fn peak_stack(&self) -> &PeakStack {
        &self.peak_stack
    }

    /// Number of MMR nodes currently in this massif's local stream.
    pub fn local_size(&self) -> u64 {
        self.stream.len() as u64
    }

    pub fn is_complete(&self) -> bool {
        self.local_size() == layout::max_mmr_size(self.massif_index, self.h)
    }

    fn node_at_global(&mut self, pos: u64, next_ancestor: &mut i64) -> Result<Value> {
        if pos >= self.first_node_index {
            let local = (pos - self.first_node_index) as usize;
            self.stream.get(local).copied().ok_or(Error::AncestorStackInvalid)
        } else {
            if *next_ancestor < 0 {
                return Err(Error::AncestorStackUnderfilled);
            }
            let value = self.peak_stack.at(*next_ancestor as usize)?;
            *next_ancestor -= 1;
            Ok(value)
        }
    }

    /// Append leaf `v`. Returns the new local MMR size (node count).
    pub fn append_leaf(&mut self, v: Value) -> Result<u64> {
        let first_leaf = layout::first_leaf_index(self.h, self.massif_index);
        let last_leaf = layout::last_leaf_index(self.h, self.massif_index);
        let next_leaf_global_index = first_leaf + self.leaves_added;
        if next_leaf_global_index > last_leaf {
            return Err(Error::MassifFull);
        }
        let is_last = next_leaf_global_index == last_leaf;

        let mut next_ancestor: i64 = if is_last {
            self.peak_stack.len() as i64 - 1
        } else {
            -1
        };

        let global_size_before = self.first_node_index + self.stream.len() as u64;
        let mut pos = global_size_before;
        self.stream.push(v);
        let mut height = 0u8;
        let mut right = v;
        loop {
            let peak_present = arithmetic::peak_map(global_size_before) & (1u64 << height) != 0;
            if !peak_present {
                break;
            }
            let parent_pos = pos + 1;
            let left_pos = parent_pos - (2u64 << height);
            let left = self.node_at_global(left_pos, &mut next_ancestor)?;
            let parent = merge(&left, &right);
            self.stream.push(parent);
            pos = parent_pos;
            right = parent;
            height += 1;
        }

        self.leaves_added += 1;
        Ok(self.stream.len() as u64)
    }
}
