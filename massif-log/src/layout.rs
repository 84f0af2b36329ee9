//! Massif sharding and byte-offset arithmetic.
//!
//! Two arithmetic domains are in play and are kept carefully distinct:
//! the *leaf* domain (a massif holds a contiguous, fixed-size range of
//! global leaf indices) and the *MMR node* domain (a massif holds a
//! variable-size range of global MMR node positions, because the last
//! leaf of a massif can induce a "spur" of promotions that reach back
//! into older massifs' peaks and are appended here).

use crate::error::{Error, Result};

/// Bytes in the fixed start header.
pub const START_HEADER_LEN: u64 = 256;
/// Bytes in the Bloom header.
pub const BLOOM_HEADER_LEN: u64 = 32;
/// Number of parallel Bloom filters.
pub const BLOOM_FILTER_COUNT: u64 = 4;
/// Bytes per side-trie record (base or extended region).
pub const TRIE_RECORD_LEN: u64 = 64;
/// Bytes per MMR node / peak-stack entry.
pub const VALUE_LEN: u64 = 32;

/// Number of leaves a massif of height `h` holds when complete: `2^(h-1)`.
pub fn leaf_capacity(h: u8) -> u64 {
    1u64 << (h - 1)
}

/// The base MMR node count of a massif of height `h`, ignoring any spur
/// contribution: `2^h - 1`.
pub fn max_nodes_base(h: u8) -> u64 {
    (1u64 << h) - 1
}

/// The "spur height" induced by massif index `k`'s last leaf: the number
/// of older massifs' peaks it reaches back to merge with.
///
/// Massif indices are treated as leaf indices of a synthetic tree whose
/// leaves are massifs; the spur height of leaf `k` is the
/// number of trailing zero bits of `k + 1`.
pub fn spur_height(massif_index: u32) -> u32 {
    (massif_index as u64 + 1).trailing_zeros()
}

/// `peakStackLen(k)`: the number of entries the peak stack holds when
/// massif `k` begins. Equal to the number of 1-bits of `k`, growing
/// monotonically as `k` increases.
pub fn peak_stack_len(massif_index: u32) -> u32 {
    massif_index.count_ones()
}

/// Total MMR node capacity of massif `k` at height `h`, including its
/// spur contribution: `(2^h - 1) + spur_height(k)`.
pub fn max_mmr_size(massif_index: u32, h: u8) -> u64 {
    max_nodes_base(h) + spur_height(massif_index) as u64
}

/// The global MMR node index at which massif `k`'s log stream begins.
///
/// Closed form `k * 2^h - popcount(k)`, derived from (and verified
/// against) the worked massif first-leaf examples.
pub fn massif_first_node_index(h: u8, massif_index: u32) -> u64 {
    let k = massif_index as u64;
    (k << h) - massif_index.count_ones() as u64
}

/// Inverse of [`massif_first_node_index`]: the massif index whose node
/// range contains `mmr_index`.
pub fn mmr_index_to_massif(h: u8, mmr_index: u64) -> u32 {
    let mut lo: u64 = 0;
    let mut hi: u64 = mmr_index + 1;
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if massif_first_node_index(h, mid as u32) <= mmr_index {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo as u32
}

/// The global leaf index of massif `k`'s first leaf: `k * leafCapacity(h)`.
pub fn first_leaf_index(h: u8, massif_index: u32) -> u64 {
    massif_index as u64 * leaf_capacity(h)
}

/// The global leaf index of massif `k`'s last leaf.
pub fn last_leaf_index(h: u8, massif_index: u32) -> u64 {
    first_leaf_index(h, massif_index) + leaf_capacity(h) - 1
}

/// Total bits of a single Bloom filter: `bitsPerElement * leafCapacity(h)`.
pub fn bloom_m(bits_per_element: u32, h: u8) -> u64 {
    bits_per_element as u64 * leaf_capacity(h)
}

/// Bytes for one Bloom filter's bitset: `ceil(m / 8)`.
pub fn bloom_bitset_bytes(m: u64) -> u64 {
    m.div_ceil(8)
}

/// Bytes for all four Bloom bitsets.
pub fn bloom_region_len(bits_per_element: u32, h: u8) -> u64 {
    BLOOM_FILTER_COUNT * bloom_bitset_bytes(bloom_m(bits_per_element, h))
}

/// Bytes for one side-trie region (base or extended), `leafCapacity(h) * 64`.
pub fn side_trie_region_len(h: u8) -> u64 {
    leaf_capacity(h) * TRIE_RECORD_LEN
}

/// The fully-resolved byte layout of a massif blob of height `h`, given
/// its Bloom tuning and the length of its inherited peak stack.
#[derive(Debug, Clone, Copy)]
pub struct MassifLayout {
    pub height: u8,
    pub bits_per_element: u32,
    pub peak_stack_len: u32,
}

impl MassifLayout {
    pub fn new(height: u8, bits_per_element: u32, peak_stack_len: u32) -> Self {
        Self {
            height,
            bits_per_element,
            peak_stack_len,
        }
    }

    /// Offset of the index header (256).
    pub fn index_header_offset(&self) -> u64 {
        START_HEADER_LEN
    }

    /// Offset of the Bloom bitsets (288).
    pub fn bloom_offset(&self) -> u64 {
        self.index_header_offset() + BLOOM_HEADER_LEN
    }

    /// Offset of the side-trie base records.
    pub fn side_trie_base_offset(&self) -> u64 {
        self.bloom_offset() + bloom_region_len(self.bits_per_element, self.height)
    }

    /// Offset of the side-trie extended records.
    pub fn side_trie_ext_offset(&self) -> u64 {
        self.side_trie_base_offset() + side_trie_region_len(self.height)
    }

    /// Offset of the inherited peak stack.
    pub fn peak_stack_offset(&self) -> u64 {
        self.side_trie_ext_offset() + side_trie_region_len(self.height)
    }

    /// Offset at which the MMR log stream begins.
    pub fn log_offset(&self) -> u64 {
        self.peak_stack_offset() + self.peak_stack_len as u64 * VALUE_LEN
    }

    /// Total length of a complete, spur-free massif blob at this layout's
    /// height, i.e. for the base `2^h - 1` node count. Massifs whose index has a
    /// nonzero spur height hold `spur_height(massif_index)` additional
    /// nodes past this; use [`Self::complete_len_for`] for the exact
    /// figure.
    pub fn complete_len(&self) -> u64 {
        self.log_offset() + max_nodes_base(self.height) * VALUE_LEN
    }

    /// Exact total length of a complete massif blob, accounting for the
    /// spur nodes massif `massif_index`'s last leaf induces.
    pub fn complete_len_for(&self, massif_index: u32) -> u64 {
        self.log_offset() + max_mmr_size(massif_index, self.height) * VALUE_LEN
    }

    /// The number of MMR nodes currently present, given the blob's total
    /// byte length.
    pub fn node_count(&self, blob_len: usize) -> Result<u64> {
        let log_offset = self.log_offset();
        if (blob_len as u64) < log_offset {
            return Err(Error::MassifDataLengthInvalid(blob_len, log_offset as usize));
        }
        Ok((blob_len as u64 - log_offset) / VALUE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_capacity_and_base_nodes() {
        assert_eq!(leaf_capacity(3), 4);
        assert_eq!(max_nodes_base(3), 7);
    }

    #[test]
    fn peak_stack_len_matches_scenario_4() {
        // h = 2, successive stacks before starting massifs 1..8 have
        // lengths 1,1,2,1,2,2,3,1.
        let expected = [1, 1, 2, 1, 2, 2, 3, 1];
        for (k, &len) in (1..=8u32).zip(expected.iter()) {
            assert_eq!(peak_stack_len(k), len, "k={k}");
        }
    }

    #[test]
    fn spur_heights_for_h2_scenario() {
        // Derived from the same worked scenario: rollover after massif k
        // pops spur_height(k) entries before pushing the new top.
        assert_eq!(spur_height(0), 0);
        assert_eq!(spur_height(1), 1);
        assert_eq!(spur_height(2), 0);
        assert_eq!(spur_height(3), 2);
        assert_eq!(spur_height(7), 3);
    }

    #[test]
    fn massif_first_node_index_scenario_3() {
        assert_eq!(massif_first_node_index(3, 1), 7);
        assert_eq!(massif_first_node_index(3, 2), 15);
        assert_eq!(massif_first_node_index(3, 3), 22);
    }

    #[test]
    fn mmr_index_to_massif_scenario_2() {
        assert_eq!(mmr_index_to_massif(3, 15), 2);
        assert_eq!(mmr_index_to_massif(3, 14), 1);
        assert_eq!(mmr_index_to_massif(14, 999_418), 60);
    }

    #[test]
    fn leaf_domain_is_simple_contiguous_blocks() {
        assert_eq!(first_leaf_index(3, 0), 0);
        assert_eq!(last_leaf_index(3, 0), 3);
        assert_eq!(first_leaf_index(3, 1), 4);
        assert_eq!(last_leaf_index(3, 1), 7);
    }

    #[test]
    fn node_count_rejects_short_blob() {
        let layout = MassifLayout::new(3, 10, 0);
        let err = layout.node_count(10).unwrap_err();
        assert!(matches!(err, Error::MassifDataLengthInvalid(10, _)));
    }

    #[test]
    fn node_count_counts_whole_nodes_past_log_offset() {
        let layout = MassifLayout::new(3, 10, 0);
        let log_offset = layout.log_offset() as usize;
        assert_eq!(layout.node_count(log_offset + 64).unwrap(), 2);
    }
}
