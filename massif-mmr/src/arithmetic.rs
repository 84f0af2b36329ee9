//! Pure MMR position arithmetic.
//!
//! Every function here is a closed-form computation over position/index
//! integers; none of them touch storage.

/// Convert a 0-based leaf index to its MMR position.
///
/// # Panics / overflow
///
/// Overflows when `index >= 2^63 - 1`. Callers must validate indices before
/// calling.
pub fn leaf_index_to_pos(index: u64) -> u64 {
    leaf_index_to_mmr_size(index) - (index + 1).trailing_zeros() as u64 - 1
}

/// Compute the MMR size after inserting `index + 1` leaves.
pub fn leaf_index_to_mmr_size(index: u64) -> u64 {
    let leaves_count = index + 1;
    let peak_count = leaves_count.count_ones() as u64;
    2 * leaves_count - peak_count
}

/// Return the height of the subtree rooted at `pos` in the MMR (0 = leaf).
pub fn pos_height_in_tree(mut pos: u64) -> u8 {
    if pos == 0 {
        return 0;
    }
    let mut peak_size = u64::MAX >> pos.leading_zeros();
    while peak_size > 0 {
        if pos >= peak_size {
            pos -= peak_size;
        }
        peak_size >>= 1;
    }
    pos as u8
}

/// Offset from a node to its parent at the given height.
pub fn parent_offset(height: u8) -> u64 {
    2 << height
}

/// Offset from a node to its sibling at the given height.
pub fn sibling_offset(height: u8) -> u64 {
    (2 << height) - 1
}

/// Bitmap of peak heights for the given `mmr_size` (bit `i` set means there
/// is a peak of height `i`). The numeric value of this bitmap equals the
/// total leaf count.
pub fn peak_map(mmr_size: u64) -> u64 {
    if mmr_size == 0 {
        return 0;
    }
    let mut pos = mmr_size;
    let mut peak_size = u64::MAX >> pos.leading_zeros();
    let mut map = 0u64;
    while peak_size > 0 {
        map <<= 1;
        if pos >= peak_size {
            pos -= peak_size;
            map |= 1;
        }
        peak_size >>= 1;
    }
    map
}

/// The MMR positions of the peaks for the given `mmr_size`, left to right.
pub fn peak_positions(mmr_size: u64) -> Vec<u64> {
    if mmr_size == 0 {
        return vec![];
    }
    let leading_zeros = mmr_size.leading_zeros();
    let mut pos = mmr_size;
    let mut peak_size = u64::MAX >> leading_zeros;
    let mut peaks = Vec::with_capacity(64 - leading_zeros as usize);
    let mut peaks_sum = 0u64;
    while peak_size > 0 {
        if pos >= peak_size {
            pos -= peak_size;
            peaks.push(peaks_sum + peak_size - 1);
            peaks_sum += peak_size;
        }
        peak_size >>= 1;
    }
    peaks
}

/// Derive the leaf count from an `mmr_size`. The peak-map bitmap encodes
/// one bit per peak at height `h`, so its numeric value equals the total
/// leaf count.
pub fn mmr_size_to_leaf_count(mmr_size: u64) -> u64 {
    peak_map(mmr_size)
}
