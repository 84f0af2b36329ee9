//! The 4-way Bloom pre-filter.
//!
//! A probabilistic "definitely not present / maybe present" check over
//! 32-byte elements, operating directly on a byte region owned by the
//! caller (the massif's index region). Never a proof of exclusion.

use byteorder::{BigEndian, ByteOrder};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::layout;

const MAGIC: &[u8; 4] = b"BLM1";
const VERSION: u8 = 1;
const BIT_ORDER_LSB0: u8 = 0;

/// Tuning parameters for a Bloom pre-filter.
#[derive(Debug, Clone, Copy)]
pub struct BloomConfig {
    pub bits_per_element: u32,
    /// Hash positions per element. The default tuning pairs
    /// `bits_per_element = 10` with `k = 7` (`round(ln 2 * 10)`).
    pub k: u8,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            bits_per_element: 10,
            k: 7,
        }
    }
}

/// A view over a Bloom pre-filter's 32-byte header plus four bitsets,
/// backed by a caller-owned byte slice (typically a massif's index
/// region).
pub struct BloomHeader<'a> {
    header: &'a [u8],
}

impl<'a> BloomHeader<'a> {
    pub fn parse(header: &'a [u8]) -> Result<Self> {
        if header.len() < layout::BLOOM_HEADER_LEN as usize {
            return Err(Error::BadRegionSize);
        }
        if header.iter().all(|&b| b == 0) {
            return Err(Error::Uninitialized);
        }
        if &header[0..4] != MAGIC {
            return Err(Error::BadMagic);
        }
        if header[4] != VERSION {
            return Err(Error::BadVersion(header[4]));
        }
        if header[5] != BIT_ORDER_LSB0 {
            return Err(Error::BadBitOrder(header[5]));
        }
        if header[6] == 0 {
            return Err(Error::BadK);
        }
        if header[7] != layout::BLOOM_FILTER_COUNT as u8 {
            return Err(Error::BadFilterCount(header[7]));
        }
        let m = BigEndian::read_u32(&header[8..12]);
        if m == 0 {
            return Err(Error::BadM);
        }
        Ok(Self { header })
    }

    pub fn k(&self) -> u8 {
        self.header[6]
    }

    pub fn m(&self) -> u32 {
        BigEndian::read_u32(&self.header[8..12])
    }

    pub fn n_inserted(&self) -> u32 {
        BigEndian::read_u32(&self.header[12..16])
    }
}

/// Write a freshly-initialized 32-byte Bloom header into `header`.
pub fn init_header(header: &mut [u8], config: BloomConfig, h: u8) -> Result<()> {
    if header.len() < layout::BLOOM_HEADER_LEN as usize {
        return Err(Error::BadRegionSize);
    }
    if layout::leaf_capacity(h) == 0 || config.bits_per_element == 0 || config.k == 0 {
        return Err(Error::BadM);
    }
    let m = layout::bloom_m(config.bits_per_element, h);
    if m == 0 || m > u32::MAX as u64 {
        return Err(Error::BadM);
    }
    header[..32].fill(0);
    header[0..4].copy_from_slice(MAGIC);
    header[4] = VERSION;
    header[5] = BIT_ORDER_LSB0;
    header[6] = config.k;
    header[7] = layout::BLOOM_FILTER_COUNT as u8;
    BigEndian::write_u32(&mut header[8..12], m as u32);
    // n_inserted (bytes 12..16) and padding (16..32) stay zero.
    Ok(())
}

fn check_region(region: &[u8], filter_idx: u8, m: u32) -> Result<()> {
    if filter_idx >= layout::BLOOM_FILTER_COUNT as u8 {
        return Err(Error::BadFilterIndex(filter_idx));
    }
    let needed = layout::BLOOM_HEADER_LEN as usize
        + layout::bloom_bitset_bytes(m as u64) as usize * layout::BLOOM_FILTER_COUNT as usize;
    if region.len() < needed {
        return Err(Error::BadRegionSize);
    }
    Ok(())
}

/// Positions (within one filter's `m`-bit space) that element `e` hashes
/// to, for filter `filter_idx`.
fn positions(filter_idx: u8, e: &[u8; 32], k: u8, m: u32) -> Vec<u32> {
    let mut input = Vec::with_capacity(34);
    input.push(0xB0);
    input.push(filter_idx);
    input.extend_from_slice(e);
    let sum = Sha256::digest(&input);
    let h1 = BigEndian::read_u64(&sum[0..8]);
    let mut h2 = BigEndian::read_u64(&sum[8..16]);
    if h2 == 0 {
        h2 = 1;
    }
    (0..k as u64)
        .map(|i| (h1.wrapping_add(i.wrapping_mul(h2)) % m as u64) as u32)
        .collect()
}

fn bitset_slice(region: &[u8], filter_idx: u8, bitset_bytes: usize) -> std::ops::Range<usize> {
    let start = layout::BLOOM_HEADER_LEN as usize + filter_idx as usize * bitset_bytes;
    start..start + bitset_bytes
}

/// Insert `e` into filter `filter_idx` within `region` (the full index
/// region: header + four bitsets), bumping the best-effort counter.
pub fn insert(region: &mut [u8], filter_idx: u8, e: &[u8; 32]) -> Result<()> {
    let (k, m) = {
        let header = BloomHeader::parse(&region[..layout::BLOOM_HEADER_LEN as usize])?;
        (header.k(), header.m())
    };
    check_region(region, filter_idx, m)?;
    let bitset_bytes = layout::bloom_bitset_bytes(m as u64) as usize;
    let range = bitset_slice(region, filter_idx, bitset_bytes);
    let bitset = &mut region[range];
    for pos in positions(filter_idx, e, k, m) {
        let byte = (pos >> 3) as usize;
        let bit = pos & 7;
        bitset[byte] |= 1 << bit;
    }
    let n = BigEndian::read_u32(&region[12..16]);
    BigEndian::write_u32(&mut region[12..16], n.wrapping_add(1));
    Ok(())
}

/// Report whether `e` might be present in filter `filter_idx`.
pub fn maybe_contains(region: &[u8], filter_idx: u8, e: &[u8; 32]) -> Result<bool> {
    let header = BloomHeader::parse(&region[..layout::BLOOM_HEADER_LEN as usize])?;
    let (k, m) = (header.k(), header.m());
    check_region(region, filter_idx, m)?;
    let bitset_bytes = layout::bloom_bitset_bytes(m as u64) as usize;
    let range = bitset_slice(region, filter_idx, bitset_bytes);
    let bitset = &region[range];
    Ok(positions(filter_idx, e, k, m).into_iter().all(|pos| {
        let byte = (pos >> 3) as usize;
        let bit = pos & 7;
        bitset[byte] & (1 << bit) != 0
    }))
}
