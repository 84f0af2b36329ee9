//! The side-trie: one deterministic record per leaf.

use byteorder::{BigEndian, ByteOrder};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::layout::TRIE_RECORD_LEN;

const KEY_OFFSET: usize = 0;
const AUX0_OFFSET: usize = 32;
const TIMESTAMP_OFFSET: usize = 56;
const AUX1_OFFSET: usize = 0;
const AUX2_OFFSET: usize = 32;

/// `SHA-256(domain_byte || log_id || app_id)`, so the same `app_id`
/// produces distinct keys in distinct logs.
pub fn trie_key(domain: u8, log_id: &[u8], app_id: &[u8]) -> [u8; 32] {
    let mut input = Vec::with_capacity(1 + log_id.len() + app_id.len());
    input.push(domain);
    input.extend_from_slice(log_id);
    input.extend_from_slice(app_id);
    let out = Sha256::digest(&input);
    let mut key = [0u8; 32];
    key.copy_from_slice(&out);
    key
}

/// Auxiliary fields to write for a single leaf. `None` leaves the
/// corresponding bytes untouched — `SetIndexFields` is a pure write, per
/// the contract decision recorded for this implementation.
#[derive(Debug, Clone, Default)]
pub struct IndexFields {
    pub key: Option<[u8; 32]>,
    pub id_timestamp: Option<u64>,
    pub aux0: Option<Vec<u8>>,
    pub aux1: Option<Vec<u8>>,
    pub aux2: Option<Vec<u8>>,
}

fn validate(fields: &IndexFields) -> Result<()> {
    // Only three auxiliary slots exist (aux0, aux1, aux2), so the
    // at-most-3 rule is structural rather than something to count here.
    let extras = [&fields.aux0, &fields.aux1, &fields.aux2];
    for (idx, aux) in extras.iter().enumerate() {
        if let Some(bytes) = aux {
            if bytes.len() > 32 {
                return Err(Error::ExtrasTooLarge(idx, bytes.len()));
            }
        }
    }
    Ok(())
}

fn base_record_range(leaf_local_index: u64) -> std::ops::Range<usize> {
    let start = leaf_local_index as usize * TRIE_RECORD_LEN as usize;
    start..start + TRIE_RECORD_LEN as usize
}

/// Write the provided fields for `leaf_local_index` into the base and
/// extended regions. Fields left as `None` preserve their current bytes.
pub fn set_index_fields(
    base: &mut [u8],
    ext: &mut [u8],
    leaf_local_index: u64,
    fields: &IndexFields,
) -> Result<()> {
    validate(fields)?;
    let range = base_record_range(leaf_local_index);
    if range.end > base.len() || range.end > ext.len() {
        return Err(Error::LeafOutOfRange(leaf_local_index));
    }
    let base_record = &mut base[range.clone()];
    if let Some(key) = fields.key {
        base_record[KEY_OFFSET..KEY_OFFSET + 32].copy_from_slice(&key);
    }
    if let Some(aux0) = &fields.aux0 {
        if aux0.len() > 24 {
            return Err(Error::ExtrasTooLarge(0, aux0.len()));
        }
        base_record[AUX0_OFFSET..AUX0_OFFSET + aux0.len()].copy_from_slice(aux0);
    }
    if let Some(ts) = fields.id_timestamp {
        BigEndian::write_u64(&mut base_record[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 8], ts);
    }
    let ext_record = &mut ext[range];
    if let Some(aux1) = &fields.aux1 {
        ext_record[AUX1_OFFSET..AUX1_OFFSET + aux1.len()].copy_from_slice(aux1);
    }
    if let Some(aux2) = &fields.aux2 {
        ext_record[AUX2_OFFSET..AUX2_OFFSET + aux2.len()].copy_from_slice(aux2);
    }
    Ok(())
}

pub fn get_trie_key(base: &[u8], leaf_local_index: u64) -> Result<[u8; 32]> {
    let range = base_record_range(leaf_local_index);
    if range.end > base.len() {
        return Err(Error::LeafOutOfRange(leaf_local_index));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&base[range][KEY_OFFSET..KEY_OFFSET + 32]);
    Ok(key)
}

pub fn get_id_timestamp(base: &[u8], leaf_local_index: u64) -> Result<u64> {
    let range = base_record_range(leaf_local_index);
    if range.end > base.len() {
        return Err(Error::LeafOutOfRange(leaf_local_index));
    }
    let record = &base[range];
    Ok(BigEndian::read_u64(
        &record[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 8],
    ))
}

pub fn get_extra(base: &[u8], ext: &[u8], leaf_local_index: u64) -> Result<[Vec<u8>; 3]> {
    let range = base_record_range(leaf_local_index);
    if range.end > base.len() || range.end > ext.len() {
        return Err(Error::LeafOutOfRange(leaf_local_index));
    }
    let base_record = &base[range.clone()];
    let ext_record = &ext[range];
    Ok([
        base_record[AUX0_OFFSET..AUX0_OFFSET + 24].to_vec(),
        ext_record[AUX1_OFFSET..AUX1_OFFSET + 32].to_vec(),
        ext_record[AUX2_OFFSET..AUX2_OFFSET + 32].to_vec(),
    ])
}
