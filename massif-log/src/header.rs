//! The fixed, bit-exact start header at the front of every massif blob.

use byteorder::{BigEndian, ByteOrder};
use massif_mmr::Value;

use crate::error::{Error, Result};
use crate::layout::START_HEADER_LEN;

const WORD_LEN: usize = 32;

/// The fixed-layout identity/versioning word plus the one specified
/// reserved word (the secondary-index root).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartHeader {
    pub last_id_timestamp: u64,
    pub version: u16,
    pub commitment_epoch: u32,
    pub massif_height: u8,
    pub massif_index: u32,
    /// The finalized secondary-index root. Present (non-zero) only once
    /// the massif is complete; zero while the massif is still open.
    pub secondary_index_root: Value,
}

/// Encode `header` into the first 64 bytes of `out` (the identity word
/// plus the secondary-index-root word); the remaining six reserved words
/// are left untouched by this function and must already be zeroed by the
/// caller (rollover zero-fills the whole start header before calling in).
pub fn encode_start(out: &mut [u8], header: &StartHeader) -> Result<()> {
    if out.len() < START_HEADER_LEN as usize {
        return Err(Error::BadRegionSize);
    }
    let word0 = &mut out[0..WORD_LEN];
    word0.fill(0);
    BigEndian::write_u64(&mut word0[8..16], header.last_id_timestamp);
    BigEndian::write_u16(&mut word0[21..23], header.version);
    BigEndian::write_u32(&mut word0[23..27], header.commitment_epoch);
    word0[27] = header.massif_height;
    BigEndian::write_u32(&mut word0[28..32], header.massif_index);

    out[32..64].copy_from_slice(header.secondary_index_root.as_bytes());
    Ok(())
}

/// Decode a `StartHeader` from `bytes` (at least [`START_HEADER_LEN`]
/// long). `massif_height` is supplied by the caller since it is carried
/// out-of-band in some call sites (e.g. when the caller already knows
/// the configured height and only wants to cross-check it).
pub fn decode_start(bytes: &[u8]) -> Result<StartHeader> {
    if bytes.len() < START_HEADER_LEN as usize {
        return Err(Error::BadRegionSize);
    }
    let word0 = &bytes[0..WORD_LEN];
    let last_id_timestamp = BigEndian::read_u64(&word0[8..16]);
    let version = BigEndian::read_u16(&word0[21..23]);
    let commitment_epoch = BigEndian::read_u32(&word0[23..27]);
    let massif_height = word0[27];
    let massif_index = BigEndian::read_u32(&word0[28..32]);
    let secondary_index_root = Value::from_slice(&bytes[32..64]).ok_or(Error::BadRegionSize)?;
    Ok(StartHeader {
        last_id_timestamp,
        version,
        commitment_epoch,
        massif_height,
        massif_index,
        secondary_index_root,
    })
}
