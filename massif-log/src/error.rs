use thiserror::Error;

/// Every error kind named in the engine's error-handling design.
///
/// Variants are grouped by the same families the design groups them into
/// (input-validation, format, engine-state, crypto/verification,
/// replication, id generator, id-timestamp encoding) even though they all
/// live in one flat enum — callers match on variant, not on family.
#[derive(Debug, Error)]
pub enum Error {
    // -- input validation --------------------------------------------
    #[error("value is not 32 bytes: got {0}")]
    BadValueSize(usize),
    #[error("bloom filter index {0} out of range (must be < 4)")]
    BadFilterIndex(u8),
    #[error("side-trie key is not 32 bytes: got {0}")]
    BadKeySize(usize),
    #[error("at most 3 auxiliary fields are allowed, got {0}")]
    TooManyExtras(usize),
    #[error("auxiliary field {0} is longer than 32 bytes: got {1}")]
    ExtrasTooLarge(usize, usize),
    #[error("index region is too small for the declared sizing")]
    BadRegionSize,

    // -- format ---------------------------------------------------------
    #[error("bloom header magic mismatch")]
    BadMagic,
    #[error("unsupported bloom header version: {0}")]
    BadVersion(u8),
    #[error("unsupported bloom bit-ordering flag: {0}")]
    BadBitOrder(u8),
    #[error("bloom hash-count k must be nonzero")]
    BadK,
    #[error("bloom filter count must be 4, got {0}")]
    BadFilterCount(u8),
    #[error("bloom m must be nonzero and representable in 32 bits")]
    BadM,
    #[error("region is all-zero (uninitialized)")]
    Uninitialized,

    // -- engine state -----------------------------------------------------
    #[error("massif is already at capacity")]
    MassifFull,
    #[error("no leaf has been appended yet")]
    BeforeFirstLeaf,
    #[error("leaf index {0} is out of range for this massif")]
    LeafOutOfRange(u64),
    #[error("mmr index {0} does not belong to massif {1}")]
    IndexNotInMassif(u64, u32),
    #[error("massif blob length {0} is invalid for header length {1}")]
    MassifDataLengthInvalid(usize, usize),
    #[error("ancestor-stack reference out of range")]
    AncestorStackInvalid,
    #[error("ancestor stack exhausted before all promotions completed")]
    AncestorStackUnderfilled,
    #[error("rollover requires the last id-timestamp of the previous blob")]
    MissingPrevBlobLastId,
    #[error("id-timestamp {0} is not strictly greater than the last persisted id {1}")]
    NonMonotonicIdTimestamp(u64, u64),

    // -- crypto / verification --------------------------------------------
    #[error("no checkpoint found for massif {0}")]
    SealNotFound(u32),
    #[error("checkpoint signature verification failed")]
    SealVerifyFailed,
    #[error("consistency proof failed")]
    InconsistentState,
    #[error("checkpointed size {0} precedes the massif's first index {1}")]
    StateSizeBeforeMassifStart(u64, u64),
    #[error("checkpointed size {0} exceeds available data (size {1})")]
    StateSizeExceedsData(u64, u64),
    #[error("checkpoint carries no root to verify against")]
    StateRootMissing,
    #[error("caller-supplied public key does not match the message's key")]
    PubkeyMismatch,

    // -- replication ------------------------------------------------------
    #[error("sink is longer than the verified source state")]
    SourceTruncated,
    #[error("verified source state is inconsistent with the sink's root state")]
    SourceInconsistentRootState,

    // -- id generator -------------------------------------------------------
    #[error("id generator: {0}")]
    IdGenerator(#[from] massif_id::Error),

    // -- id-timestamp encoding / storage / mmr passthrough ------------------
    #[error(transparent)]
    Storage(#[from] massif_storage::Error),
    #[error(transparent)]
    Mmr(#[from] massif_mmr::Error),

    #[error("CBOR encode/decode failed: {0}")]
    Cbor(String),
    #[error("signature encode/decode failed: {0}")]
    Signature(String),
}

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;
