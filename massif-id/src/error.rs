use thiserror::Error;

/// Errors from the id generator and id-timestamp encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The CIDR configuration does not yield a valid worker/sequence bit
    /// split (`sequenceBits` must fall in `[8, 16]`).
    #[error("worker id configuration out of range: {0}")]
    WorkerBitRange(String),
    /// The CAS loop exhausted its spin budget without landing a new id.
    /// Advisory: callers should sleep with jitter and retry.
    #[error("id generator overloaded, backoff and retry")]
    Overloaded,
    /// The host clock configuration is implausible (e.g. system time before
    /// the generator's epoch).
    #[error("clock error: {0}")]
    ClockError(String),
    /// The CAS loop produced a non-monotonic value. This is a fatal
    /// invariant violation, never expected in correct operation.
    #[error("sequence violation: generated id did not exceed the previous id")]
    SequenceViolation,
    /// An id-timestamp byte buffer was shorter than the required 9 bytes.
    #[error("id-timestamp buffer too short: got {0} bytes, need 9")]
    BytesTooShort(usize),
    /// The epoch counter would exceed its single-byte range.
    #[error("epoch counter {0} exceeds u8 range")]
    EpochTooLarge(u64),
}

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;
