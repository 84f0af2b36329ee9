use thiserror::Error;

/// Errors from pure MMR position arithmetic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A computed position or index would overflow `u64`.
    #[error("mmr arithmetic overflow at index/position {0}")]
    Overflow(u64),
    /// A position is not a leaf position (height != 0) where a leaf was
    /// required.
    #[error("position {0} is not a leaf position")]
    NotALeaf(u64),
}

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;
