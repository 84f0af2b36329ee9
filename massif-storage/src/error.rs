use thiserror::Error;

/// Errors from the object-store capability set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// `Put` with `WriteMode::CreateOnly` against an object that already
    /// exists.
    #[error("object already exists")]
    ExistsConflict,
    /// `Put` with `WriteMode::ReplaceToken` whose token did not match the
    /// object's current version.
    #[error("object version changed since the token was read")]
    VersionConflict,
    /// The underlying storage medium failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;
