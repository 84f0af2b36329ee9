//! The object-store capability set consumed by the massif log engine.
//!
//! Implementations form a sum type in the source system — in-memory, local
//! filesystem, cloud object store — but the engine depends on nothing more
//! than this trait. Local filesystem and cloud-blob drivers are external
//! collaborators and are not implemented here; only the
//! trait and an in-memory reference implementation live in this crate.

use crate::error::Result;

/// Which kind of object an index refers to.
///
/// The storage path schema mapping `(log_id, idx, kind) -> path` is opaque
/// to the engine; this crate only ever deals in `(kind, idx)`
/// pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A massif blob.
    Massif,
    /// A checkpoint (seal).
    Checkpoint,
}

/// An opaque optimistic-concurrency version token.
///
/// Never interpreted by the engine beyond equality comparison; backends
/// are free to use an ETag, a revision number, a content hash, or anything
/// else that changes exactly when the object's bytes change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(pub Vec<u8>);

/// The condition under which a `put` is allowed to succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// The object must not already exist ("compare-and-create").
    CreateOnly,
    /// The object must currently carry exactly this token
    /// ("compare-and-swap").
    ReplaceToken(Token),
}

/// The bytes and current version token of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRead {
    /// The object's bytes (possibly a prefix, see
    /// [`ObjectStore::read_prefix`]).
    pub data: Vec<u8>,
    /// The object's current version token.
    pub token: Token,
}

/// The capability set the massif engine requires of its backing store:
/// locating the current head, reading a full or prefix-truncated object,
/// and writing under an optimistic-concurrency [`WriteMode`].
pub trait ObjectStore: Send + Sync {
    /// The largest index currently stored for `kind`, or `None` if empty.
    fn head_index(&self, kind: ObjectKind) -> Result<Option<u32>>;

    /// Read the full object at `(kind, idx)`, or `None` if absent.
    fn read(&self, kind: ObjectKind, idx: u32) -> Result<Option<ObjectRead>>;

    /// Read the first `n` bytes of the object at `(kind, idx)` (or all of
    /// it, when `n` is `None`), or `None` if absent.
    ///
    /// Used by the engine to cheaply probe a massif's current length
    /// without pulling the whole log stream.
    fn read_prefix(&self, kind: ObjectKind, idx: u32, n: Option<usize>) -> Result<Option<ObjectRead>>;

    /// Write `data` at `(kind, idx)` under `mode`.
    ///
    /// Returns the new version token on success, or
    /// [`crate::Error::ExistsConflict`] / [`crate::Error::VersionConflict`]
    /// when the condition in `mode` is not met.
    fn put(&self, kind: ObjectKind, idx: u32, data: &[u8], mode: WriteMode) -> Result<Token>;
}
