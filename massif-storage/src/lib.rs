//! The object-store capability set the massif log engine depends on.
//!
//! This crate defines only the interface plus an in-memory
//! reference implementation. Real filesystem and cloud-blob drivers are
//! external collaborators, out of scope for this crate.

mod contract;
mod error;
mod mem_store;

pub use contract::{ObjectKind, ObjectRead, ObjectStore, Token, WriteMode};
pub use error::{Error, Result};
pub use mem_store::MemObjectStore;
