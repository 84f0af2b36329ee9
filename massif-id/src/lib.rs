//! A lock-free, snowflake-style monotonic id generator.
//!
//! Ids combine a millisecond-since-epoch field, a worker-id field derived
//! from a private IP under a CIDR mask, and a per-millisecond sequence
//! counter. The generator's correctness rests on a single atomic
//! compare-and-swap over a 64-bit state word; it has no suspension points
//! and is safe to share across threads via `Arc`.

mod error;
mod generator;
mod timestamp;
mod worker;

pub use error::{Error, Result};
pub use generator::{IdGenerator, DEFAULT_MAX_SPINS};
pub use timestamp::{id_timestamp_bytes, split_id_timestamp_bytes, IdTimestamp};
pub use worker::{derive_worker_id, WorkerId};
