//! The lock-free snowflake id generator.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::timestamp::IdTimestamp;
use crate::worker::WorkerId;

/// Default bound on CAS retry spins before reporting [`Error::Overloaded`].
pub const DEFAULT_MAX_SPINS: u32 = 100;

/// A lock-free, monotonic 64-bit id generator.
///
/// Layout of the 64-bit id: top 40 bits are milliseconds since
/// `epoch_ms`, the low 24 bits are `worker_id << sequence_bits | sequence`.
/// `worker_id` and `sequence_bits` come from [`WorkerId`]; the generator
/// itself only manages the time/sequence CAS loop.
///
/// Time is read from [`Instant`] (monotonic, immune to wall-clock
/// adjustments) offset by a wall-clock baseline captured once at
/// construction, so a backwards clock jump never reverses issued ids.
pub struct IdGenerator {
    epoch_ms: u64,
    worker_id: u64,
    sequence_bits: u8,
    sequence_mask: u64,
    max_spins: u32,
    start_instant: Instant,
    start_wall_offset_ms: u64,
    /// Holds `(time_ms << 24) | sequence`; the worker-id bits are OR-ed in
    /// only at the moment an id is returned to the caller.
    monotonic: AtomicU64,
    epoch_counter: AtomicU8,
}

const TIME_SHIFT: u32 = 24;
/// The time field is 40 bits wide (64 - [`TIME_SHIFT`]).
const TIME_FIELD_LIMIT: u64 = 1u64 << (64 - TIME_SHIFT);

impl IdGenerator {
    /// Construct a generator for the given worker identity.
    ///
    /// `epoch_ms` is the reference epoch (milliseconds since the Unix
    /// epoch) that the 40-bit time field counts from.
    pub fn new(worker: WorkerId, epoch_ms: u64) -> Result<Self> {
        Self::with_max_spins(worker, epoch_ms, DEFAULT_MAX_SPINS)
    }

    /// As [`IdGenerator::new`], with an explicit CAS spin bound.
    pub fn with_max_spins(worker: WorkerId, epoch_ms: u64, max_spins: u32) -> Result<Self> {
        let wall_now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::ClockError("system clock before the Unix epoch".into()))?
            .as_millis() as u64;
        if wall_now_ms < epoch_ms {
            return Err(Error::ClockError(format!(
                "system time {wall_now_ms}ms is before configured epoch {epoch_ms}ms"
            )));
        }

        let sequence_mask = (1u64 << worker.sequence_bits) - 1;
        let worker_id = worker.id << worker.sequence_bits;
        if worker_id & sequence_mask != 0 {
            return Err(Error::WorkerBitRange(
                "worker id overlaps the sequence bit range".into(),
            ));
        }

        Ok(IdGenerator {
            epoch_ms,
            worker_id,
            sequence_bits: worker.sequence_bits,
            sequence_mask,
            max_spins,
            start_instant: Instant::now(),
            start_wall_offset_ms: wall_now_ms - epoch_ms,
            monotonic: AtomicU64::new(0),
            epoch_counter: AtomicU8::new(0),
        })
    }

    fn now_ms(&self) -> u64 {
        self.start_wall_offset_ms + self.start_instant.elapsed().as_millis() as u64
    }

    /// Generate the next id.
    ///
    /// Retries a bounded CAS loop; returns [`Error::Overloaded`] if
    /// contention exhausts the spin budget — an advisory error, callers
    /// should sleep with jitter and retry.
    pub fn next_id(&self) -> Result<IdTimestamp> {
        for _ in 0..self.max_spins {
            let now = self.now_ms();
            if now >= TIME_FIELD_LIMIT {
                // 40-bit time field would already have overflowed; bump
                // the epoch counter so the external (epoch, value) pair
                // stays unique beyond what 40 bits of milliseconds can
                // encode. Never happens for any realistic epoch_ms/uptime
                // combination.
                return self.advance_epoch();
            }

            let last = self.monotonic.load(Ordering::SeqCst);
            let last_time = last >> TIME_SHIFT;
            let last_seq = last & self.sequence_mask;

            let next = if now > last_time {
                now << TIME_SHIFT
            } else if last_seq == self.sequence_mask {
                (last_time + 1) << TIME_SHIFT
            } else {
                last + 1
            };

            if next <= last {
                return Err(Error::SequenceViolation);
            }

            if self
                .monotonic
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                let epoch = self.epoch_counter.load(Ordering::SeqCst);
                return Ok(IdTimestamp::new(next | self.worker_id, epoch));
            }
        }
        tracing::warn!(max_spins = self.max_spins, "id generator exhausted its CAS spin budget");
        Err(Error::Overloaded)
    }

    fn advance_epoch(&self) -> Result<IdTimestamp> {
        let prev = self.epoch_counter.fetch_add(1, Ordering::SeqCst);
        if prev == u8::MAX {
            return Err(Error::EpochTooLarge(prev as u64 + 1));
        }
        // The time field restarts relative to the new epoch's window.
        self.monotonic.store(0, Ordering::SeqCst);
        let epoch = prev + 1;
        let next = 1u64 << TIME_SHIFT;
        self.monotonic.store(next, Ordering::SeqCst);
        tracing::debug!(epoch, "id generator's 40-bit time field wrapped, advancing epoch counter");
        Ok(IdTimestamp::new(next | self.worker_id, epoch))
    }
}
