//! Source-to-sink massif mirroring.
//!
//! Walks `[start_massif, end_massif]`, verifying each source massif
//! against its checkpoint before ever writing it to the sink, and
//! refuses to silently overwrite a sink that has diverged from (or
//! outgrown) the verified source.
//!
//! Wire encoding of the checkpoint envelope (COSE_Sign1 or similar) is
//! explicitly out of scope; this module deals only in
//! already-decoded [`Checkpoint`] values, leaving transport and codec
//! concerns to the caller.

use massif_storage::{ObjectKind, ObjectStore};

use crate::accumulator::peaks_at;
use crate::checkpoint::{self, Checkpoint, CheckpointPayload};
use crate::commit::{self, CommitMode};
use crate::error::{Error, Result};
use crate::massif::MassifContext;

/// One step of replication outcome, reported back to the caller for
/// logging/metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The sink had no copy; the source massif was written.
    Wrote,
    /// Sink and source already agree; nothing written.
    AlreadyConsistent,
    /// The sink held a shorter massif; the source extended it in place.
    Extended,
}

fn read_massif(store: &dyn ObjectStore, idx: u32) -> Result<Option<Vec<u8>>> {
    Ok(store.read(ObjectKind::Massif, idx)?.map(|read| read.data))
}

/// Check that `source_ctx`'s bytes genuinely extend `sink_ctx`'s bytes:
/// the accumulator peaks the sink already committed to must still be
/// reproducible, verbatim, from the source's (longer) node stream.
fn verify_extension(sink_ctx: &MassifContext, source_ctx: &MassifContext) -> Result<()> {
    if sink_ctx.massif_index() != source_ctx.massif_index() {
        return Err(Error::SourceInconsistentRootState);
    }
    // Both sides must be the full accumulator (ancestors included) at the
    // sink's size, not `local_peaks()` — an open massif at index `k > 0`
    // holds unconsumed ancestor peaks too, and comparing only local peaks
    // would reject every non-initial massif as inconsistent.
    let sink_peaks = sink_ctx.full_peaks()?;
    let source = source_ctx.node_source();
    let recomputed = peaks_at(sink_ctx.global_size(), &source)?;
    if recomputed != sink_peaks {
        return Err(Error::SourceInconsistentRootState);
    }
    Ok(())
}

/// Verify `checkpoint` for the massif whose bytes are `blob`, then
/// write `blob` to `sink` at `idx`, refusing any write that would
/// silently discard sink data the source cannot account for.
pub fn verify_and_write(
    sink: &dyn ObjectStore,
    idx: u32,
    blob: &[u8],
    checkpoint: &Checkpoint,
    trusted_pubkey: Option<&[u8; 32]>,
) -> Result<StepOutcome> {
    let source_ctx = MassifContext::from_bytes(blob)?;
    debug_assert_eq!(source_ctx.massif_index(), idx, "blob's own header must match its store index");
    let source = source_ctx.node_source();
    checkpoint::verify(checkpoint, &source, trusted_pubkey)?;

    let outcome = match read_massif(sink, idx)? {
        None => {
            commit::commit(sink, &source_ctx, CommitMode::Creating)?;
            StepOutcome::Wrote
        }
        Some(existing) => {
            if existing.len() == blob.len() {
                if existing != blob {
                    return Err(Error::SourceInconsistentRootState);
                }
                StepOutcome::AlreadyConsistent
            } else if existing.len() < blob.len() {
                let sink_ctx = MassifContext::from_bytes(&existing)?;
                verify_extension(&sink_ctx, &source_ctx)?;
                let token = commit::read_token(sink, idx)?.expect("just read this object");
                commit::commit(sink, &source_ctx, CommitMode::Extending(token))?;
                StepOutcome::Extended
            } else {
                return Err(Error::SourceTruncated);
            }
        }
    };
    tracing::debug!(massif_index = idx, outcome = ?outcome, "replicated massif");
    Ok(outcome)
}

/// Walk `[start_massif, end_massif]`, pulling each `(blob, checkpoint)`
/// pair from the supplied closures and mirroring it into `sink` via
/// [`verify_and_write`]. Returns the outcome of each step.
///
/// Adjusts the starting point to the sink's current head when it can
/// serve as a trusted base, so `fetch_source_*`
/// may be called for indices at or below `start_massif` as a result.
pub fn replicate<F, G>(
    sink: &dyn ObjectStore,
    start_massif: u32,
    end_massif: u32,
    mut fetch_source_blob: F,
    mut fetch_source_checkpoint: G,
    trusted_pubkey: Option<&[u8; 32]>,
) -> Result<Vec<StepOutcome>>
where
    F: FnMut(u32) -> Result<Vec<u8>>,
    G: FnMut(u32) -> Result<Checkpoint>,
{
    let sink_head = sink.head_index(ObjectKind::Massif)?;
    let effective_start = match sink_head {
        Some(head) if head + 1 >= start_massif => head,
        _ => start_massif,
    };
    tracing::info!(
        start_massif,
        end_massif,
        effective_start,
        sink_head = ?sink_head,
        "starting replication run"
    );

    let mut outcomes = Vec::new();
    for idx in effective_start..=end_massif {
        let blob = fetch_source_blob(idx)?;
        let checkpoint = fetch_source_checkpoint(idx)?;
        outcomes.push(verify_and_write(sink, idx, &blob, &checkpoint, trusted_pubkey)?);
    }
    Ok(outcomes)
}

/// Re-derive and promote a legacy (V0) checkpoint payload to a V1
/// peak-list payload, by re-deriving peaks and checking them against
/// the stored bagged root.
pub fn promote_legacy_to_peak_list(
    legacy: &CheckpointPayload,
    source: &impl crate::accumulator::NodeSource,
) -> Result<CheckpointPayload> {
    let peaks = peaks_at(legacy.mmr_size, source)?;
    let recomputed_root = massif_mmr::bag_peaks(&peaks).ok_or(Error::StateRootMissing)?;
    let committed = legacy.legacy_root.ok_or(Error::StateRootMissing)?;
    if recomputed_root != committed {
        return Err(Error::InconsistentState);
    }
    Ok(CheckpointPayload {
        mmr_size: legacy.mmr_size,
        timestamp_ms: legacy.timestamp_ms,
        id_timestamp: legacy.id_timestamp,
        commitment_epoch: legacy.commitment_epoch,
        version: checkpoint::VERSION_PEAK_LIST,
        legacy_root: None,
    })
}
