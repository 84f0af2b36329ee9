//! Committing a massif buffer through the object-store contract.
//!
//! The engine itself never retries I/O or resolves a version conflict by
//! guessing; it only exposes the buffer plus the optimistic-concurrency
//! mode the caller acquired it under, and performs the one check it owns
//! outright: a massif must never be written past its own capacity,
//! checked *before* the store is touched.

use massif_storage::{ObjectKind, ObjectStore, Token, WriteMode};

use crate::error::{Error, Result};
use crate::layout;
use crate::massif::MassifContext;

/// The optimistic-concurrency mode a massif buffer must commit under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitMode {
    /// This massif does not yet exist at the sink; the store must refuse
    /// the write if something is already there ("compare-and-create").
    Creating,
    /// This massif is extending a previously committed blob; the store
    /// must refuse the write if the blob has changed since `token` was
    /// read ("compare-and-swap").
    Extending(Token),
}

/// Commit `ctx`'s current buffer to `store`, at `ctx`'s own massif index,
/// under `mode`.
///
/// Enforces the overflow check that `first_index + count` must not exceed
/// this massif's total node capacity before issuing any write, as a last
/// line of defense alongside the append engine's own
/// [`crate::error::Error::MassifFull`] guard. A caller whose in-memory
/// append was cancelled must discard `ctx` and re-acquire from the store
/// rather than retrying this function with stale state; this function
/// performs no retry loop itself, leaving that to the caller, who alone
/// knows whether to re-read and reapply or give up.
pub fn commit(store: &dyn ObjectStore, ctx: &MassifContext, mode: CommitMode) -> Result<Token> {
    let idx = ctx.massif_index();
    let first_index = layout::massif_first_node_index(ctx.layout().height, idx);
    let capacity = layout::max_mmr_size(idx, ctx.layout().height);
    let global_size = ctx.global_size();
    if global_size > first_index + capacity {
        return Err(Error::MassifDataLengthInvalid(
            global_size as usize,
            (first_index + capacity) as usize,
        ));
    }

    let write_mode = match mode {
        CommitMode::Creating => WriteMode::CreateOnly,
        CommitMode::Extending(token) => WriteMode::ReplaceToken(token),
    };
    let bytes = ctx.to_bytes();
    let token = store.put(ObjectKind::Massif, idx, &bytes, write_mode)?;
    tracing::debug!(massif_index = idx, len = bytes.len(), "committed massif buffer");
    Ok(token)
}

/// Read the current version token for massif `idx`, if it exists — the
/// previously-seen version indicator callers must supply to
/// [`commit`] when extending an existing blob.
pub fn read_token(store: &dyn ObjectStore, idx: u32) -> Result<Option<Token>> {
    Ok(store
        .read_prefix(ObjectKind::Massif, idx, Some(0))?
        .map(|r| r.token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bloom::BloomConfig;
    use crate::massif::MassifConfig;
    use crate::trie::IndexFields;
    use massif_mmr::sha256;
    use massif_storage::MemObjectStore;

    fn leaf(tag: &str) -> massif_mmr::Value {
        sha256(tag.as_bytes())
    }

    #[test]
    fn commits_a_fresh_massif_as_creating_then_rejects_a_duplicate_create() {
        let config = MassifConfig {
            height: 2,
            bloom: BloomConfig::default(),
        };
        let mut ctx = MassifContext::create_first(config);
        ctx.append_leaf(leaf("l0"), 1, IndexFields::default())
            .unwrap();

        let store = MemObjectStore::new();
        commit(&store, &ctx, CommitMode::Creating).unwrap();
        assert!(store.read(ObjectKind::Massif, 0).unwrap().is_some());

        let err = commit(&store, &ctx, CommitMode::Creating).unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(massif_storage::Error::ExistsConflict)
        ));
    }

    #[test]
    fn extends_with_the_read_token_and_rejects_a_stale_one() {
        let config = MassifConfig {
            height: 2,
            bloom: BloomConfig::default(),
        };
        let mut ctx = MassifContext::create_first(config);
        ctx.append_leaf(leaf("l0"), 1, IndexFields::default())
            .unwrap();

        let store = MemObjectStore::new();
        let token = commit(&store, &ctx, CommitMode::Creating).unwrap();

        ctx.append_leaf(leaf("l1"), 2, IndexFields::default())
            .unwrap();
        let stale = Token(vec![99]);
        assert!(matches!(
            commit(&store, &ctx, CommitMode::Extending(stale)).unwrap_err(),
            Error::Storage(massif_storage::Error::VersionConflict)
        ));
        commit(&store, &ctx, CommitMode::Extending(token)).unwrap();
        assert_eq!(
            store.read(ObjectKind::Massif, 0).unwrap().unwrap().data,
            ctx.to_bytes()
        );
    }

    #[test]
    fn read_token_is_none_for_an_uncommitted_massif() {
        let store = MemObjectStore::new();
        assert_eq!(read_token(&store, 0).unwrap(), None);
    }
}
