//! Running the replicator twice over the same range, from a clean sink,
//! must yield byte-equal sink state.

use ed25519_dalek::SigningKey;
use rand_core::OsRng;

use massif_log::bloom::BloomConfig;
use massif_log::checkpoint::{self, Checkpoint, CheckpointPayload};
use massif_log::massif::{MassifConfig, MassifContext};
use massif_log::replicator::{replicate, StepOutcome};
use massif_log::trie::IndexFields;
use massif_mmr::sha256;
use massif_storage::{MemObjectStore, ObjectKind, ObjectStore};

fn leaf(tag: &str) -> massif_mmr::Value {
    sha256(tag.as_bytes())
}

fn sealed_massifs(key: &SigningKey) -> Vec<(MassifContext, Checkpoint)> {
    let config = MassifConfig {
        height: 2,
        bloom: BloomConfig::default(),
    };
    let mut ctx = MassifContext::create_first(config);
    ctx.append_leaf(leaf("l0"), 1, IndexFields::default()).unwrap();
    ctx.append_leaf(leaf("l1"), 2, IndexFields::default()).unwrap();
    assert!(ctx.is_complete());
    let cp0 = seal(&ctx, key);

    let mut next = ctx.rollover().unwrap();
    next.append_leaf(leaf("l2"), 3, IndexFields::default()).unwrap();
    next.append_leaf(leaf("l3"), 4, IndexFields::default()).unwrap();
    assert!(next.is_complete());
    let cp1 = seal(&next, key);

    vec![(ctx, cp0), (next, cp1)]
}

fn seal(ctx: &MassifContext, key: &SigningKey) -> Checkpoint {
    let payload = CheckpointPayload {
        mmr_size: ctx.global_size(),
        timestamp_ms: 1,
        id_timestamp: ctx.last_id_timestamp(),
        commitment_epoch: 0,
        version: checkpoint::VERSION_PEAK_LIST,
        legacy_root: None,
    };
    checkpoint::sign(payload, &ctx.full_peaks().unwrap(), key).unwrap()
}

#[test]
fn replicating_twice_leaves_the_sink_byte_identical() {
    let key = SigningKey::generate(&mut OsRng);
    let massifs = sealed_massifs(&key);
    let blobs: Vec<Vec<u8>> = massifs.iter().map(|(ctx, _)| ctx.to_bytes()).collect();
    let checkpoints: Vec<Checkpoint> = massifs.iter().map(|(_, cp)| cp.clone()).collect();

    let sink = MemObjectStore::new();
    let fetch_blob = |i: u32| Ok(blobs[i as usize].clone());
    let fetch_cp = |i: u32| Ok(checkpoints[i as usize].clone());

    let first = replicate(&sink, 0, 1, fetch_blob, fetch_cp, None).unwrap();
    assert_eq!(first, vec![StepOutcome::Wrote, StepOutcome::Wrote]);

    let snapshot: Vec<Vec<u8>> = (0..=1)
        .map(|i| sink.read(ObjectKind::Massif, i).unwrap().unwrap().data)
        .collect();

    let fetch_blob = |i: u32| Ok(blobs[i as usize].clone());
    let fetch_cp = |i: u32| Ok(checkpoints[i as usize].clone());
    let second = replicate(&sink, 0, 1, fetch_blob, fetch_cp, None).unwrap();
    assert_eq!(second, vec![StepOutcome::AlreadyConsistent]);

    for i in 0..=1u32 {
        let after = sink.read(ObjectKind::Massif, i).unwrap().unwrap().data;
        assert_eq!(after, snapshot[i as usize], "massif {i} bytes changed on replay");
    }
}

#[test]
fn checkpoint_at_a_smaller_size_is_consistent_with_the_grown_massif() {
    let key = SigningKey::generate(&mut OsRng);
    let config = MassifConfig {
        height: 3,
        bloom: BloomConfig::default(),
    };
    let mut ctx = MassifContext::create_first(config);
    ctx.append_leaf(leaf("l0"), 1, IndexFields::default()).unwrap();
    let early_checkpoint = seal(&ctx, &key);

    ctx.append_leaf(leaf("l1"), 2, IndexFields::default()).unwrap();
    ctx.append_leaf(leaf("l2"), 3, IndexFields::default()).unwrap();

    let source = ctx.node_source();
    checkpoint::verify_full(&early_checkpoint, ctx.global_size(), &source, None, None).unwrap();
}
