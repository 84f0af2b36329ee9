//! Walks the massif log engine through one full lifecycle: open the
//! first massif, append a handful of leaves carrying side-trie data,
//! seal it with a signed checkpoint, verify the checkpoint against the
//! massif bytes, commit it through the object-store contract, and
//! mirror it into a second store via the replicator.
//!
//! No argument parsing, just a readable walkthrough printed to the
//! terminal.

use std::net::Ipv4Addr;

use ed25519_dalek::SigningKey;
use ipnet::Ipv4Net;
use rand_core::OsRng;

use massif_id::{derive_worker_id, IdGenerator};
use massif_log::bloom::BloomConfig;
use massif_log::checkpoint::{self, CheckpointPayload};
use massif_log::commit::{self, CommitMode};
use massif_log::replicator;
use massif_log::trie::{trie_key, IndexFields};
use massif_log::{MassifConfig, MassifContext};
use massif_storage::{MemObjectStore, ObjectKind, ObjectStore};

const LOG_ID: &[u8] = b"tutorial-log";

fn main() {
    let config = MassifConfig {
        height: 4,
        bloom: BloomConfig::default(),
    };
    let mut massif = MassifContext::create_first(config);

    let cidr: Ipv4Net = "10.0.0.0/24".parse().expect("valid cidr literal");
    let pod_ip: Ipv4Addr = "10.0.0.7".parse().expect("valid ip literal");
    let worker = derive_worker_id(cidr, pod_ip).expect("pod ip falls inside the cidr");
    let ids = IdGenerator::new(worker, 0).expect("generator constructs at the unix epoch");

    for payload in ["alpha", "bravo", "charlie", "delta"] {
        let leaf = massif_mmr::sha256(payload.as_bytes());
        let key = trie_key(0, LOG_ID, payload.as_bytes());
        let fields = IndexFields {
            key: Some(key),
            ..Default::default()
        };
        let id_timestamp = ids.next_id().expect("plenty of spin budget for four leaves").value;
        let size = massif
            .append_leaf(leaf, id_timestamp, fields)
            .expect("massif has room for four leaves at height 4");
        println!("appended {payload:?}, mmr size now {size}");
    }

    // Seal the massif with a signed peak-list checkpoint.
    let signing_key = SigningKey::generate(&mut OsRng);
    let payload = CheckpointPayload {
        mmr_size: massif.global_size(),
        timestamp_ms: 1,
        id_timestamp: massif.last_id_timestamp(),
        commitment_epoch: 0,
        version: checkpoint::VERSION_PEAK_LIST,
        legacy_root: None,
    };
    let peaks = massif.full_peaks().expect("massif is self-consistent");
    let seal = checkpoint::sign(payload, &peaks, &signing_key)
        .expect("peaks were just recomputed from this massif");
    println!(
        "sealed checkpoint at mmr size {}, signature {}",
        seal.payload.mmr_size,
        hex::encode(seal.signature)
    );

    // Verify the checkpoint directly against the massif's own bytes.
    let source = massif.node_source();
    checkpoint::verify(&seal, &source, None).expect("checkpoint must verify against its own massif");
    println!("checkpoint verified against massif {}", massif.massif_index());

    // Commit the sealed massif to a source store.
    let source_store = MemObjectStore::new();
    commit::commit(&source_store, &massif, CommitMode::Creating).expect("first commit always creates");
    println!("committed massif {} to the source store", massif.massif_index());

    // Replicate it into a fresh sink, verifying the checkpoint along the way.
    let sink_store = MemObjectStore::new();
    let blob = source_store
        .read(ObjectKind::Massif, massif.massif_index())
        .unwrap()
        .expect("just committed this massif")
        .data;
    let outcome = replicator::verify_and_write(&sink_store, massif.massif_index(), &blob, &seal, None)
        .expect("replicated massif must verify against its checkpoint");
    println!("replicated massif {} into sink: {outcome:?}", massif.massif_index());

    println!(
        "sink head is now massif {:?}",
        sink_store.head_index(ObjectKind::Massif).unwrap()
    );
}
