//! An in-memory [`ObjectStore`], used by tests and by callers that don't
//! need real persistence (e.g. the replicator's sink in unit tests).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::contract::{ObjectKind, ObjectRead, ObjectStore, Token, WriteMode};
use crate::error::{Error, Result};

#[derive(Default, Clone)]
struct Slot {
    data: Vec<u8>,
    version: u64,
}

/// A `Mutex<HashMap<..>>`-backed object store.
///
/// Each object's token is its monotonically increasing write counter,
/// encoded big-endian. Safe to share across threads via `Arc`.
#[derive(Default)]
pub struct MemObjectStore {
    objects: Mutex<HashMap<(ObjectKind, u32), Slot>>,
}

impl MemObjectStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn token_for(version: u64) -> Token {
    Token(version.to_be_bytes().to_vec())
}

impl ObjectStore for MemObjectStore {
    fn head_index(&self, kind: ObjectKind) -> Result<Option<u32>> {
        let objects = self.objects.lock().expect("lock poisoned");
        Ok(objects
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, idx)| *idx)
            .max())
    }

    fn read(&self, kind: ObjectKind, idx: u32) -> Result<Option<ObjectRead>> {
        let objects = self.objects.lock().expect("lock poisoned");
        Ok(objects.get(&(kind, idx)).map(|slot| ObjectRead {
            data: slot.data.clone(),
            token: token_for(slot.version),
        }))
    }

    fn read_prefix(
        &self,
        kind: ObjectKind,
        idx: u32,
        n: Option<usize>,
    ) -> Result<Option<ObjectRead>> {
        let objects = self.objects.lock().expect("lock poisoned");
        Ok(objects.get(&(kind, idx)).map(|slot| {
            let data = match n {
                Some(n) => slot.data[..n.min(slot.data.len())].to_vec(),
                None => slot.data.clone(),
            };
            ObjectRead {
                data,
                token: token_for(slot.version),
            }
        }))
    }

    fn put(&self, kind: ObjectKind, idx: u32, data: &[u8], mode: WriteMode) -> Result<Token> {
        let mut objects = self.objects.lock().expect("lock poisoned");
        let key = (kind, idx);
        match (&mode, objects.get(&key)) {
            (WriteMode::CreateOnly, Some(_)) => return Err(Error::ExistsConflict),
            (WriteMode::ReplaceToken(token), existing) => {
                let current = existing.map(|s| token_for(s.version));
                if current.as_ref() != Some(token) {
                    return Err(Error::VersionConflict);
                }
            }
            (WriteMode::CreateOnly, None) => {}
        }
        let next_version = objects.get(&key).map_or(0, |s| s.version + 1);
        objects.insert(
            key,
            Slot {
                data: data.to_vec(),
                version: next_version,
            },
        );
        Ok(token_for(next_version))
    }
}
