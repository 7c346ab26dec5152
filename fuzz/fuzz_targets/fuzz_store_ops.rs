#![no_main]

use arbitrary::Arbitrary;
use drop_core::KvStore;
use drop_storage::{BackendRegistry, StoreConfig, SyncMode};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;

#[derive(Arbitrary, Debug)]
enum StoreOp {
    TryInsert { key: Vec<u8>, value: Vec<u8> },
    Store { key: Vec<u8>, value: Vec<u8> },
    Fetch { key: Vec<u8> },
    Delete { key: Vec<u8> },
    Reopen,
}

#[derive(Arbitrary, Debug)]
struct Input {
    btree: bool,
    ops: Vec<StoreOp>,
}

fuzz_target!(|input: Input| {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let name = if input.btree { "drop.tcb" } else { "drop.dbm" };
    let path = dir.path().join(name);
    let registry = BackendRegistry::default();
    let config = StoreConfig {
        sync_mode: SyncMode::None,
        ..Default::default()
    };

    let Ok(mut store) = registry.open(&path, &config) else {
        return;
    };
    // Model of what the store should hold
    let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

    for op in input.ops.iter().take(100) {
        match op {
            StoreOp::TryInsert { key, value } => {
                if let Ok(inserted) = store.try_insert(key, value) {
                    assert_eq!(inserted, !model.contains_key(key));
                    model.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
            StoreOp::Store { key, value } => {
                if store.store(key, value).is_ok() {
                    model.insert(key.clone(), value.clone());
                }
            }
            StoreOp::Fetch { key } => {
                if let Ok(found) = store.fetch(key) {
                    assert_eq!(found.as_ref(), model.get(key));
                }
            }
            StoreOp::Delete { key } => {
                if let Ok(deleted) = store.delete(key) {
                    assert_eq!(deleted, model.remove(key).is_some());
                }
            }
            StoreOp::Reopen => {
                if store.close().is_err() {
                    return;
                }
                store = match registry.open(&path, &config) {
                    Ok(store) => store,
                    Err(_) => return,
                };
            }
        }
    }

    assert_eq!(store.len(), model.len());
});
