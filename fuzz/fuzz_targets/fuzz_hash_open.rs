#![no_main]

use drop_core::{CursorIter, KvStore};
use drop_storage::HashStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1_000_000 {
        return;
    }

    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let path = dir.path().join("drop.dbm");
    if std::fs::write(&path, data).is_err() {
        return;
    }

    // Replay, torn-tail truncation and iteration must never panic
    if let Ok(mut store) = HashStore::open(&path) {
        if let Ok(cursor) = store.cursor() {
            for _ in CursorIter::new(cursor) {}
        }
        let _ = store.store(b"after", b"open");
    }
});
