// Common test utilities for storage integration tests

use drop_core::KvStore;
use drop_storage::{BackendRegistry, StoreConfig};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture that owns a temporary data directory
pub struct StoreFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub registry: BackendRegistry,
}

impl StoreFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            registry: BackendRegistry::default(),
        }
    }

    /// Path of a database file inside the fixture directory
    pub fn db_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Opens a database through the registry with default config
    pub fn open(&self, name: &str) -> Box<dyn KvStore> {
        self.open_with(name, &StoreConfig::default())
    }

    #[allow(dead_code)]
    pub fn open_with(&self, name: &str, config: &StoreConfig) -> Box<dyn KvStore> {
        self.registry
            .open(&self.db_path(name), config)
            .expect("Failed to open store")
    }
}

impl Default for StoreFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Database file names, one per engine
#[allow(dead_code)]
pub const BACKEND_FILES: &[&str] = &["drop.dbm", "drop.tcb"];

/// Drains a store's cursor into (key, value) pairs
#[allow(dead_code)]
pub fn collect_entries(store: &mut dyn KvStore) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut cursor = store.cursor().expect("Failed to create cursor");
    let mut entries = Vec::new();
    let mut more = cursor.first().expect("first() failed");
    while more {
        let key = cursor.key().expect("positioned cursor has a key").to_vec();
        if let Some(value) = cursor.value().expect("value() failed") {
            entries.push((key, value));
        }
        more = cursor.next().expect("next() failed");
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_paths_live_in_temp_dir() {
        let fixture = StoreFixture::new();
        let path = fixture.db_path("drop.dbm");
        assert!(path.starts_with(fixture.temp_dir.path()));
        assert!(fixture.temp_dir.path().is_dir());
    }
}
