//! File format versions for the drop engines
//!
//! Each engine stamps its files with a magic number and a format version
//! so a file written by one engine is never misread by the other.

/// Hash-table log format version
pub const HASH_FORMAT_VERSION: u16 = 1;

/// Sorted table format version
pub const BTREE_FORMAT_VERSION: u16 = 1;

/// Magic numbers for file validation
pub mod magic {
    /// Hash-table log magic: "DRHT" (DRop Hash Table)
    pub const HASH: u32 = 0x4452_4854;

    /// Sorted table magic: "DRBT" (DRop B-Tree)
    pub const BTREE: u32 = 0x4452_4254;
}

/// Version compatibility information
pub struct FormatVersion {
    /// Current version of this format
    pub current: u16,
    /// Minimum supported version for reading
    pub min_read: u16,
}

impl FormatVersion {
    /// Check if a version can be read
    pub fn can_read(&self, version: u16) -> bool {
        version >= self.min_read && version <= self.current
    }
}

/// Hash-table log format version info
pub fn hash_version() -> FormatVersion {
    FormatVersion {
        current: HASH_FORMAT_VERSION,
        min_read: 1,
    }
}

/// Sorted table format version info
pub fn btree_version() -> FormatVersion {
    FormatVersion {
        current: BTREE_FORMAT_VERSION,
        min_read: 1,
    }
}
