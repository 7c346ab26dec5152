//! Hash engine - append-only record log with an in-memory bucket index
//!
//! ## File Format
//!
//! ```text
//! +--------------------------------------+
//! | magic "DRHT" (u32) | version (u16) | 0 |  <- 8-byte header
//! +--------------------------------------+
//! | record | record | record | ...        |  <- framed PUT / DELETE records
//! +--------------------------------------+
//! ```
//!
//! Every mutation appends one record. Opening the file replays the log
//! into a [`BucketTable`] that remembers where each key's latest value
//! lives; values stay on disk and are read back on demand.
//!
//! Overwritten and deleted records become dead space. [`HashStore::reorganize`]
//! rewrites the live records into a fresh file, and `close()` does so on
//! its own once dead space outweighs live data.
//!
//! Exclusive access is held through a `<db>.lock` sidecar for the life
//! of the store, so it survives `reorganize` renaming a new log into place.

pub mod table;

use crate::file::{self, StoreLock};
use crate::record::{Record, RecordPayload, FRAME_OVERHEAD};
use crate::{StoreConfig, SyncMode};
use drop_core::format_version::{hash_version, magic};
use drop_core::{
    validate_key, validate_value, CursorState, Error, ErrorCode, KvStore, Result, StoreCursor,
};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use table::{BucketTable, Slot};

/// Size of the file header
pub const HEADER_LEN: u64 = 8;

/// Suffix of the temporary file written by `reorganize`
const REORG_SUFFIX: &str = ".reorg";

fn encode_header() -> [u8; HEADER_LEN as usize] {
    let mut header = [0u8; HEADER_LEN as usize];
    header[..4].copy_from_slice(&magic::HASH.to_le_bytes());
    header[4..6].copy_from_slice(&hash_version().current.to_le_bytes());
    header
}

fn check_header(header: &[u8; HEADER_LEN as usize]) -> Result<()> {
    let found = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    if found != magic::HASH {
        return Err(Error::Corruption("Not a drop hash database".into()));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if !hash_version().can_read(version) {
        return Err(Error::Corruption(format!(
            "Unsupported hash format version {}",
            version
        )));
    }
    Ok(())
}

/// Result of replaying a log file
struct Replay {
    table: BucketTable,
    end: u64,
    dead_bytes: u64,
    torn: bool,
}

/// Hash-table store backed by an append-only log file
pub struct HashStore {
    path: PathBuf,
    file: File,
    _lock: Option<StoreLock>,
    config: StoreConfig,
    table: BucketTable,
    /// Offset where the next record is appended
    end: u64,
    /// Bytes held by overwritten or deleted records
    dead_bytes: u64,
    last_error: ErrorCode,
}

impl HashStore {
    /// Open or create a hash store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Open or create a hash store with custom configuration
    pub fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock = if config.lock {
            Some(StoreLock::acquire(&path)?)
        } else {
            None
        };
        let mut file = file::open_rw(&path)?;

        let file_len = file.metadata()?.len();
        let replay = if file_len == 0 {
            file.write_all(&encode_header())?;
            file.sync_all()?;
            Replay {
                table: BucketTable::with_buckets(config.initial_buckets),
                end: HEADER_LEN,
                dead_bytes: 0,
                torn: false,
            }
        } else {
            Self::replay(&file, file_len, config.initial_buckets)?
        };

        if replay.torn {
            warn!(
                path = %path.display(),
                valid_bytes = replay.end,
                file_bytes = file_len,
                "truncating torn record at end of hash log"
            );
            file.set_len(replay.end)?;
            file.sync_all()?;
        }

        debug!(
            path = %path.display(),
            keys = replay.table.len(),
            dead_bytes = replay.dead_bytes,
            "opened hash store"
        );

        Ok(Self {
            path,
            file,
            _lock: lock,
            config,
            table: replay.table,
            end: replay.end,
            dead_bytes: replay.dead_bytes,
            last_error: ErrorCode::Success,
        })
    }

    /// Rebuild the bucket table from the records in the log
    fn replay(file: &File, file_len: u64, buckets: usize) -> Result<Replay> {
        if file_len < HEADER_LEN {
            return Err(Error::Corruption("Hash database too small".into()));
        }

        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; HEADER_LEN as usize];
        reader.read_exact(&mut header)?;
        check_header(&header)?;

        let mut table = BucketTable::with_buckets(buckets);
        let mut dead_bytes = 0u64;
        let mut offset = HEADER_LEN;
        let mut frame = Vec::new();

        while offset < file_len {
            let remaining = file_len - offset;
            if remaining < FRAME_OVERHEAD as u64 {
                return Ok(Replay { table, end: offset, dead_bytes, torn: true });
            }

            let mut prefix = [0u8; 4];
            reader.read_exact(&mut prefix)?;
            let frame_len = FRAME_OVERHEAD + Record::content_len(prefix)?;
            if frame_len as u64 > remaining {
                return Ok(Replay { table, end: offset, dead_bytes, torn: true });
            }

            frame.clear();
            frame.extend_from_slice(&prefix);
            frame.resize(frame_len, 0);
            reader.read_exact(&mut frame[4..])?;

            let (record, size) = Record::decode(&frame).map_err(|e| {
                Error::Corruption(format!("Bad record at offset {}: {}", offset, e))
            })?;
            let slot = Slot {
                offset,
                len: size as u32,
            };

            match record.payload {
                RecordPayload::Put { key, .. } => {
                    if let Some(old) = table.insert(key, slot) {
                        dead_bytes += old.len as u64;
                    }
                }
                RecordPayload::Delete { key } => {
                    if let Some(old) = table.remove(&key) {
                        dead_bytes += old.len as u64;
                    }
                    dead_bytes += size as u64;
                }
            }
            offset += size as u64;
        }

        Ok(Replay { table, end: offset, dead_bytes, torn: false })
    }

    /// Append a record at the end of the log
    fn append(&mut self, record: &Record) -> Result<Slot> {
        let frame = record.encode()?;

        self.file.seek(SeekFrom::Start(self.end))?;
        if let Err(e) = self.file.write_all(&frame) {
            // Drop any partial frame so the next append starts clean
            let _ = self.file.set_len(self.end);
            return Err(Error::Storage(format!("Failed to append record: {}", e)));
        }
        if self.config.sync_mode == SyncMode::Sync {
            self.file.sync_data()?;
        }

        let slot = Slot {
            offset: self.end,
            len: frame.len() as u32,
        };
        self.end += frame.len() as u64;
        Ok(slot)
    }

    /// Read and validate the raw frame at a slot
    fn read_frame(&mut self, slot: Slot) -> Result<Vec<u8>> {
        let mut frame = vec![0u8; slot.len as usize];
        self.file.seek(SeekFrom::Start(slot.offset))?;
        self.file.read_exact(&mut frame)?;
        Ok(frame)
    }

    fn read_value(&mut self, slot: Slot) -> Result<Vec<u8>> {
        let frame = self.read_frame(slot)?;
        let (record, _) = Record::decode(&frame)?;
        record.into_value().ok_or_else(|| {
            Error::Corruption(format!("Slot at offset {} is not a PUT", slot.offset))
        })
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        validate_key(key)?;
        validate_value(value)?;

        let slot = self.append(&Record::put(key.to_vec(), value.to_vec()))?;
        if let Some(old) = self.table.insert(key.to_vec(), slot) {
            self.dead_bytes += old.len as u64;
        }
        Ok(())
    }

    /// Record the error code for a failed operation and pass it on
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.last_error = ErrorCode::from(e);
        }
        result
    }

    /// Bytes held by overwritten or deleted records
    pub fn dead_bytes(&self) -> u64 {
        self.dead_bytes
    }

    /// Current size of the log file
    pub fn file_size(&self) -> u64 {
        self.end
    }

    fn needs_reorganize(&self) -> bool {
        self.dead_bytes >= self.config.reorganize_min_bytes
            && self.dead_bytes > self.table.live_bytes()
    }

    /// Rewrite the log with only live records
    ///
    /// The new log is written beside the old one and renamed over it, so a
    /// failure at any point leaves the original file intact.
    pub fn reorganize(&mut self) -> Result<()> {
        let tmp = file::temp_path(&self.path, REORG_SUFFIX);
        let result = self.write_reorganized(&tmp);
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        let (new_file, table, end) = self.track(result)?;

        // The handle follows the renamed inode; nothing can fail after this
        let result = file::replace(&tmp, &self.path);
        self.track(result)?;

        debug!(
            path = %self.path.display(),
            reclaimed = self.end.saturating_sub(end),
            "reorganized hash store"
        );

        self.file = new_file;
        self.table = table;
        self.end = end;
        self.dead_bytes = 0;
        Ok(())
    }

    fn write_reorganized(&mut self, tmp: &Path) -> Result<(File, BucketTable, u64)> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(tmp)?;
        let mut out = BufWriter::new(file);
        out.write_all(&encode_header())?;

        let live: Vec<(Vec<u8>, Slot)> = self
            .table
            .iter()
            .map(|(key, slot)| (key.to_vec(), slot))
            .collect();

        let mut table = BucketTable::with_buckets(self.table.bucket_count());
        let mut offset = HEADER_LEN;
        for (key, slot) in live {
            let frame = self.read_frame(slot)?;
            Record::decode(&frame)?;
            out.write_all(&frame)?;
            table.insert(key, Slot { offset, len: slot.len });
            offset += slot.len as u64;
        }

        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok((file, table, offset))
    }
}

impl KvStore for HashStore {
    fn backend(&self) -> &'static str {
        "hash"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn fetch(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.table.get(key) {
            Some(slot) => {
                let result = self.read_value(slot);
                self.track(result).map(Some)
            }
            None => {
                self.last_error = ErrorCode::ItemNotFound;
                Ok(None)
            }
        }
    }

    fn try_insert(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        if self.table.contains(key) {
            self.last_error = ErrorCode::KeyExists;
            return Ok(false);
        }
        let result = self.put(key, value);
        self.track(result).map(|_| true)
    }

    fn store(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let result = self.put(key, value);
        self.track(result)
    }

    fn delete(&mut self, key: &[u8]) -> Result<bool> {
        if !self.table.contains(key) {
            self.last_error = ErrorCode::ItemNotFound;
            return Ok(false);
        }

        let result = self.append(&Record::delete(key.to_vec()));
        let tombstone = self.track(result)?;
        if let Some(old) = self.table.remove(key) {
            self.dead_bytes += old.len as u64;
        }
        self.dead_bytes += tombstone.len as u64;
        Ok(true)
    }

    fn len(&self) -> usize {
        self.table.len()
    }

    fn cursor(&mut self) -> Result<Box<dyn StoreCursor + '_>> {
        Ok(Box::new(HashCursor {
            store: self,
            last_key: None,
            state: CursorState::Fresh,
        }))
    }

    fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    fn describe_error(&self, code: ErrorCode) -> String {
        let text = match code {
            ErrorCode::Success => "No error",
            ErrorCode::ItemNotFound => "Item not found",
            ErrorCode::KeyExists => "Cannot replace",
            ErrorCode::FileOpen => "File open error",
            ErrorCode::FileRead => "File read error",
            ErrorCode::FileWrite => "File write error",
            ErrorCode::FileLocked => "Can't be writer",
            ErrorCode::Corrupted => "Malformed data",
            ErrorCode::InvalidInput => "Illegal data",
            ErrorCode::InvalidOperation => "Illegal operation",
        };
        text.to_string()
    }

    fn sync(&mut self) -> Result<()> {
        let result = self.file.sync_all().map_err(Error::from);
        self.track(result)
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        if self.needs_reorganize() {
            self.reorganize()?;
        }
        self.file.sync_all()?;
        debug!(path = %self.path.display(), "closed hash store");
        Ok(())
    }
}

/// Cursor over a hash store.
///
/// The bucket table only understands "give me the key after this one",
/// so the cursor carries the last key it returned and re-fetches values
/// from the log by key.
pub struct HashCursor<'a> {
    store: &'a mut HashStore,
    last_key: Option<Vec<u8>>,
    state: CursorState,
}

impl StoreCursor for HashCursor<'_> {
    fn first(&mut self) -> Result<bool> {
        self.state.begin()?;
        self.last_key = self.store.table.first_key().map(<[u8]>::to_vec);
        self.state = CursorState::settle(self.last_key.is_some());
        Ok(self.last_key.is_some())
    }

    fn next(&mut self) -> Result<bool> {
        if !self.state.advance()? {
            return Ok(false);
        }
        self.last_key = match self.last_key.take() {
            Some(prev) => self.store.table.next_key(&prev).map(<[u8]>::to_vec),
            None => None,
        };
        self.state = CursorState::settle(self.last_key.is_some());
        Ok(self.last_key.is_some())
    }

    fn key(&self) -> Option<&[u8]> {
        self.last_key.as_deref()
    }

    fn value(&mut self) -> Result<Option<Vec<u8>>> {
        match self.last_key.as_deref() {
            Some(key) => self.store.fetch(key),
            None => Ok(None),
        }
    }
}
