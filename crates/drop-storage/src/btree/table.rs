//! Sorted table - on-disk image of a B-tree store
//!
//! The whole tree is written out in key order whenever it is persisted.
//!
//! ## File Format
//!
//! ```text
//! +------------------+
//! | Data Blocks      |  <- Length-prefixed entries, CRC per block
//! +------------------+
//! | Index Block      |  <- First key, offset and size of each block
//! +------------------+
//! | Footer           |  <- Index location, counts, magic, version, CRC
//! +------------------+
//! | Footer length    |  <- u32 LE
//! +------------------+
//! ```

use drop_core::format_version::{btree_version, magic};
use drop_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Default block size (4KB)
const DEFAULT_BLOCK_SIZE: usize = 4096;

/// A single key-value entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    /// The key
    pub key: Vec<u8>,
    /// The value
    pub value: Vec<u8>,
}

/// Index entry pointing to a data block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// First key in the block
    pub first_key: Vec<u8>,
    /// Offset of the block in the file
    pub offset: u64,
    /// Size of the block in bytes, CRC included
    pub size: u32,
}

/// Table footer containing metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFooter {
    /// Offset of the index block
    pub index_offset: u64,
    /// Size of the index block
    pub index_size: u32,
    /// Number of entries in the table
    pub entry_count: u64,
    /// Minimum key in the table
    pub min_key: Vec<u8>,
    /// Maximum key in the table
    pub max_key: Vec<u8>,
    /// Magic number for validation
    pub magic: u32,
    /// Format version
    pub version: u16,
    /// CRC32 of the footer with this field zeroed
    pub crc: u32,
}

impl TableFooter {
    fn checksum(&self) -> Result<u32> {
        let unsigned = TableFooter { crc: 0, ..self.clone() };
        let encoded =
            bincode::serialize(&unsigned).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(crc32fast::hash(&encoded))
    }
}

/// Table writer - streams sorted entries into a new file
pub struct TableWriter {
    writer: BufWriter<File>,
    position: u64,
    index: Vec<IndexEntry>,
    block_buffer: Vec<u8>,
    block_size: usize,
    current_block_first_key: Option<Vec<u8>>,
    entry_count: u64,
    min_key: Option<Vec<u8>>,
    max_key: Option<Vec<u8>>,
}

impl TableWriter {
    /// Create a writer for a new table file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_block_size(path, DEFAULT_BLOCK_SIZE)
    }

    /// Create a writer with a custom block size
    pub fn with_block_size(path: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        let file = File::create(path.as_ref())?;

        Ok(Self {
            writer: BufWriter::new(file),
            position: 0,
            index: Vec::new(),
            block_buffer: Vec::with_capacity(block_size),
            block_size,
            current_block_first_key: None,
            entry_count: 0,
            min_key: None,
            max_key: None,
        })
    }

    /// Add an entry. Keys must arrive in strictly ascending order.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if let Some(last) = &self.max_key {
            if key <= last.as_slice() {
                return Err(Error::InvalidOperation(
                    "Table keys must be added in ascending order".to_string(),
                ));
            }
        }

        if self.min_key.is_none() {
            self.min_key = Some(key.to_vec());
        }
        self.max_key = Some(key.to_vec());

        if self.current_block_first_key.is_none() {
            self.current_block_first_key = Some(key.to_vec());
        }

        let entry = TableEntry {
            key: key.to_vec(),
            value: value.to_vec(),
        };
        let encoded =
            bincode::serialize(&entry).map_err(|e| Error::Serialization(e.to_string()))?;

        self.block_buffer
            .extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        self.block_buffer.extend_from_slice(&encoded);
        self.entry_count += 1;

        if self.block_buffer.len() >= self.block_size {
            self.flush_block()?;
        }

        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.block_buffer.is_empty() {
            return Ok(());
        }

        let crc = crc32fast::hash(&self.block_buffer);

        if let Some(first_key) = self.current_block_first_key.take() {
            self.index.push(IndexEntry {
                first_key,
                offset: self.position,
                size: self.block_buffer.len() as u32 + 4,
            });
        }

        self.writer.write_all(&self.block_buffer)?;
        self.writer.write_all(&crc.to_le_bytes())?;
        self.position += self.block_buffer.len() as u64 + 4;

        self.block_buffer.clear();
        Ok(())
    }

    /// Write index and footer. With `durable`, fsync before returning.
    pub fn finish(mut self, durable: bool) -> Result<u64> {
        self.flush_block()?;

        let index_offset = self.position;
        let index_encoded =
            bincode::serialize(&self.index).map_err(|e| Error::Serialization(e.to_string()))?;
        let index_size = index_encoded.len() as u32;
        self.writer.write_all(&index_encoded)?;
        self.position += index_size as u64;

        let mut footer = TableFooter {
            index_offset,
            index_size,
            entry_count: self.entry_count,
            min_key: self.min_key.take().unwrap_or_default(),
            max_key: self.max_key.take().unwrap_or_default(),
            magic: magic::BTREE,
            version: btree_version().current,
            crc: 0,
        };
        footer.crc = footer.checksum()?;

        let footer_encoded =
            bincode::serialize(&footer).map_err(|e| Error::Serialization(e.to_string()))?;
        self.writer.write_all(&footer_encoded)?;
        self.writer
            .write_all(&(footer_encoded.len() as u32).to_le_bytes())?;
        self.writer.flush()?;
        if durable {
            self.writer.get_ref().sync_all()?;
        }

        Ok(self.position + footer_encoded.len() as u64 + 4)
    }

    /// Write a whole sorted sequence and finish the table
    pub fn write_all<'a, I>(path: impl AsRef<Path>, entries: I, durable: bool) -> Result<u64>
    where
        I: IntoIterator<Item = (&'a Vec<u8>, &'a Vec<u8>)>,
    {
        let mut writer = TableWriter::create(path)?;
        for (key, value) in entries {
            writer.add(key, value)?;
        }
        writer.finish(durable)
    }
}

/// Table reader - validates and streams entries from a table file
pub struct TableReader {
    file: BufReader<File>,
    index: Vec<IndexEntry>,
    footer: TableFooter,
}

impl TableReader {
    /// Open a table file by path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file(File::open(path.as_ref())?)
    }

    /// Read footer and index from an open file
    pub fn from_file(mut file: File) -> Result<Self> {
        let file_size = file.metadata()?.len();
        if file_size < 4 {
            return Err(Error::Corruption("Table too small".into()));
        }

        file.seek(SeekFrom::End(-4))?;
        let mut footer_len_buf = [0u8; 4];
        file.read_exact(&mut footer_len_buf)?;
        let footer_len = u32::from_le_bytes(footer_len_buf) as u64;
        if footer_len + 4 > file_size {
            return Err(Error::Corruption("Table footer length out of range".into()));
        }

        file.seek(SeekFrom::End(-4 - footer_len as i64))?;
        let mut footer_buf = vec![0u8; footer_len as usize];
        file.read_exact(&mut footer_buf)?;

        let footer: TableFooter = bincode::deserialize(&footer_buf)
            .map_err(|e| Error::Corruption(format!("Unreadable table footer: {}", e)))?;

        if footer.magic != magic::BTREE {
            return Err(Error::Corruption("Not a drop B-tree database".into()));
        }
        if !btree_version().can_read(footer.version) {
            return Err(Error::Corruption(format!(
                "Unsupported table format version {}",
                footer.version
            )));
        }
        if footer.checksum()? != footer.crc {
            return Err(Error::Corruption("Table footer CRC mismatch".into()));
        }
        if footer.index_offset + footer.index_size as u64 > file_size - 4 - footer_len {
            return Err(Error::Corruption("Table index out of range".into()));
        }

        file.seek(SeekFrom::Start(footer.index_offset))?;
        let mut index_buf = vec![0u8; footer.index_size as usize];
        file.read_exact(&mut index_buf)?;

        let index: Vec<IndexEntry> = bincode::deserialize(&index_buf)
            .map_err(|e| Error::Corruption(format!("Unreadable table index: {}", e)))?;

        Ok(Self {
            file: BufReader::new(file),
            index,
            footer,
        })
    }

    /// Number of entries recorded in the footer
    pub fn entry_count(&self) -> u64 {
        self.footer.entry_count
    }

    fn read_block(&mut self, block_idx: usize) -> Result<Vec<TableEntry>> {
        let index_entry = &self.index[block_idx];
        if index_entry.size < 4 || index_entry.offset + index_entry.size as u64 > self.footer.index_offset {
            return Err(Error::Corruption("Block out of range".into()));
        }

        self.file.seek(SeekFrom::Start(index_entry.offset))?;

        let data_size = index_entry.size as usize - 4;
        let mut data_buf = vec![0u8; data_size];
        self.file.read_exact(&mut data_buf)?;

        let mut crc_buf = [0u8; 4];
        self.file.read_exact(&mut crc_buf)?;
        if u32::from_le_bytes(crc_buf) != crc32fast::hash(&data_buf) {
            return Err(Error::Corruption("Block CRC mismatch".into()));
        }

        let mut entries = Vec::new();
        let mut offset = 0;

        while offset + 4 <= data_buf.len() {
            let len = u32::from_le_bytes([
                data_buf[offset],
                data_buf[offset + 1],
                data_buf[offset + 2],
                data_buf[offset + 3],
            ]) as usize;
            offset += 4;

            if offset + len > data_buf.len() {
                return Err(Error::Corruption("Entry overruns block".into()));
            }

            let entry: TableEntry = bincode::deserialize(&data_buf[offset..offset + len])
                .map_err(|e| Error::Serialization(e.to_string()))?;
            entries.push(entry);
            offset += len;
        }

        Ok(entries)
    }

    /// Iterate over all entries in key order
    pub fn iter(&mut self) -> TableIterator<'_> {
        TableIterator {
            reader: self,
            block_idx: 0,
            block_entries: Vec::new().into_iter(),
        }
    }
}

/// Iterator over table entries
pub struct TableIterator<'a> {
    reader: &'a mut TableReader,
    block_idx: usize,
    block_entries: std::vec::IntoIter<TableEntry>,
}

impl TableIterator<'_> {
    /// Get the next entry
    pub fn next_entry(&mut self) -> Result<Option<TableEntry>> {
        loop {
            if let Some(entry) = self.block_entries.next() {
                return Ok(Some(entry));
            }

            if self.block_idx >= self.reader.index.len() {
                return Ok(None);
            }

            self.block_entries = self.reader.read_block(self.block_idx)?.into_iter();
            self.block_idx += 1;
        }
    }
}
