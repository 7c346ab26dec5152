//! Bucket table - in-memory index of the hash log
//!
//! Maps each live key to the location of its latest PUT record. Keys are
//! spread over buckets by CRC32 and the table doubles once the average
//! bucket holds more than [`MAX_LOAD`] keys.
//!
//! Iteration follows the dbm protocol: [`BucketTable::first_key`] returns
//! a key, and [`BucketTable::next_key`] takes the previous key and returns
//! the one after it. There is no cursor object.

/// Average keys per bucket before the table grows
pub const MAX_LOAD: usize = 4;

/// Location of a record in the log file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Byte offset of the record frame
    pub offset: u64,
    /// Length of the whole frame
    pub len: u32,
}

#[derive(Debug)]
struct Bucket {
    entries: Vec<(Vec<u8>, Slot)>,
}

impl Bucket {
    fn position(&self, key: &[u8]) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.as_slice() == key)
    }
}

/// Hash index from key to record slot
#[derive(Debug)]
pub struct BucketTable {
    buckets: Vec<Bucket>,
    len: usize,
}

impl BucketTable {
    /// Creates a table with at least one bucket
    pub fn with_buckets(count: usize) -> Self {
        let count = count.max(1);
        Self {
            buckets: (0..count).map(|_| Bucket { entries: Vec::new() }).collect(),
            len: 0,
        }
    }

    fn bucket_of(&self, key: &[u8]) -> usize {
        crc32fast::hash(key) as usize % self.buckets.len()
    }

    /// Number of keys in the table
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the table is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current bucket count
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Looks up the slot for a key
    pub fn get(&self, key: &[u8]) -> Option<Slot> {
        let bucket = &self.buckets[self.bucket_of(key)];
        bucket.position(key).map(|i| bucket.entries[i].1)
    }

    /// Returns true if the key is present
    pub fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Inserts or replaces a slot, returning the replaced one
    pub fn insert(&mut self, key: Vec<u8>, slot: Slot) -> Option<Slot> {
        let b = self.bucket_of(&key);
        if let Some(i) = self.buckets[b].position(&key) {
            return Some(std::mem::replace(&mut self.buckets[b].entries[i].1, slot));
        }

        self.buckets[b].entries.push((key, slot));
        self.len += 1;

        if self.len > self.buckets.len() * MAX_LOAD {
            self.grow();
        }
        None
    }

    /// Removes a key, returning its slot
    pub fn remove(&mut self, key: &[u8]) -> Option<Slot> {
        let b = self.bucket_of(key);
        let i = self.buckets[b].position(key)?;
        let (_, slot) = self.buckets[b].entries.remove(i);
        self.len -= 1;
        Some(slot)
    }

    /// Sum of the frame lengths of all live records
    pub fn live_bytes(&self) -> u64 {
        self.buckets
            .iter()
            .flat_map(|b| b.entries.iter())
            .map(|(_, s)| s.len as u64)
            .sum()
    }

    /// First key in bucket order, if any
    pub fn first_key(&self) -> Option<&[u8]> {
        self.first_from(0)
    }

    /// Key following `prev` in bucket order.
    ///
    /// Returns `None` at the end of the table, and also when `prev` is no
    /// longer in the table.
    pub fn next_key(&self, prev: &[u8]) -> Option<&[u8]> {
        let b = self.bucket_of(prev);
        let i = self.buckets[b].position(prev)?;
        match self.buckets[b].entries.get(i + 1) {
            Some((key, _)) => Some(key.as_slice()),
            None => self.first_from(b + 1),
        }
    }

    fn first_from(&self, start: usize) -> Option<&[u8]> {
        self.buckets[start.min(self.buckets.len())..]
            .iter()
            .find_map(|b| b.entries.first())
            .map(|(key, _)| key.as_slice())
    }

    /// Iterates over all keys and slots in bucket order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Slot)> {
        self.buckets
            .iter()
            .flat_map(|b| b.entries.iter())
            .map(|(k, s)| (k.as_slice(), *s))
    }

    fn grow(&mut self) {
        let new_count = self.buckets.len() * 2;
        let old = std::mem::replace(
            &mut self.buckets,
            (0..new_count).map(|_| Bucket { entries: Vec::new() }).collect(),
        );
        for (key, slot) in old.into_iter().flat_map(|b| b.entries) {
            let b = self.bucket_of(&key);
            self.buckets[b].entries.push((key, slot));
        }
    }
}
