// Log record format and encoding/decoding
//
// Record format (binary):
// [length: u32 LE] [type: u8] [payload bytes] [crc32: u32 LE]
//
// Types:
// - PUT (1): key-value insert/update
// - DELETE (2): key deletion

use crc32fast::Hasher;
use drop_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Size of the length prefix plus the trailing CRC
pub const FRAME_OVERHEAD: usize = 8;

/// Upper bound on a single record's content, checked before allocating
pub const MAX_RECORD_SIZE: usize = 32 * 1024 * 1024;

/// Log record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RecordType {
    Put = 1,
    Delete = 2,
}

impl TryFrom<u8> for RecordType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(RecordType::Put),
            2 => Ok(RecordType::Delete),
            _ => Err(Error::Corruption(format!(
                "Unknown record type: {}",
                value
            ))),
        }
    }
}

/// Log record payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordPayload {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// A framed log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub record_type: RecordType,
    pub payload: RecordPayload,
}

impl Record {
    /// Create a PUT record
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            record_type: RecordType::Put,
            payload: RecordPayload::Put { key, value },
        }
    }

    /// Create a DELETE record
    pub fn delete(key: Vec<u8>) -> Self {
        Self {
            record_type: RecordType::Delete,
            payload: RecordPayload::Delete { key },
        }
    }

    /// Key this record applies to
    pub fn key(&self) -> &[u8] {
        match &self.payload {
            RecordPayload::Put { key, .. } | RecordPayload::Delete { key } => key,
        }
    }

    /// Consumes the record and returns the stored value, if it is a PUT
    pub fn into_value(self) -> Option<Vec<u8>> {
        match self.payload {
            RecordPayload::Put { value, .. } => Some(value),
            RecordPayload::Delete { .. } => None,
        }
    }

    /// Encode record to bytes with framing and CRC
    /// Format: [length: u32 LE] [type: u8] [payload bytes] [crc32: u32 LE]
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload_bytes = bincode::serialize(&self.payload)
            .map_err(|e| Error::Serialization(format!("Failed to serialize payload: {}", e)))?;

        let type_byte = self.record_type as u8;

        // Type byte + payload
        let content_len = 1 + payload_bytes.len();
        if content_len > MAX_RECORD_SIZE {
            return Err(Error::InvalidInput(format!(
                "Record size {} exceeds maximum {}",
                content_len, MAX_RECORD_SIZE
            )));
        }

        let mut hasher = Hasher::new();
        hasher.update(&[type_byte]);
        hasher.update(&payload_bytes);
        let crc = hasher.finalize();

        let mut frame = Vec::with_capacity(FRAME_OVERHEAD + content_len);
        frame.extend_from_slice(&(content_len as u32).to_le_bytes());
        frame.push(type_byte);
        frame.extend_from_slice(&payload_bytes);
        frame.extend_from_slice(&crc.to_le_bytes());

        Ok(frame)
    }

    /// Reads the content length from a frame's 4-byte prefix
    pub fn content_len(prefix: [u8; 4]) -> Result<usize> {
        let length = u32::from_le_bytes(prefix) as usize;
        if length == 0 || length > MAX_RECORD_SIZE {
            return Err(Error::Corruption(format!(
                "Record length out of range: {} bytes",
                length
            )));
        }
        Ok(length)
    }

    /// Decode record from bytes with validation
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < FRAME_OVERHEAD + 1 {
            // Minimum: 4 (length) + 1 (type) + 0 (payload) + 4 (crc)
            return Err(Error::Serialization("Incomplete record frame".to_string()));
        }

        let length = Self::content_len([data[0], data[1], data[2], data[3]])?;

        let total_size = FRAME_OVERHEAD + length;
        if data.len() < total_size {
            return Err(Error::Serialization(format!(
                "Incomplete record: expected {} bytes, got {}",
                total_size,
                data.len()
            )));
        }

        let type_byte = data[4];
        let record_type = RecordType::try_from(type_byte)?;

        let payload_bytes = &data[5..4 + length];

        let crc_offset = 4 + length;
        let expected_crc = u32::from_le_bytes([
            data[crc_offset],
            data[crc_offset + 1],
            data[crc_offset + 2],
            data[crc_offset + 3],
        ]);

        let mut hasher = Hasher::new();
        hasher.update(&[type_byte]);
        hasher.update(payload_bytes);
        let actual_crc = hasher.finalize();

        if actual_crc != expected_crc {
            return Err(Error::Corruption(format!(
                "CRC mismatch: expected {}, got {}",
                expected_crc, actual_crc
            )));
        }

        let payload: RecordPayload = bincode::deserialize(payload_bytes)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize payload: {}", e)))?;

        let matches = matches!(
            (record_type, &payload),
            (RecordType::Put, RecordPayload::Put { .. })
                | (RecordType::Delete, RecordPayload::Delete { .. })
        );
        if !matches {
            return Err(Error::Corruption(
                "Record type does not match payload".to_string(),
            ));
        }

        Ok((
            Record {
                record_type,
                payload,
            },
            total_size,
        ))
    }
}
