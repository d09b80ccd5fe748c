use crate::error::{Error, Result};

/// Operation recorded in the WAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Put = 0x01,
    Delete = 0x02,
}

impl RecordType {
    fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(RecordType::Put),
            0x02 => Ok(RecordType::Delete),
            _ => Err(Error::Corruption(format!("invalid record type: {}", byte))),
        }
    }
}

/// A single record in the WAL.
///
/// On-disk format:
/// ```text
/// ┌──────────┬──────────┬─────────────┬─────────────┬───────────┬───────────┐
/// │ CRC (4B) │ Op (1B)  │ KeyLen (4B) │ ValLen (4B) │ Key (var) │ Val (var) │
/// └──────────┴──────────┴─────────────┴─────────────┴───────────┴───────────┘
/// ```
///
/// Lengths are signed little-endian `i32`s. A negative length can only come
/// from a damaged file. CRC covers everything after the CRC field itself.
/// Delete records always carry a zero value length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WALRecord {
    pub record_type: RecordType,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

// Header sizes
const CRC_SIZE: usize = 4;
const TYPE_SIZE: usize = 1;
const LEN_SIZE: usize = 4;
pub(crate) const HEADER_SIZE: usize = CRC_SIZE + TYPE_SIZE + LEN_SIZE + LEN_SIZE;

impl WALRecord {
    /// Create a Put record.
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        WALRecord {
            record_type: RecordType::Put,
            key,
            value,
        }
    }

    /// Create a Delete record.
    pub fn delete(key: Vec<u8>) -> Self {
        WALRecord {
            record_type: RecordType::Delete,
            key,
            value: Vec::new(),
        }
    }

    /// Serialize this record to bytes (including CRC header).
    ///
    /// Callers are expected to have checked key/value lengths against
    /// `MAX_FIELD_LEN` already.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_size());

        // Reserve space for CRC (filled at the end)
        buf.extend_from_slice(&[0u8; CRC_SIZE]);
        buf.push(self.record_type as u8);
        buf.extend_from_slice(&(self.key.len() as i32).to_le_bytes());
        buf.extend_from_slice(&(self.value.len() as i32).to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);

        let crc = crc32fast::hash(&buf[CRC_SIZE..]);
        buf[0..CRC_SIZE].copy_from_slice(&crc.to_le_bytes());

        buf
    }

    /// Deserialize one record from the front of `data`.
    ///
    /// Any malformed input is reported as `Error::Corruption`: a header
    /// shorter than 13 bytes, a negative length, a record running past the
    /// end of `data`, an unknown op byte, or a CRC mismatch.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Corruption("record too short".into()));
        }

        let stored_crc = read_u32(data, 0);
        let record_type = RecordType::from_u8(data[CRC_SIZE])?;
        let key_len = read_i32(data, CRC_SIZE + TYPE_SIZE);
        let value_len = read_i32(data, CRC_SIZE + TYPE_SIZE + LEN_SIZE);

        if key_len < 0 {
            return Err(Error::Corruption(format!("negative key length: {key_len}")));
        }
        if value_len < 0 {
            return Err(Error::Corruption(format!(
                "negative value length: {value_len}"
            )));
        }
        if record_type == RecordType::Delete && value_len != 0 {
            return Err(Error::Corruption(format!(
                "delete record carries {value_len} value bytes"
            )));
        }

        let key_len = key_len as usize;
        let value_len = value_len as usize;
        let total_len = HEADER_SIZE + key_len + value_len;
        if data.len() < total_len {
            return Err(Error::Corruption("record truncated".into()));
        }

        let computed_crc = crc32fast::hash(&data[CRC_SIZE..total_len]);
        if stored_crc != computed_crc {
            return Err(Error::Corruption("CRC mismatch".into()));
        }

        let key_start = HEADER_SIZE;
        let value_start = key_start + key_len;
        Ok(WALRecord {
            record_type,
            key: data[key_start..value_start].to_vec(),
            value: data[value_start..total_len].to_vec(),
        })
    }

    /// Size of this record when serialized on disk.
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(b)
}

fn read_i32(data: &[u8], at: usize) -> i32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&data[at..at + 4]);
    i32::from_le_bytes(b)
}
