//! Binary record format of the app allow-list file
//!
//! The file is a bare concatenation of records, with no header, count or
//! checksum:
//!
//! ```text
//! [varint len][UTF-8 key][varint len][UTF-8 name][u8 allowed][i32 LE icon len][icon bytes]
//! ```
//!
//! String lengths are byte counts in 7-bit groups, least significant group
//! first, high bit set on every byte but the last.

use super::AppDirectoryEntry;

/// A varint longer than this cannot encode a 32-bit length
const MAX_VARINT_BYTES: usize = 5;

/// Reasons a record failed to parse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record truncated")]
    UnexpectedEnd,

    #[error("string length prefix is too long")]
    VarintOverflow,

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("negative icon length {0}")]
    NegativeIconLength(i32),
}

/// Result of scanning a directory blob
#[derive(Debug, Default)]
pub struct DecodedRecords {
    pub entries: Vec<AppDirectoryEntry>,
    /// Bytes consumed by the records that parsed
    pub consumed: usize,
    /// Why scanning stopped early, if it did not end exactly at the end
    pub stopped_by: Option<RecordError>,
}

/// Append one record for `entry` to `out`
pub fn encode_record(entry: &AppDirectoryEntry, out: &mut Vec<u8>) {
    write_string(&entry.key, out);
    write_string(&entry.display_name, out);
    out.push(u8::from(entry.allowed));
    out.extend_from_slice(&(entry.icon.len() as i32).to_le_bytes());
    out.extend_from_slice(&entry.icon);
}

/// Parse records until the data ends or a record fails to parse
pub fn decode_records(data: &[u8]) -> DecodedRecords {
    let mut reader = RecordReader { data, pos: 0 };
    let mut decoded = DecodedRecords::default();

    while reader.pos < data.len() {
        let start = reader.pos;
        match reader.read_record() {
            Ok(entry) => {
                decoded.entries.push(entry);
                decoded.consumed = reader.pos;
            }
            Err(e) => {
                reader.pos = start;
                decoded.stopped_by = Some(e);
                break;
            }
        }
    }

    decoded
}

fn write_string(value: &str, out: &mut Vec<u8>) {
    let mut len = value.len() as u32;
    while len >= 0x80 {
        out.push((len as u8 & 0x7f) | 0x80);
        len >>= 7;
    }
    out.push(len as u8);
    out.extend_from_slice(value.as_bytes());
}

struct RecordReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl RecordReader<'_> {
    fn read_record(&mut self) -> Result<AppDirectoryEntry, RecordError> {
        let key = self.read_string()?;
        let display_name = self.read_string()?;
        let allowed = self.read_u8()? != 0;

        let icon_len = self.read_i32()?;
        if icon_len < 0 {
            return Err(RecordError::NegativeIconLength(icon_len));
        }
        let icon = self.read_bytes(icon_len as usize)?.to_vec();

        Ok(AppDirectoryEntry {
            key,
            display_name,
            allowed,
            icon,
            marked_for_deletion: false,
        })
    }

    fn read_u8(&mut self) -> Result<u8, RecordError> {
        let byte = *self.data.get(self.pos).ok_or(RecordError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&[u8], RecordError> {
        let end = self.pos.checked_add(len).ok_or(RecordError::UnexpectedEnd)?;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(RecordError::UnexpectedEnd)?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_i32(&mut self) -> Result<i32, RecordError> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_varint(&mut self) -> Result<u32, RecordError> {
        let mut value: u32 = 0;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_u8()?;
            value |= u32::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(RecordError::VarintOverflow)
    }

    fn read_string(&mut self) -> Result<String, RecordError> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| RecordError::InvalidUtf8)
    }
}
