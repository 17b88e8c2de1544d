//! Fixed layout of a PS_FS_V1 archive and the pure decoders for its fields.
//!
//! Nothing here performs I/O: callers read exactly the stated number of
//! bytes and hand the window over for decoding.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::ValidationError;
use crate::resource::Resource;

/// Archive signature, `PS_FS_V1`
pub const MAGIC: &[u8; 8] = &[0x50, 0x53, 0x5F, 0x46, 0x53, 0x5F, 0x56, 0x31];

/// Magic (8) + resource count (4) + separator (4)
pub const HEADER_SIZE: u64 = 16;

/// Size of one resource table entry
pub const ENTRY_SIZE: usize = 64;

/// Width of the padded name field at the start of an entry
pub const NAME_SIZE: usize = 22;

/// Unused bytes between the name and the raw size
pub const RESERVED_SIZE: usize = 26;

const RAW_SIZE_AT: usize = NAME_SIZE + RESERVED_SIZE;
const RAW_OFFSET_AT: usize = RAW_SIZE_AT + 8;

/// Stored sizes include, and stored offsets point at, 16 bytes that are not
/// part of the payload.
pub const USELESS_HEADER_SIZE: i64 = 16;

/// Compare an 8-byte window against [`MAGIC`].
pub fn is_magic(bytes: &[u8; 8]) -> bool {
    bytes == MAGIC
}

pub fn read_u32_le(bytes: [u8; 4]) -> u32 {
    LittleEndian::read_u32(&bytes)
}

/// Decode a padded text field.
///
/// Invalid UTF-8 sequences are replaced rather than rejected, then trailing
/// NUL and whitespace padding is stripped.
pub fn read_padded_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// A resource table entry exactly as stored on disk.
///
/// Layout (64 bytes):
///
/// | at | len | field |
/// |----|-----|-------|
/// | 0  | 22  | name |
/// | 22 | 26  | reserved |
/// | 48 | 4   | raw size |
/// | 52 | 4   | separator |
/// | 56 | 4   | raw offset |
/// | 60 | 4   | separator |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub name: String,
    pub raw_size: u32,
    pub raw_offset: u32,
}

impl RawEntry {
    pub fn from_bytes(data: &[u8; ENTRY_SIZE]) -> Self {
        Self {
            name: read_padded_text(&data[..NAME_SIZE]),
            raw_size: LittleEndian::read_u32(&data[RAW_SIZE_AT..RAW_SIZE_AT + 4]),
            raw_offset: LittleEndian::read_u32(&data[RAW_OFFSET_AT..RAW_OFFSET_AT + 4]),
        }
    }

    /// Payload length after removing the embedded sub-header
    pub fn size(&self) -> i64 {
        i64::from(self.raw_size) - USELESS_HEADER_SIZE
    }

    /// Payload position after skipping the embedded sub-header
    pub fn offset(&self) -> i64 {
        i64::from(self.raw_offset) + USELESS_HEADER_SIZE
    }

    pub fn into_resource(self) -> Result<Resource, ValidationError> {
        let (size, offset) = (self.size(), self.offset());
        Resource::new(self.name, size, offset)
    }
}
