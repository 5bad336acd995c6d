//! MMDB wire-format constants and record sizing.

use crate::{Error, Result};

/// Marker separating the data section from the metadata map.
pub const METADATA_MARKER: &[u8; 14] = b"\xAB\xCD\xEFMaxMind.com";

/// Separator between the search tree and the data section. Data
/// pointers stored in tree records are biased by this width.
pub const DATA_SECTION_SEPARATOR: [u8; 16] = [0; 16];

/// `binary_format_major_version` written to the metadata map.
pub const BINARY_FORMAT_MAJOR_VERSION: u16 = 2;

/// `binary_format_minor_version` written to the metadata map.
pub const BINARY_FORMAT_MINOR_VERSION: u16 = 2;

/// `database_type` written to the metadata map.
pub const DATABASE_TYPE: &str = "GeoIP2-City";

/// English `description` written to the metadata map.
pub const DATABASE_DESCRIPTION: &str = "GeoIP2 City database";

/// Width of one search-tree record side.
///
/// Each tree node stores two sides, so a node occupies
/// `2 * record_size / 8` bytes on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSize {
    /// 24 bits per side, 6 bytes per node
    Bits24,
    /// 28 bits per side, 7 bytes per node
    Bits28,
    /// 32 bits per side, 8 bytes per node
    Bits32,
}

impl RecordSize {
    /// Parse a bit width. Anything other than 24, 28 or 32 is
    /// rejected.
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            24 => Ok(RecordSize::Bits24),
            28 => Ok(RecordSize::Bits28),
            32 => Ok(RecordSize::Bits32),
            other => Err(Error::UnsupportedRecordSize(other)),
        }
    }

    /// The bit width of one record side.
    pub fn bits(self) -> u16 {
        match self {
            RecordSize::Bits24 => 24,
            RecordSize::Bits28 => 28,
            RecordSize::Bits32 => 32,
        }
    }

    /// On-disk bytes per node (both sides).
    pub fn node_bytes(self) -> usize {
        match self {
            RecordSize::Bits24 => 6,
            RecordSize::Bits28 => 7,
            RecordSize::Bits32 => 8,
        }
    }

    /// Number of distinct values one record side can hold.
    pub fn capacity(self) -> u64 {
        1u64 << self.bits()
    }

    /// Largest value encodable in one record side.
    pub fn max_record_value(self) -> u32 {
        (self.capacity() - 1) as u32
    }

    /// Reject trees that this record size cannot represent.
    pub fn check_node_count(self, node_count: u32) -> Result<()> {
        if u64::from(node_count) > self.capacity() {
            return Err(Error::RecordSizeTooSmall {
                record_size: self.bits(),
                node_count,
            });
        }
        Ok(())
    }
}
