//! Apple Partition Map records.
//!
//! Fixed-layout records found at the start of classic Macintosh media:
//! the Driver Descriptor Map (block 0) and Partition Map Entries (block 1
//! onwards). Every multi-byte field is big-endian on disk regardless of host.
//!
//! Records are never reinterpreted from raw memory. Each type encodes and
//! decodes field by field through [`endian`], which keeps the byte offsets
//! in one place per record.
//!
//! # Example
//!
//! ```
//! use apm::{DriverDescriptorMap, RECORD_SIZE};
//!
//! let map = DriverDescriptorMap::new(512, 100);
//! let block = map.to_bytes();
//! assert_eq!(block.len(), RECORD_SIZE);
//!
//! let parsed = DriverDescriptorMap::from_bytes(&block).unwrap();
//! assert_eq!(parsed.block_count, 100);
//! ```

pub mod driver_map;
pub mod endian;
pub mod error;
pub mod partition;

pub use driver_map::{DriverDescriptor, DriverDescriptorMap};
pub use error::{FormatError, Result};
pub use partition::{status, PartitionMapEntry};

/// Size of every on-disk record in bytes.
///
/// Both the driver map and a partition map entry fill exactly one
/// 512-byte block.
pub const RECORD_SIZE: usize = 512;

/// Copy a NUL-padded fixed field into a string slice, stopping at the first NUL.
pub fn fixed_str(field: &[u8]) -> &str {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    core::str::from_utf8(&field[..end]).unwrap_or("")
}

/// Fill a fixed-width field with `value`, zero-padding the remainder.
///
/// Values longer than the field are truncated.
pub fn set_fixed_str(field: &mut [u8], value: &str) {
    field.fill(0);
    let len = value.len().min(field.len());
    field[..len].copy_from_slice(&value.as_bytes()[..len]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_str_stops_at_nul() {
        let mut field = [0u8; 16];
        field[..5].copy_from_slice(b"68000");
        assert_eq!(fixed_str(&field), "68000");
    }

    #[test]
    fn test_set_fixed_str_truncates() {
        let mut field = [0xFFu8; 4];
        set_fixed_str(&mut field, "Apple_HFS");
        assert_eq!(&field, b"Appl");

        set_fixed_str(&mut field, "ab");
        assert_eq!(&field, b"ab\0\0");
    }
}
