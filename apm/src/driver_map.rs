//! Driver Descriptor Map (block 0).
//!
//! From Inside Macintosh: Devices, SCSI Manager pp 12-13. The map always
//! resides on physical block 0 and lists the device drivers stored on the
//! medium, each as a contiguous run of blocks.
//!
//! # Layout
//!
//! ```text
//! offset  size  field
//!      0     2  signature (0x4552, "ER")
//!      2     2  block size of device
//!      4     4  number of blocks on device
//!      8     2  device type (used internally by ROM)
//!     10     2  device id   (used internally by ROM)
//!     12     4  data        (used internally by ROM)
//!     16     2  driver descriptor count
//!     18   488  61 x driver descriptor (block u32, size u16, type u16)
//!    506     6  padding
//! ```

use crate::endian::{get_u16, get_u32, put_u16, put_u32};
use crate::error::{FormatError, Result};
use crate::RECORD_SIZE;

/// Driver map signature.
pub const DRIVER_MAP_MAGIC: u16 = 0x4552;

/// Maximum number of descriptors that fit in block 0.
pub const MAX_DESCRIPTORS: usize = 61;

/// System type for Macintosh drivers (Apple reserves 0-15).
pub const DRIVER_TYPE_MACINTOSH: u16 = 1;

const OFF_SIG: usize = 0;
const OFF_BLOCK_SIZE: usize = 2;
const OFF_BLOCK_COUNT: usize = 4;
const OFF_DEV_TYPE: usize = 8;
const OFF_DEV_ID: usize = 10;
const OFF_DATA: usize = 12;
const OFF_DRVR_COUNT: usize = 16;
const OFF_DESCRIPTORS: usize = 18;

/// One driver payload, as a run of blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverDescriptor {
    /// First block of the driver (absolute)
    pub start_block: u32,
    /// Driver size in blocks
    pub size_blocks: u16,
    /// System type
    pub driver_type: u16,
}

impl DriverDescriptor {
    /// Encoded size of a descriptor.
    pub const SIZE: usize = 8;

    /// Decode from exactly [`Self::SIZE`] bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(FormatError::Truncated {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        Ok(Self {
            start_block: get_u32(data, 0),
            size_blocks: get_u16(data, 4),
            driver_type: get_u16(data, 6),
        })
    }

    /// Encode into the first [`Self::SIZE`] bytes of `out`.
    pub fn write_to(&self, out: &mut [u8]) {
        put_u32(out, 0, self.start_block);
        put_u16(out, 4, self.size_blocks);
        put_u16(out, 6, self.driver_type);
    }

    /// First block past the end of the driver.
    pub fn end_block(&self) -> u64 {
        self.start_block as u64 + self.size_blocks as u64
    }
}

/// Driver Descriptor Map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverDescriptorMap {
    /// Block size of the device
    pub block_size: u16,
    /// Number of blocks on the device
    pub block_count: u32,
    /// Device type (used internally by ROM)
    pub device_type: u16,
    /// Device id (used internally by ROM)
    pub device_id: u16,
    /// Opaque ROM data
    pub data: u32,
    descriptors: Vec<DriverDescriptor>,
}

impl DriverDescriptorMap {
    /// New map with an empty descriptor table.
    ///
    /// The ROM-internal device type and id are both set to 1.
    pub fn new(block_size: u16, block_count: u32) -> Self {
        Self {
            block_size,
            block_count,
            device_type: 1,
            device_id: 1,
            data: 0,
            descriptors: Vec::new(),
        }
    }

    /// Parse block 0.
    ///
    /// The signature is checked before the descriptor count is trusted.
    pub fn from_bytes(block: &[u8]) -> Result<Self> {
        if block.len() < RECORD_SIZE {
            return Err(FormatError::Truncated {
                expected: RECORD_SIZE,
                actual: block.len(),
            });
        }

        let sig = get_u16(block, OFF_SIG);
        if sig != DRIVER_MAP_MAGIC {
            return Err(FormatError::BadSignature {
                record: "driver map",
                expected: DRIVER_MAP_MAGIC,
                found: sig,
            });
        }

        let count = get_u16(block, OFF_DRVR_COUNT);
        if count as usize > MAX_DESCRIPTORS {
            return Err(FormatError::TooManyDescriptors(count));
        }

        let mut descriptors = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let offset = OFF_DESCRIPTORS + i * DriverDescriptor::SIZE;
            descriptors.push(DriverDescriptor::from_bytes(
                &block[offset..offset + DriverDescriptor::SIZE],
            )?);
        }

        Ok(Self {
            block_size: get_u16(block, OFF_BLOCK_SIZE),
            block_count: get_u32(block, OFF_BLOCK_COUNT),
            device_type: get_u16(block, OFF_DEV_TYPE),
            device_id: get_u16(block, OFF_DEV_ID),
            data: get_u32(block, OFF_DATA),
            descriptors,
        })
    }

    /// Encode to a full record, zero-filling unused descriptors and padding.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut block = [0u8; RECORD_SIZE];

        put_u16(&mut block, OFF_SIG, DRIVER_MAP_MAGIC);
        put_u16(&mut block, OFF_BLOCK_SIZE, self.block_size);
        put_u32(&mut block, OFF_BLOCK_COUNT, self.block_count);
        put_u16(&mut block, OFF_DEV_TYPE, self.device_type);
        put_u16(&mut block, OFF_DEV_ID, self.device_id);
        put_u32(&mut block, OFF_DATA, self.data);
        put_u16(&mut block, OFF_DRVR_COUNT, self.descriptors.len() as u16);

        for (i, descriptor) in self.descriptors.iter().enumerate() {
            let offset = OFF_DESCRIPTORS + i * DriverDescriptor::SIZE;
            descriptor.write_to(&mut block[offset..offset + DriverDescriptor::SIZE]);
        }

        block
    }

    /// Append a descriptor.
    ///
    /// Fails once the table already holds [`MAX_DESCRIPTORS`] entries.
    pub fn push(&mut self, descriptor: DriverDescriptor) -> Result<()> {
        if self.descriptors.len() >= MAX_DESCRIPTORS {
            return Err(FormatError::TooManyDescriptors(
                (self.descriptors.len() + 1) as u16,
            ));
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Descriptors in table order.
    pub fn descriptors(&self) -> &[DriverDescriptor] {
        &self.descriptors
    }

    /// Number of driver descriptors.
    pub fn drvr_count(&self) -> u16 {
        self.descriptors.len() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DriverDescriptorMap {
        let mut map = DriverDescriptorMap::new(512, 0x0001_0000);
        map.push(DriverDescriptor {
            start_block: 4,
            size_blocks: 2,
            driver_type: DRIVER_TYPE_MACINTOSH,
        })
        .unwrap();
        map.push(DriverDescriptor {
            start_block: 6,
            size_blocks: 0x20,
            driver_type: 0x0701,
        })
        .unwrap();
        map
    }

    #[test]
    fn test_field_offsets() {
        let block = sample().to_bytes();

        assert_eq!(&block[0..2], &[0x45, 0x52]);
        assert_eq!(&block[2..4], &[0x02, 0x00]);
        assert_eq!(&block[4..8], &[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(&block[8..10], &[0x00, 0x01]);
        assert_eq!(&block[10..12], &[0x00, 0x01]);
        assert_eq!(&block[12..16], &[0, 0, 0, 0]);
        assert_eq!(&block[16..18], &[0x00, 0x02]);

        // first descriptor
        assert_eq!(&block[18..22], &[0, 0, 0, 4]);
        assert_eq!(&block[22..24], &[0, 2]);
        assert_eq!(&block[24..26], &[0, 1]);

        // second descriptor
        assert_eq!(&block[26..30], &[0, 0, 0, 6]);
        assert_eq!(&block[30..32], &[0, 0x20]);
        assert_eq!(&block[32..34], &[0x07, 0x01]);

        assert!(block[34..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_parse_encoded_map() {
        let map = sample();
        let parsed = DriverDescriptorMap::from_bytes(&map.to_bytes()).unwrap();
        assert_eq!(parsed, map);
        assert_eq!(parsed.drvr_count(), 2);
        assert_eq!(parsed.descriptors()[1].end_block(), 0x26);
    }

    #[test]
    fn test_rejects_short_input() {
        let block = sample().to_bytes();
        assert_eq!(
            DriverDescriptorMap::from_bytes(&block[..511]),
            Err(FormatError::Truncated {
                expected: 512,
                actual: 511
            })
        );
    }

    #[test]
    fn test_rejects_bad_signature() {
        let mut block = sample().to_bytes();
        block[0] = 0x50;
        block[1] = 0x4D;
        assert_eq!(
            DriverDescriptorMap::from_bytes(&block),
            Err(FormatError::BadSignature {
                record: "driver map",
                expected: DRIVER_MAP_MAGIC,
                found: 0x504D
            })
        );
    }

    #[test]
    fn test_rejects_oversized_count() {
        let mut block = DriverDescriptorMap::new(512, 8).to_bytes();
        block[16] = 0;
        block[17] = 62;
        assert_eq!(
            DriverDescriptorMap::from_bytes(&block),
            Err(FormatError::TooManyDescriptors(62))
        );
    }

    #[test]
    fn test_full_table_fits_in_block() {
        let mut map = DriverDescriptorMap::new(512, 1000);
        for i in 0..MAX_DESCRIPTORS as u32 {
            map.push(DriverDescriptor {
                start_block: 4 + i,
                size_blocks: 1,
                driver_type: 1,
            })
            .unwrap();
        }
        assert!(map.push(DriverDescriptor::default()).is_err());

        let block = map.to_bytes();
        // last descriptor ends right before the padding
        assert_eq!(&block[498..502], &[0, 0, 0, 64]);
        assert_eq!(&block[506..512], &[0; 6]);
        assert_eq!(DriverDescriptorMap::from_bytes(&block).unwrap(), map);
    }
}
