//! Partition Map Entry.
//!
//! From Inside Macintosh: Devices, SCSI Manager pp 13-14. The partition map
//! begins on physical block 1, one entry per block. With the exception of
//! block 0, every block on the disk belongs to exactly one partition.
//!
//! # Layout
//!
//! ```text
//! offset  size  field
//!      0     2  signature (0x504D, "PM")
//!      2     2  (reserved)
//!      4     4  number of blocks in partition map
//!      8     4  first physical block of partition
//!     12     4  number of blocks in partition
//!     16    32  partition name
//!     48    32  partition type
//!     80     4  first logical block of data area
//!     84     4  number of blocks in data area
//!     88     4  partition status
//!     92     4  first logical block of boot code
//!     96     4  boot code size in bytes
//!    100     4  boot code load address
//!    104     4  (reserved)
//!    108     4  boot code entry point
//!    112     4  (reserved)
//!    116     4  boot code checksum
//!    120    16  processor type
//!    136   376  reserved / bootstrap parameters
//! ```

use crate::endian::{get_u16, get_u32, put_u16, put_u32};
use crate::error::{FormatError, Result};
use crate::{fixed_str, set_fixed_str, RECORD_SIZE};

/// Partition map entry signature.
pub const PART_MAP_ENTRY_MAGIC: u16 = 0x504D;

/// Size of the trailing reserved/bootstrap parameter area.
pub const RESERVED_SIZE: usize = 376;

/// Processor string written by the installer.
pub const PROCESSOR_68000: &str = "68000";

/// Partition status bits, from Apple Tech Note 1189.
pub mod status {
    pub const VALID: u32 = 0x0000_0001; // Entry is valid
    pub const ALLOCATED: u32 = 0x0000_0002; // Entry is allocated
    pub const IN_USE: u32 = 0x0000_0004; // Entry in use
    pub const BOOT_INFO: u32 = 0x0000_0008; // Entry contains boot info
    pub const READABLE: u32 = 0x0000_0010;
    pub const WRITABLE: u32 = 0x0000_0020;
    pub const BOOT_CODE_PIC: u32 = 0x0000_0040; // Boot code is position independent
    pub const CC_DRVR: u32 = 0x0000_0100; // Chain-compatible driver
    pub const RL_DRVR: u32 = 0x0000_0200; // Real driver
    pub const CH_DRVR: u32 = 0x0000_0400; // Chain driver
    pub const AUTO_MOUNT: u32 = 0x4000_0000; // Mount automatically at startup
    pub const STARTUP: u32 = 0x8000_0000; // Is the startup partition

    /// Flags set on a bootable single data partition.
    pub const BOOTABLE: u32 =
        VALID | ALLOCATED | IN_USE | BOOT_INFO | READABLE | WRITABLE | BOOT_CODE_PIC;
}

/// Well-known partition type strings.
pub mod part_type {
    pub const DRIVER: &str = "Apple_Driver";
    pub const DRIVER43: &str = "Apple_Driver43";
    pub const DRIVER_ATA: &str = "Apple_Driver_ATA";
    pub const DRIVER_IOKIT: &str = "Apple_Driver_IOKit";
    pub const FW_DRIVER: &str = "Apple_FWDriver";
    pub const FREE: &str = "Apple_Free";
    pub const HFS: &str = "Apple_HFS";
    pub const PATCHES: &str = "Apple_Patches";
    pub const PARTITION_MAP: &str = "Apple_partition_map";
    pub const SCRATCH: &str = "Apple_Scratch";
    pub const UNIX: &str = "Apple_UNIX_SVR2";
}

const OFF_SIG: usize = 0;
const OFF_SIG_PAD: usize = 2;
const OFF_MAP_BLOCK_COUNT: usize = 4;
const OFF_PHYSICAL_START: usize = 8;
const OFF_PHYSICAL_COUNT: usize = 12;
const OFF_NAME: usize = 16;
const OFF_TYPE: usize = 48;
const OFF_DATA_START: usize = 80;
const OFF_DATA_COUNT: usize = 84;
const OFF_STATUS: usize = 88;
const OFF_BOOT_START: usize = 92;
const OFF_BOOT_SIZE: usize = 96;
const OFF_BOOT_LOAD: usize = 100;
const OFF_BOOT_LOAD2: usize = 104;
const OFF_BOOT_ENTRY: usize = 108;
const OFF_BOOT_ENTRY2: usize = 112;
const OFF_BOOT_CHECKSUM: usize = 116;
const OFF_PROCESSOR: usize = 120;
const OFF_RESERVED: usize = 136;

/// Partition Map Entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMapEntry {
    pub sig_pad: u16,
    /// Number of blocks in the partition map
    pub map_block_count: u32,
    /// First physical block of the partition
    pub physical_start: u32,
    /// Number of blocks in the partition
    pub physical_block_count: u32,
    pub name: [u8; 32],
    pub part_type: [u8; 32],
    /// First logical block of the data area
    pub logical_data_start: u32,
    /// Number of blocks in the data area
    pub data_count: u32,
    /// Status bits, see [`status`]
    pub status: u32,
    pub logical_boot_start: u32,
    pub boot_size: u32,
    pub boot_load: u32,
    pub boot_load2: u32,
    pub boot_entry: u32,
    pub boot_entry2: u32,
    pub boot_checksum: u32,
    pub processor: [u8; 16],
    /// Reserved area, carries bootstrap parameters on some media
    pub reserved: [u8; RESERVED_SIZE],
}

impl Default for PartitionMapEntry {
    fn default() -> Self {
        Self {
            sig_pad: 0,
            map_block_count: 0,
            physical_start: 0,
            physical_block_count: 0,
            name: [0; 32],
            part_type: [0; 32],
            logical_data_start: 0,
            data_count: 0,
            status: 0,
            logical_boot_start: 0,
            boot_size: 0,
            boot_load: 0,
            boot_load2: 0,
            boot_entry: 0,
            boot_entry2: 0,
            boot_checksum: 0,
            processor: [0; 16],
            reserved: [0; RESERVED_SIZE],
        }
    }
}

impl PartitionMapEntry {
    /// Parse a partition map entry, verifying its signature.
    pub fn from_bytes(block: &[u8]) -> Result<Self> {
        check_len(block)?;

        let sig = get_u16(block, OFF_SIG);
        if sig != PART_MAP_ENTRY_MAGIC {
            return Err(FormatError::BadSignature {
                record: "partition map entry",
                expected: PART_MAP_ENTRY_MAGIC,
                found: sig,
            });
        }

        let mut entry = Self {
            sig_pad: get_u16(block, OFF_SIG_PAD),
            map_block_count: get_u32(block, OFF_MAP_BLOCK_COUNT),
            physical_start: get_u32(block, OFF_PHYSICAL_START),
            physical_block_count: get_u32(block, OFF_PHYSICAL_COUNT),
            logical_data_start: get_u32(block, OFF_DATA_START),
            data_count: get_u32(block, OFF_DATA_COUNT),
            status: get_u32(block, OFF_STATUS),
            logical_boot_start: get_u32(block, OFF_BOOT_START),
            boot_size: get_u32(block, OFF_BOOT_SIZE),
            boot_load: get_u32(block, OFF_BOOT_LOAD),
            boot_load2: get_u32(block, OFF_BOOT_LOAD2),
            boot_entry: get_u32(block, OFF_BOOT_ENTRY),
            boot_entry2: get_u32(block, OFF_BOOT_ENTRY2),
            boot_checksum: get_u32(block, OFF_BOOT_CHECKSUM),
            ..Self::default()
        };
        entry.name.copy_from_slice(&block[OFF_NAME..OFF_NAME + 32]);
        entry.part_type.copy_from_slice(&block[OFF_TYPE..OFF_TYPE + 32]);
        entry
            .processor
            .copy_from_slice(&block[OFF_PROCESSOR..OFF_PROCESSOR + 16]);
        entry.reserved = Self::read_reserved(block)?;

        Ok(entry)
    }

    /// Pull only the reserved/bootstrap area out of a block.
    ///
    /// The signature is not checked; drivers can be dumped from media whose
    /// partition map is not otherwise trusted.
    pub fn read_reserved(block: &[u8]) -> Result<[u8; RESERVED_SIZE]> {
        check_len(block)?;

        let mut reserved = [0u8; RESERVED_SIZE];
        reserved.copy_from_slice(&block[OFF_RESERVED..OFF_RESERVED + RESERVED_SIZE]);
        Ok(reserved)
    }

    /// Encode to a full record.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut block = [0u8; RECORD_SIZE];

        put_u16(&mut block, OFF_SIG, PART_MAP_ENTRY_MAGIC);
        put_u16(&mut block, OFF_SIG_PAD, self.sig_pad);
        put_u32(&mut block, OFF_MAP_BLOCK_COUNT, self.map_block_count);
        put_u32(&mut block, OFF_PHYSICAL_START, self.physical_start);
        put_u32(&mut block, OFF_PHYSICAL_COUNT, self.physical_block_count);
        block[OFF_NAME..OFF_NAME + 32].copy_from_slice(&self.name);
        block[OFF_TYPE..OFF_TYPE + 32].copy_from_slice(&self.part_type);
        put_u32(&mut block, OFF_DATA_START, self.logical_data_start);
        put_u32(&mut block, OFF_DATA_COUNT, self.data_count);
        put_u32(&mut block, OFF_STATUS, self.status);
        put_u32(&mut block, OFF_BOOT_START, self.logical_boot_start);
        put_u32(&mut block, OFF_BOOT_SIZE, self.boot_size);
        put_u32(&mut block, OFF_BOOT_LOAD, self.boot_load);
        put_u32(&mut block, OFF_BOOT_LOAD2, self.boot_load2);
        put_u32(&mut block, OFF_BOOT_ENTRY, self.boot_entry);
        put_u32(&mut block, OFF_BOOT_ENTRY2, self.boot_entry2);
        put_u32(&mut block, OFF_BOOT_CHECKSUM, self.boot_checksum);
        block[OFF_PROCESSOR..OFF_PROCESSOR + 16].copy_from_slice(&self.processor);
        block[OFF_RESERVED..].copy_from_slice(&self.reserved);

        block
    }

    pub fn name_str(&self) -> &str {
        fixed_str(&self.name)
    }

    pub fn type_str(&self) -> &str {
        fixed_str(&self.part_type)
    }

    pub fn processor_str(&self) -> &str {
        fixed_str(&self.processor)
    }

    pub fn set_name(&mut self, name: &str) {
        set_fixed_str(&mut self.name, name);
    }

    pub fn set_type(&mut self, part_type: &str) {
        set_fixed_str(&mut self.part_type, part_type);
    }

    pub fn set_processor(&mut self, processor: &str) {
        set_fixed_str(&mut self.processor, processor);
    }

    /// Check if every flag in `flags` is set.
    pub fn has_status(&self, flags: u32) -> bool {
        self.status & flags == flags
    }
}

fn check_len(block: &[u8]) -> Result<()> {
    if block.len() < RECORD_SIZE {
        return Err(FormatError::Truncated {
            expected: RECORD_SIZE,
            actual: block.len(),
        });
    }
    Ok(())
}
