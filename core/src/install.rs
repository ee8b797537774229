//! Single-partition installation.
//!
//! Lays out a bootable device with one data partition:
//!
//! ```text
//! block 0              driver descriptor map
//! block 1              partition map entry
//! blocks 2..4          unused (reserved for the map)
//! blocks 4..ffb        driver payloads from the dump, padded to 4 blocks
//! blocks ffb..         data partition, starting with the boot block image
//! ```
//!
//! Writes are not transactional. A failure part way leaves the blocks
//! written so far in place; running the installer again rewrites blocks 0,
//! 1 and the boot block region from scratch.

use std::fmt;
use std::io::{Read, Seek, Write};

use apm::driver_map::MAX_DESCRIPTORS;
use apm::partition::PROCESSOR_68000;
use apm::{status, DriverDescriptor, DriverDescriptorMap, PartitionMapEntry};
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;
use log::{debug, info};

use crate::device::{write_bytes, Device};
use crate::dump::{DumpHeader, DumpReader};
use crate::error::{Error, IoContext, Result};
use crate::{BOOT_BLOCK_SIZE, RESERVED_BLOCKS};

/// Block size used when no dump overrides it.
pub const DEFAULT_BLOCK_SIZE: u16 = 512;

/// Progress through an invocation.
///
/// Any failure is terminal; the stage only records how far the device
/// was modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstallStage {
    DeviceOpened,
    ExtractDone,
    DriverMapWritten,
    PartitionEntryWritten,
    BootBlockWritten,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DeviceOpened => "device opened",
            Self::ExtractDone => "drivers extracted",
            Self::DriverMapWritten => "driver map written",
            Self::PartitionEntryWritten => "partition entry written",
            Self::BootBlockWritten => "boot block written",
        };
        f.write_str(name)
    }
}

/// Resulting layout of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub block_size: u16,
    pub block_count: u32,
    pub drivers: Vec<DriverDescriptor>,
    /// First block of the data partition
    pub first_free_block: u32,
    pub partition_blocks: u32,
}

/// Install a driver map, one partition and a boot block onto `device`.
///
/// `device_len` is the total device length in bytes. When `dump` is given,
/// its block size replaces [`DEFAULT_BLOCK_SIZE`], its drivers are copied to
/// the device from block 4 on, and its bootstrap area populates the
/// partition map entry; without one the bootstrap area is zero-filled.
/// Exactly [`BOOT_BLOCK_SIZE`] bytes are read from `boot_block`.
pub fn install_single_partition<T, D, B>(
    device: &mut Device<T>,
    device_len: u64,
    dump: Option<D>,
    boot_block: B,
) -> Result<InstallReport>
where
    T: Read + Write + Seek,
    D: Read,
    B: Read,
{
    let mut installer = Installer {
        device,
        stage: InstallStage::DeviceOpened,
    };

    match installer.run(device_len, dump.map(DumpReader::new), boot_block) {
        Ok(report) => Ok(report),
        // the map and partition entry are untouched
        Err(e) if installer.stage == InstallStage::DeviceOpened => Err(e),
        Err(e) => Err(Error::Install {
            stage: installer.stage,
            source: Box::new(e),
        }),
    }
}

struct Installer<'a, T> {
    device: &'a mut Device<T>,
    stage: InstallStage,
}

impl<T: Read + Write + Seek> Installer<'_, T> {
    fn run<D: Read, B: Read>(
        &mut self,
        device_len: u64,
        mut dump: Option<DumpReader<D>>,
        mut boot_block: B,
    ) -> Result<InstallReport> {
        let header = dump.as_mut().map(DumpReader::read_header).transpose()?;
        let block_size = header
            .as_ref()
            .map_or(DEFAULT_BLOCK_SIZE, |header| header.block_size);

        self.device.set_block_size(block_size)?;
        let block_bytes = self.device.block_bytes();
        let total_blocks = device_len / block_bytes;
        let block_count = fit_u32("block count", total_blocks)?;
        let boot_blocks = (BOOT_BLOCK_SIZE as u64).div_ceil(block_bytes);

        check_fits(RESERVED_BLOCKS as u64 + boot_blocks, total_blocks)?;

        let mut map = DriverDescriptorMap::new(block_size, block_count);
        let mut next_block = RESERVED_BLOCKS as u64;

        if let Some(reader) = dump.as_mut() {
            next_block = self.copy_drivers(reader, &mut map, next_block, total_blocks)?;
        }

        let first_free_block = fit_u32("first free block", next_block.next_multiple_of(4))?;
        check_fits(first_free_block as u64 + boot_blocks, total_blocks)?;

        write_bytes(&mut self.device.blocks(), Lba(0), &map.to_bytes())
            .context("failed to write to device")?;
        self.advance(InstallStage::DriverMapWritten);
        info!(
            "wrote driver map: {} blocks of {} bytes, {} drivers",
            block_count,
            block_size,
            map.drvr_count()
        );

        let entry = partition_entry(first_free_block, block_count, header.as_ref());
        write_bytes(&mut self.device.blocks(), Lba(1), &entry.to_bytes())
            .context("failed to write to device")?;
        self.advance(InstallStage::PartitionEntryWritten);
        info!(
            "wrote partition entry: blocks {}..{}",
            first_free_block, block_count
        );

        let mut image = vec![0u8; BOOT_BLOCK_SIZE];
        boot_block
            .read_exact(&mut image)
            .context("failed to read boot block file")?;
        let mut blocks = self.device.blocks();
        write_bytes(&mut blocks, Lba(first_free_block as u64), &image)
            .context("failed to write to device")?;
        blocks.flush().context("failed to write to device")?;
        self.advance(InstallStage::BootBlockWritten);

        Ok(InstallReport {
            block_size,
            block_count,
            drivers: map.descriptors().to_vec(),
            first_free_block,
            partition_blocks: entry.physical_block_count,
        })
    }

    /// Copy every dump record to consecutive blocks starting at `next_block`.
    ///
    /// Returns the block after the last one written.
    fn copy_drivers<D: Read>(
        &mut self,
        reader: &mut DumpReader<D>,
        map: &mut DriverDescriptorMap,
        mut next_block: u64,
        total_blocks: u64,
    ) -> Result<u64> {
        let mut blocks = self.device.blocks();
        let mut buffer = vec![0u8; blocks.block_size().to_u64() as usize];

        while let Some(record) = reader.next_record()? {
            if map.drvr_count() as usize >= MAX_DESCRIPTORS {
                return Err(Error::TooManyDrivers {
                    max: MAX_DESCRIPTORS,
                });
            }

            let start_block = fit_u32("driver start block", next_block)?;
            check_fits(next_block + record.size_blocks as u64, total_blocks)?;

            for _ in 0..record.size_blocks {
                reader.read_block(&mut buffer)?;
                blocks
                    .write_blocks(Lba(next_block), &buffer)
                    .context("failed to write to device")?;
                next_block += 1;
            }

            map.push(DriverDescriptor {
                start_block,
                size_blocks: record.size_blocks,
                driver_type: record.driver_type,
            })?;
            debug!(
                "copied driver type {} to block {} ({} blocks)",
                record.driver_type, start_block, record.size_blocks
            );
        }

        Ok(next_block)
    }

    fn advance(&mut self, stage: InstallStage) {
        self.stage = stage;
        debug!("{}", stage);
    }
}

fn partition_entry(
    first_free_block: u32,
    block_count: u32,
    header: Option<&DumpHeader>,
) -> PartitionMapEntry {
    let data_blocks = block_count - first_free_block;
    let mut entry = PartitionMapEntry {
        map_block_count: 1,
        physical_start: first_free_block,
        physical_block_count: data_blocks,
        data_count: data_blocks,
        status: status::BOOTABLE,
        ..PartitionMapEntry::default()
    };
    entry.set_processor(PROCESSOR_68000);
    if let Some(header) = header {
        entry.reserved = header.bootstrap;
    }
    entry
}

fn fit_u32(what: &'static str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::BlockCountOverflow { what, value })
}

fn check_fits(needed: u64, available: u64) -> Result<()> {
    if needed > available {
        return Err(Error::DeviceTooSmall { needed, available });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::{DriverRecordHeader, DumpWriter};
    use apm::driver_map::DRIVER_TYPE_MACINTOSH;
    use apm::partition::RESERVED_SIZE;
    use std::io::{self, Cursor};

    fn blank_device(blocks: usize) -> Device<Cursor<Vec<u8>>> {
        Device::new(Cursor::new(vec![0u8; blocks * 512]))
    }

    fn boot_image() -> Vec<u8> {
        (0..BOOT_BLOCK_SIZE).map(|i| (i % 253) as u8 + 1).collect()
    }

    fn dump_with(records: &[(u16, Vec<u8>)]) -> Vec<u8> {
        let mut writer = DumpWriter::new(Vec::new());
        let mut bootstrap = [0u8; RESERVED_SIZE];
        bootstrap[0] = 0x5A;
        writer
            .write_header(&DumpHeader {
                block_size: 512,
                bootstrap,
            })
            .unwrap();
        for (driver_type, payload) in records {
            writer
                .write_record_header(&DriverRecordHeader {
                    driver_type: *driver_type,
                    size_blocks: (payload.len() / 512) as u16,
                })
                .unwrap();
            writer.write_block(payload).unwrap();
        }
        writer.into_inner().unwrap()
    }

    fn install(
        device: &mut Device<Cursor<Vec<u8>>>,
        dump: Option<Vec<u8>>,
    ) -> Result<InstallReport> {
        let len = device.byte_len().unwrap();
        install_single_partition(device, len, dump.map(Cursor::new), Cursor::new(boot_image()))
    }

    #[test]
    fn test_install_without_dump() {
        let mut device = blank_device(100);
        let report = install(&mut device, None).unwrap();

        assert_eq!(report.first_free_block, 4);
        assert_eq!(report.partition_blocks, 96);

        let image = device.into_inner().into_inner();
        let map = DriverDescriptorMap::from_bytes(&image[..512]).unwrap();
        assert_eq!(map.block_size, 512);
        assert_eq!(map.block_count, 100);
        assert_eq!(map.drvr_count(), 0);
        assert_eq!((map.device_type, map.device_id), (1, 1));

        let entry = PartitionMapEntry::from_bytes(&image[512..1024]).unwrap();
        assert_eq!(entry.map_block_count, 1);
        assert_eq!(entry.physical_start, 4);
        assert_eq!(entry.physical_block_count, 96);
        assert_eq!(entry.data_count, 96);
        assert_eq!(entry.status, status::BOOTABLE);
        assert_eq!(&entry.processor, b"68000\0\0\0\0\0\0\0\0\0\0\0");
        assert_eq!(entry.reserved, [0u8; RESERVED_SIZE]);

        assert_eq!(&image[2048..3072], &boot_image()[..]);
        assert!(image[3072..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_install_places_single_driver() {
        let payload: Vec<u8> = (0..1024).map(|i| (i * 7 % 256) as u8).collect();
        let dump = dump_with(&[(DRIVER_TYPE_MACINTOSH, payload.clone())]);

        let mut device = blank_device(100);
        let report = install(&mut device, Some(dump)).unwrap();

        assert_eq!(
            report.drivers,
            vec![DriverDescriptor {
                start_block: 4,
                size_blocks: 2,
                driver_type: DRIVER_TYPE_MACINTOSH,
            }]
        );
        assert_eq!(report.first_free_block, 8);

        let image = device.into_inner().into_inner();
        assert_eq!(&image[2048..3072], &payload[..]);

        let entry = PartitionMapEntry::from_bytes(&image[512..1024]).unwrap();
        assert_eq!(entry.physical_start, 8);
        assert_eq!(entry.physical_block_count, 92);
        assert_eq!(entry.reserved[0], 0x5A);

        assert_eq!(&image[8 * 512..10 * 512], &boot_image()[..]);
    }

    #[test]
    fn test_empty_dump_matches_no_dump() {
        let mut device = blank_device(64);
        let report = install(&mut device, Some(dump_with(&[]))).unwrap();

        assert!(report.drivers.is_empty());
        assert_eq!(report.first_free_block, 4);
        assert_eq!(report.partition_blocks, 60);
    }

    #[test]
    fn test_drivers_pack_contiguously() {
        let dump = dump_with(&[(1, vec![0x11; 512 * 3]), (0x0701, vec![0x22; 512 * 4])]);

        let mut device = blank_device(40);
        let report = install(&mut device, Some(dump)).unwrap();

        let starts: Vec<u32> = report.drivers.iter().map(|d| d.start_block).collect();
        assert_eq!(starts, vec![4, 7]);
        // last write ends at block 11, rounded up to 12
        assert_eq!(report.first_free_block, 12);
        assert_eq!(report.partition_blocks, 28);
    }

    #[test]
    fn test_dump_block_size_overrides_default() {
        let mut writer = DumpWriter::new(Vec::new());
        writer
            .write_header(&DumpHeader {
                block_size: 1024,
                bootstrap: [0; RESERVED_SIZE],
            })
            .unwrap();
        writer
            .write_record_header(&DriverRecordHeader {
                driver_type: 1,
                size_blocks: 1,
            })
            .unwrap();
        writer.write_block(&[0x33; 1024]).unwrap();
        let dump = writer.into_inner().unwrap();

        let mut device = blank_device(64);
        let report = install(&mut device, Some(dump)).unwrap();

        assert_eq!(report.block_size, 1024);
        assert_eq!(report.block_count, 32);
        assert_eq!(report.first_free_block, 8);

        let image = device.into_inner().into_inner();
        assert!(image[4096..5120].iter().all(|&b| b == 0x33));
        // partition entry sits in block 1 of the 1024-byte layout
        let entry = PartitionMapEntry::from_bytes(&image[1024..1536]).unwrap();
        assert_eq!(entry.physical_start, 8);
        assert_eq!(&image[8192..9216], &boot_image()[..]);
    }

    #[test]
    fn test_too_many_drivers() {
        let records: Vec<(u16, Vec<u8>)> = (0..62).map(|_| (1, vec![0u8; 512])).collect();
        let mut device = blank_device(200);

        let err = install(&mut device, Some(dump_with(&records))).unwrap_err();
        assert!(matches!(err, Error::TooManyDrivers { max: 61 }));

        // the driver map was never written
        let image = device.into_inner().into_inner();
        assert!(image[..512].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_truncated_dump_header_fails_before_writing() {
        let mut device = blank_device(16);
        let err = install(&mut device, Some(vec![0x02, 0x00, 0x00])).unwrap_err();

        assert!(matches!(err, Error::MissingBootstrapParameters));
        assert!(device.into_inner().into_inner().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_device_too_small_for_drivers() {
        let dump = dump_with(&[(1, vec![0u8; 512 * 8])]);
        let mut device = blank_device(10);

        let err = install(&mut device, Some(dump)).unwrap_err();
        assert!(matches!(
            err,
            Error::DeviceTooSmall {
                needed: 12,
                available: 10
            }
        ));
    }

    #[test]
    fn test_short_boot_block_reports_stage() {
        let mut device = blank_device(16);
        let len = device.byte_len().unwrap();

        let err = install_single_partition(
            &mut device,
            len,
            None::<Cursor<Vec<u8>>>,
            Cursor::new(vec![0u8; 100]),
        )
        .unwrap_err();

        match &err {
            Error::Install { stage, .. } => {
                assert_eq!(*stage, InstallStage::PartitionEntryWritten)
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.io_kind(), Some(io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_reinstall_is_idempotent() {
        let mut device = blank_device(32);
        install(&mut device, None).unwrap();
        let first = device.get_ref().get_ref().clone();

        install(&mut device, None).unwrap();
        assert_eq!(device.get_ref().get_ref(), &first);
    }
}
