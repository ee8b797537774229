//! Driver extraction.
//!
//! Reads the driver map from block 0, then copies the bootstrap area of the
//! partition map entry and every listed driver into a dump file.
//!
//! On failure the dump is left on disk in whatever state it reached; the
//! caller is expected to discard it.

use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

use apm::{DriverDescriptor, DriverDescriptorMap, PartitionMapEntry};
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;
use log::debug;

use crate::device::{read_record, Device};
use crate::dump::{DriverRecordHeader, DumpWriter};
use crate::error::{IoContext, Result};

/// What an extraction copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub block_size: u16,
    pub drivers: Vec<DriverDescriptor>,
}

/// Dump the drivers of `device` into a new file at `output`.
pub fn extract_drivers<T: Read + Write + Seek>(
    device: &mut Device<T>,
    output: &Path,
) -> Result<ExtractReport> {
    let file = File::create(output).context("failed to open output file")?;
    let report = extract_to_writer(device, BufWriter::new(file))?;

    debug!("dumped drivers to {}", output.display());
    Ok(report)
}

/// Dump the drivers of `device` into any writer.
pub fn extract_to_writer<T: Read + Write + Seek, W: Write>(
    device: &mut Device<T>,
    output: W,
) -> Result<ExtractReport> {
    let mut dump = DumpWriter::new(output);

    // Block 0 is read with the record size; the real block size lives in it
    device.set_block_size(apm::RECORD_SIZE as u16)?;
    let record =
        read_record(&mut device.blocks(), Lba(0)).context("failed to read from device file")?;
    let map = DriverDescriptorMap::from_bytes(&record)?;

    dump.write_block_size(map.block_size)?;

    device.set_block_size(map.block_size)?;
    let mut blocks = device.blocks();
    let record = read_record(&mut blocks, Lba(1))
        .context("failed to read partition map header from device")?;
    dump.write_bootstrap(&PartitionMapEntry::read_reserved(&record)?)?;

    let mut buffer = vec![0u8; blocks.block_size().to_u64() as usize];

    for descriptor in map.descriptors() {
        dump.write_record_header(&DriverRecordHeader {
            driver_type: descriptor.driver_type,
            size_blocks: descriptor.size_blocks,
        })?;

        for lba in descriptor.start_block as u64..descriptor.end_block() {
            blocks
                .read_blocks(Lba(lba), &mut buffer)
                .context("failed to read from device file")?;
            dump.write_block(&buffer)?;
        }

        debug!(
            "extracted driver type {} at block {} ({} blocks)",
            descriptor.driver_type, descriptor.start_block, descriptor.size_blocks
        );
    }

    dump.into_inner()?;

    Ok(ExtractReport {
        block_size: map.block_size,
        drivers: map.descriptors().to_vec(),
    })
}
