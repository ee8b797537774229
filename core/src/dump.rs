//! Driver dump file format.
//!
//! Portable archive of the drivers embedded in a device:
//!
//! ```text
//! u16be      block size in bytes
//! u8[376]    reserved/bootstrap area of the partition map entry
//! repeated until end of file:
//!   u16be    driver type
//!   u16be    driver size in blocks
//!   u8[..]   size * block size bytes of driver payload
//! ```
//!
//! There is no record count; readers consume records until the file ends
//! cleanly between two records.

use std::io::{self, Read, Write};

use apm::endian::{decode16, encode16};
use apm::partition::RESERVED_SIZE;

use crate::error::{Error, IoContext, Result};

/// Size of the dump header in bytes.
pub const HEADER_SIZE: usize = 2 + RESERVED_SIZE;

/// Leading block size and bootstrap parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpHeader {
    pub block_size: u16,
    pub bootstrap: [u8; RESERVED_SIZE],
}

/// Type and length of one driver payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverRecordHeader {
    pub driver_type: u16,
    pub size_blocks: u16,
}

/// Streaming dump writer.
pub struct DumpWriter<W> {
    inner: W,
}

impl<W: Write> DumpWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write only the block size field.
    ///
    /// Split from the bootstrap area because the extractor emits it before
    /// it has read the partition map entry.
    pub fn write_block_size(&mut self, block_size: u16) -> Result<()> {
        self.write(&encode16(block_size))
    }

    pub fn write_bootstrap(&mut self, bootstrap: &[u8; RESERVED_SIZE]) -> Result<()> {
        self.write(bootstrap)
    }

    pub fn write_header(&mut self, header: &DumpHeader) -> Result<()> {
        self.write_block_size(header.block_size)?;
        self.write_bootstrap(&header.bootstrap)
    }

    pub fn write_record_header(&mut self, record: &DriverRecordHeader) -> Result<()> {
        self.write(&encode16(record.driver_type))?;
        self.write(&encode16(record.size_blocks))
    }

    /// Append one block of driver payload.
    pub fn write_block(&mut self, block: &[u8]) -> Result<()> {
        self.write(block)
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.inner
            .flush()
            .context("failed to write to output file")?;
        Ok(self.inner)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner
            .write_all(bytes)
            .context("failed to write to output file")
    }
}

/// Streaming dump reader.
pub struct DumpReader<R> {
    inner: R,
    records_read: usize,
}

impl<R: Read> DumpReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            records_read: 0,
        }
    }

    /// Read the header.
    ///
    /// A file too short to hold the bootstrap area cannot supply the
    /// partition map entry's parameters and is rejected.
    pub fn read_header(&mut self) -> Result<DumpHeader> {
        let mut block_size = [0u8; 2];
        self.inner
            .read_exact(&mut block_size)
            .context("failed to read from driver dump")?;

        let mut bootstrap = [0u8; RESERVED_SIZE];
        match self.inner.read_exact(&mut bootstrap) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(Error::MissingBootstrapParameters);
            }
            Err(source) => {
                return Err(Error::Io {
                    context: "failed to read from driver dump",
                    source,
                });
            }
        }

        Ok(DumpHeader {
            block_size: decode16(block_size),
            bootstrap,
        })
    }

    /// Read the next record header, or `None` at a clean end of file.
    pub fn next_record(&mut self) -> Result<Option<DriverRecordHeader>> {
        let mut header = [0u8; 4];
        let filled = self.fill(&mut header)?;

        match filled {
            0 => Ok(None),
            4 => {
                self.records_read += 1;
                Ok(Some(DriverRecordHeader {
                    driver_type: decode16([header[0], header[1]]),
                    size_blocks: decode16([header[2], header[3]]),
                }))
            }
            _ => Err(Error::TruncatedRecord {
                index: self.records_read,
            }),
        }
    }

    /// Read one block of the current record's payload.
    pub fn read_block(&mut self, block: &mut [u8]) -> Result<()> {
        self.inner
            .read_exact(block)
            .context("failed to read from driver dump")
    }

    /// Number of record headers read so far.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(Error::Io {
                        context: "failed to read from driver dump",
                        source,
                    })
                }
            }
        }
        Ok(filled)
    }
}
