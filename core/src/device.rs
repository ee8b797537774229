//! Block access to raw device files.
//!
//! Wraps any seekable read/write handle (a `/dev` node, a disk image, or an
//! in-memory cursor in tests) and lends it out as a `gpt_disk_io`
//! [`BlockIoAdapter`], so extraction and installation address the medium in
//! blocks.
//!
//! The block size is not fixed for the life of the handle. The extractor
//! reads block 0 with the 512-byte record size, then switches to whatever
//! block size the driver map records. Each call to [`Device::blocks`]
//! builds an adapter at the current size.

use std::io::{self, Read, Seek, SeekFrom, Write};

use apm::RECORD_SIZE;
use gpt_disk_io::{BlockIo, BlockIoAdapter};
use gpt_disk_types::{BlockSize, Lba};

use crate::error::{Error, Result};

/// Device handle with a switchable block size.
pub struct Device<T> {
    storage: T,
    block_size: BlockSize,
}

impl<T: Read + Write + Seek> Device<T> {
    /// Wrap a handle using 512-byte blocks.
    pub fn new(storage: T) -> Self {
        Self {
            storage,
            block_size: BlockSize::BS_512,
        }
    }

    /// Switch to a different block size.
    ///
    /// Block sizes below 512 bytes cannot hold a partition map record and
    /// are rejected.
    pub fn set_block_size(&mut self, bytes: u16) -> Result<()> {
        self.block_size =
            BlockSize::new(u32::from(bytes)).ok_or(Error::UnsupportedBlockSize(bytes.into()))?;
        Ok(())
    }

    /// Block size in bytes.
    pub fn block_bytes(&self) -> u64 {
        self.block_size.to_u64()
    }

    /// Borrow the handle as a [`BlockIo`] at the current block size.
    ///
    /// Buffers handed to the adapter must be a whole number of blocks.
    pub fn blocks(&mut self) -> BlockIoAdapter<&mut T> {
        BlockIoAdapter::new(&mut self.storage, self.block_size)
    }

    /// Total length of the device in bytes.
    ///
    /// The stream position is restored afterwards.
    pub fn byte_len(&mut self) -> io::Result<u64> {
        let current = self.storage.stream_position()?;
        let len = self.storage.seek(SeekFrom::End(0))?;
        self.storage.seek(SeekFrom::Start(current))?;
        Ok(len)
    }

    /// Get a reference to the wrapped handle.
    pub fn get_ref(&self) -> &T {
        &self.storage
    }

    /// Unwrap the handle.
    pub fn into_inner(self) -> T {
        self.storage
    }
}

/// Read one whole block.
pub fn read_block<B: BlockIo>(
    block_io: &mut B,
    lba: Lba,
) -> core::result::Result<Vec<u8>, B::Error> {
    let mut block = vec![0u8; block_io.block_size().to_u64() as usize];
    block_io.read_blocks(lba, &mut block)?;
    Ok(block)
}

/// Read the 512-byte record at the start of block `lba`.
pub fn read_record<B: BlockIo>(
    block_io: &mut B,
    lba: Lba,
) -> core::result::Result<[u8; RECORD_SIZE], B::Error> {
    let block = read_block(block_io, lba)?;
    let mut record = [0u8; RECORD_SIZE];
    record.copy_from_slice(&block[..RECORD_SIZE]);
    Ok(record)
}

/// Write a byte run starting at the beginning of block `lba`.
///
/// A trailing partial block is read, patched and written back, so bytes
/// past the end of `data` keep their previous contents.
pub fn write_bytes<B: BlockIo>(
    block_io: &mut B,
    lba: Lba,
    data: &[u8],
) -> core::result::Result<(), B::Error> {
    let block_size = block_io.block_size().to_u64() as usize;
    let whole = data.len() / block_size * block_size;

    if whole > 0 {
        block_io.write_blocks(lba, &data[..whole])?;
    }

    let tail = &data[whole..];
    if !tail.is_empty() {
        let tail_lba = Lba(lba.0 + (whole / block_size) as u64);
        let mut block = read_block(block_io, tail_lba)?;
        block[..tail.len()].copy_from_slice(tail);
        block_io.write_blocks(tail_lba, &block)?;
    }

    Ok(())
}
