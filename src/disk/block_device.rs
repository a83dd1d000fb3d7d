use crate::{
    disk::types::{block_offset, BlockId},
    fs::error::Result,
};

/// Positional access to the backing image.
///
/// Every transfer moves exactly `buf.len()` bytes or fails with
/// `FsckError::ShortTransfer`. Nothing is cached: each call goes straight to
/// the backing store.
pub trait BlockDevice {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;

    /// Reads block `block_id`; the buffer length is the block size.
    fn read_block(&mut self, block_id: BlockId, buf: &mut [u8]) -> Result<()> {
        self.read_at(block_offset(block_id, buf.len()), buf)
    }

    /// Writes block `block_id`; the buffer length is the block size.
    fn write_block(&mut self, block_id: BlockId, buf: &[u8]) -> Result<()> {
        self.write_at(block_offset(block_id, buf.len()), buf)
    }
}
