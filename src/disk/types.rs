/// Absolute block number on the image.
pub type BlockId = u64;

/// Smallest ext2 block size; `1024 << log_block_size` scales from here.
pub const BASE_BLOCK_SIZE: usize = 1024;

/// Byte offset of `block_id` for a given block size.
pub fn block_offset(block_id: BlockId, block_size: usize) -> u64 {
    block_id * block_size as u64
}
