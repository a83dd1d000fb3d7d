use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{BlockDevice, BlockId},
    fs::{
        config::{GROUP_DESC_SIZE, GROUP_DESC_TABLE_OFFSET},
        error::{FsckError, Result},
        ondisk,
    },
};

/// One 32-byte block group descriptor.
///
/// The counters are whatever the last writer left behind; they are reported
/// against the computed values but never trusted or rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDescriptor {
    pub block_bitmap: u32,
    pub inode_bitmap: u32,
    pub inode_table: u32,
    pub free_blocks_count: u16,
    pub free_inodes_count: u16,
    pub used_dirs_count: u16,
    pub pad: u16,
    pub reserved: [u32; 3],
}

impl GroupDescriptor {
    pub fn block_bitmap(&self) -> BlockId {
        BlockId::from(self.block_bitmap)
    }

    pub fn inode_bitmap(&self) -> BlockId {
        BlockId::from(self.inode_bitmap)
    }

    pub fn inode_table(&self) -> BlockId {
        BlockId::from(self.inode_table)
    }
}

fn table_len(group_count: u64) -> usize {
    group_count as usize * GROUP_DESC_SIZE
}

/// Reads the whole descriptor table in one transfer. A short read is fatal.
pub fn load_descriptors<D: BlockDevice>(
    disk: &mut D,
    group_count: u64,
) -> Result<Vec<GroupDescriptor>> {
    let mut raw = vec![0u8; table_len(group_count)];
    disk.read_at(GROUP_DESC_TABLE_OFFSET, &mut raw)?;

    raw.chunks_exact(GROUP_DESC_SIZE)
        .map(|record| {
            ondisk()
                .deserialize::<GroupDescriptor>(record)
                .map_err(FsckError::from)
        })
        .collect()
}

/// Writes the descriptor table back to its original position.
pub fn store_descriptors<D: BlockDevice>(disk: &mut D, table: &[GroupDescriptor]) -> Result<()> {
    let mut raw = vec![0u8; table_len(table.len() as u64)];
    for (desc, slot) in table.iter().zip(raw.chunks_exact_mut(GROUP_DESC_SIZE)) {
        ondisk().serialize_into(slot, desc)?;
    }
    disk.write_at(GROUP_DESC_TABLE_OFFSET, &raw)
}
