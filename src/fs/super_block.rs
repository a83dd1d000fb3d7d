use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{BlockId, BASE_BLOCK_SIZE},
    fs::{
        config::{EXT2_SUPER_MAGIC, GOOD_OLD_INODE_SIZE, MAX_LOG_BLOCK_SIZE},
        error::{FsckError, Result},
        ondisk,
    },
};

/// Leading fields of the ext2 superblock, in on-disk order.
///
/// Only the prefix up to `block_group_nr` is decoded; the rest of the
/// 1 KiB record is carried verbatim by the caller and never reinterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperBlock {
    pub inodes_count: u32,
    pub blocks_count: u32,
    pub r_blocks_count: u32,
    pub free_blocks_count: u32, // untrusted, reported only
    pub free_inodes_count: u32, // untrusted, reported only
    pub first_data_block: u32,
    pub log_block_size: u32,
    pub log_frag_size: u32,
    pub blocks_per_group: u32,
    pub frags_per_group: u32,
    pub inodes_per_group: u32,
    pub mtime: u32,
    pub wtime: u32,
    pub mnt_count: u16,
    pub max_mnt_count: u16,
    pub magic: u16,
    pub state: u16,
    pub errors: u16,
    pub minor_rev_level: u16,
    pub lastcheck: u32,
    pub checkinterval: u32,
    pub creator_os: u32,
    pub rev_level: u32,
    pub def_resuid: u16,
    pub def_resgid: u16,
    // revision 1 (dynamic) fields
    pub first_ino: u32,
    pub inode_size: u16,
    pub block_group_nr: u16,
}

/// Decodes the superblock record and checks its magic.
pub fn parse_superblock(raw: &[u8]) -> Result<SuperBlock> {
    let sb: SuperBlock = ondisk().deserialize(raw)?;
    if sb.magic != EXT2_SUPER_MAGIC {
        return Err(FsckError::InvalidMagic(sb.magic));
    }
    Ok(sb)
}

impl SuperBlock {
    /// Re-encodes the decoded prefix over `raw`, leaving the tail untouched.
    pub fn encode_into(&self, raw: &mut [u8]) -> Result<()> {
        ondisk().serialize_into(raw, self)?;
        Ok(())
    }

    pub fn block_size(&self) -> Option<usize> {
        if self.log_block_size > MAX_LOG_BLOCK_SIZE {
            return None;
        }
        Some(BASE_BLOCK_SIZE << self.log_block_size)
    }

    /// Revision 0 images have no inode_size field and use 128-byte inodes.
    pub fn effective_inode_size(&self) -> u32 {
        if self.rev_level == 0 || self.inode_size == 0 {
            GOOD_OLD_INODE_SIZE
        } else {
            u32::from(self.inode_size)
        }
    }
}

/// First block covered by bit 0 of group 0's block bitmap.
///
/// With 1 KiB blocks block 0 holds the boot region and superblock, so
/// allocation starts at block 1; larger blocks start at block 0.
pub fn first_data_block(block_size: usize) -> BlockId {
    if block_size > BASE_BLOCK_SIZE {
        0
    } else {
        1
    }
}

pub fn group_count(block_count: u64, blocks_per_group: u64) -> u64 {
    block_count.div_ceil(blocks_per_group)
}

/// Numbers derived once from the superblock and shared by every group pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub block_size: usize,
    pub blocks_per_group: u64,
    pub inodes_per_group: u64,
    pub block_count: u64,
    pub inode_count: u64,
    pub inode_size: u64,
    pub group_count: u64,
}

impl Geometry {
    pub fn from_super_block(sb: &SuperBlock) -> Result<Self> {
        let block_size = sb.block_size().ok_or_else(|| {
            FsckError::InvalidGeometry(format!("log_block_size {} too large", sb.log_block_size))
        })?;
        if sb.blocks_per_group == 0 {
            return Err(FsckError::InvalidGeometry("blocks_per_group is zero".into()));
        }
        if sb.inodes_per_group == 0 {
            return Err(FsckError::InvalidGeometry("inodes_per_group is zero".into()));
        }
        if sb.effective_inode_size() as usize > block_size {
            return Err(FsckError::InvalidGeometry(format!(
                "inode_size {} larger than block size {}",
                sb.effective_inode_size(),
                block_size
            )));
        }

        let blocks_per_group = u64::from(sb.blocks_per_group);
        let block_count = u64::from(sb.blocks_count);
        Ok(Self {
            block_size,
            blocks_per_group,
            inodes_per_group: u64::from(sb.inodes_per_group),
            block_count,
            inode_count: u64::from(sb.inodes_count),
            inode_size: u64::from(sb.effective_inode_size()),
            group_count: group_count(block_count, blocks_per_group),
        })
    }

    /// Blocks spanned by one group's inode table, rounded up.
    pub fn inode_table_blocks(&self) -> u64 {
        (self.inodes_per_group * self.inode_size).div_ceil(self.block_size as u64)
    }

    /// Absolute block number described by bit `offset` of `group`'s block bitmap.
    pub fn block_number(&self, group: u64, offset: u64) -> BlockId {
        group * self.blocks_per_group + offset + first_data_block(self.block_size)
    }

    /// Global (1-based) inode number described by bit `offset` of `group`'s inode bitmap.
    pub fn inode_number(&self, group: u64, offset: u64) -> u64 {
        group * self.inodes_per_group + offset + 1
    }
}
