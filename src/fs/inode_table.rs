use bincode::Options;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{types::block_offset, BlockDevice, BlockId},
    fs::{error::Result, ondisk, super_block::Geometry},
};

bitflags! {
    /// `i_mode`: file format in the top nibble, permission bits below.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InodeMode: u16 {
        const S_IFSOCK = 0xC000;
        const S_IFLNK = 0xA000;
        const S_IFREG = 0x8000;
        const S_IFBLK = 0x6000;
        const S_IFDIR = 0x4000;
        const S_IFCHR = 0x2000;
        const S_IFIFO = 0x1000;
        const S_ISUID = 0x0800;
        const S_ISGID = 0x0400;
        const S_ISVTX = 0x0200;
        const PERMS = 0x01FF;
    }
}

impl InodeMode {
    const FORMAT_MASK: u16 = 0xF000;

    pub fn is_free(self) -> bool {
        self.bits() == 0
    }

    pub fn is_dir(self) -> bool {
        self.bits() & Self::FORMAT_MASK == Self::S_IFDIR.bits()
    }
}

/// Leading bytes of an inode record. Only the mode decides allocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct InodeHead {
    mode: u16,
}

/// Decodes the mode of one raw inode record.
pub fn decode_mode(record: &[u8]) -> Result<InodeMode> {
    let head: InodeHead = ondisk().deserialize(record)?;
    Ok(InodeMode::from_bits_retain(head.mode))
}

/// The contiguous run of blocks holding one group's inode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InodeTable {
    pub start: BlockId,
    pub blocks: u64,
}

impl InodeTable {
    pub fn new(start: BlockId, geometry: &Geometry) -> Self {
        Self {
            start,
            blocks: geometry.inode_table_blocks(),
        }
    }

    pub fn contains(&self, block: BlockId) -> bool {
        block >= self.start && block < self.start + self.blocks
    }

    /// Byte offset of the record for local inode `index`.
    pub fn record_offset(&self, index: u64, geometry: &Geometry) -> u64 {
        block_offset(self.start, geometry.block_size) + index * geometry.inode_size
    }

    /// Reads record `index` into `record` (sized to the inode size) and
    /// decodes its mode. A short read surfaces as `ShortTransfer`.
    pub fn read_mode<D: BlockDevice>(
        &self,
        disk: &mut D,
        index: u64,
        geometry: &Geometry,
        record: &mut [u8],
    ) -> Result<InodeMode> {
        disk.read_at(self.record_offset(index, geometry), record)?;
        decode_mode(record)
    }
}
