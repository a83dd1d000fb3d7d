//! Per-group bitmap verification and repair.
//!
//! Ground truth comes from the image itself: a block is in use iff it holds
//! a non-zero byte, an inode iff its mode is non-zero. Inode-table blocks and
//! the reserved inodes are forced "used" before any content is inspected.
//! An all-zero block that a file really owns is indistinguishable from a
//! free one and is marked free.

use std::ops::Range;

use log::{debug, trace, warn};

use crate::{
    disk::{BlockDevice, BlockId},
    fs::{
        bitmap::Bitmap,
        config::{
            GROUP_DESC_SIZE, GROUP_DESC_TABLE_OFFSET, RESERVED_INODES, SUPER_BLOCK_OFFSET,
            SUPER_BLOCK_SIZE,
        },
        error::{FsckError, Result},
        group_desc::GroupDescriptor,
        inode_table::InodeTable,
        report::GroupReport,
        super_block::Geometry,
    },
};

/// Which blocks are "used" by definition, without looking at their content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetadataPolicy {
    /// Only the group's inode table.
    #[default]
    InodeTable,
    /// The inode table plus the group's two bitmap blocks, and in group 0
    /// the blocks holding the superblock and descriptor table.
    Full,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairOptions {
    pub metadata: MetadataPolicy,
    pub dry_run: bool,
}

/// Blocks touched by the byte range `[offset, offset + len)`.
fn byte_span_blocks(offset: u64, len: u64, block_size: usize) -> Range<BlockId> {
    let bs = block_size as u64;
    offset / bs..(offset + len).div_ceil(bs)
}

/// Buffers acquired once per run and reused by every group.
struct Scratch {
    block_bitmap: Bitmap,
    inode_bitmap: Bitmap,
    buffer: Vec<u8>,
}

pub struct Verifier<'a, D> {
    disk: &'a mut D,
    geometry: Geometry,
    options: RepairOptions,
    block_scan_len: u64,
    inode_scan_len: u64,
    boot_metadata: Vec<Range<BlockId>>, // group 0 only, `Full` policy
    scratch: Scratch,
}

impl<'a, D: BlockDevice> Verifier<'a, D> {
    pub fn new(disk: &'a mut D, geometry: Geometry, options: RepairOptions) -> Self {
        let scratch = Scratch {
            block_bitmap: Bitmap::with_block_size(geometry.block_size),
            inode_bitmap: Bitmap::with_block_size(geometry.block_size),
            buffer: vec![0; geometry.block_size],
        };
        let capacity = scratch.block_bitmap.capacity();
        let block_scan_len = geometry.blocks_per_group.min(capacity);
        let inode_scan_len = geometry.inodes_per_group.min(capacity);
        if block_scan_len < geometry.blocks_per_group {
            warn!(
                "blocks_per_group {} exceeds bitmap capacity {}, scanning {} per group",
                geometry.blocks_per_group, capacity, block_scan_len
            );
        }
        if inode_scan_len < geometry.inodes_per_group {
            warn!(
                "inodes_per_group {} exceeds bitmap capacity {}, scanning {} per group",
                geometry.inodes_per_group, capacity, inode_scan_len
            );
        }

        let boot_metadata = match options.metadata {
            MetadataPolicy::InodeTable => Vec::new(),
            MetadataPolicy::Full => vec![
                byte_span_blocks(SUPER_BLOCK_OFFSET, SUPER_BLOCK_SIZE as u64, geometry.block_size),
                byte_span_blocks(
                    GROUP_DESC_TABLE_OFFSET,
                    geometry.group_count * GROUP_DESC_SIZE as u64,
                    geometry.block_size,
                ),
            ],
        };

        Self {
            disk,
            geometry,
            options,
            block_scan_len,
            inode_scan_len,
            boot_metadata,
            scratch,
        }
    }

    /// Runs the full read-verify-write cycle for one group.
    pub fn check_group(&mut self, group: u64, desc: &GroupDescriptor) -> Result<GroupReport> {
        let mut report = GroupReport::new(group, desc);

        match self.load_bitmaps(desc) {
            Ok(()) => {}
            Err(e) if e.is_truncation() => {
                warn!("group {}: bitmaps unreadable ({}), skipping group", group, e);
                report.skipped = true;
                return Ok(report);
            }
            Err(e) => return Err(e),
        }

        self.force_reserved_inodes(group, &mut report);
        self.scan_blocks(group, desc, &mut report)?;
        self.scan_inodes(group, desc, &mut report)?;

        if !self.options.dry_run {
            self.scratch.block_bitmap.sync(self.disk)?;
            self.scratch.inode_bitmap.sync(self.disk)?;
        }

        debug!(
            "group {}: blocks +{}/-{}, inodes +{}/-{}, free blocks {}, free inodes {}",
            group,
            report.blocks_set,
            report.blocks_cleared,
            report.inodes_set,
            report.inodes_cleared,
            report.free_blocks,
            report.free_inodes
        );
        Ok(report)
    }

    fn load_bitmaps(&mut self, desc: &GroupDescriptor) -> Result<()> {
        self.scratch
            .block_bitmap
            .load(self.disk, desc.block_bitmap())?;
        self.scratch
            .inode_bitmap
            .load(self.disk, desc.inode_bitmap())
    }

    /// Global inodes 1..=RESERVED_INODES are used no matter what their
    /// records say. Only group 0 normally holds any of them.
    // The first ten bits of later groups are not forced; content decides them.
    fn force_reserved_inodes(&mut self, group: u64, report: &mut GroupReport) {
        for j in 0..self.inode_scan_len {
            if self.geometry.inode_number(group, j) > RESERVED_INODES {
                break;
            }
            let flip = self.scratch.inode_bitmap.reconcile(j, true);
            report.record_inode(flip);
        }
    }

    fn is_metadata(
        &self,
        group: u64,
        desc: &GroupDescriptor,
        table: &InodeTable,
        block: BlockId,
    ) -> bool {
        if table.contains(block) {
            return true;
        }
        match self.options.metadata {
            MetadataPolicy::InodeTable => false,
            MetadataPolicy::Full => {
                block == desc.block_bitmap()
                    || block == desc.inode_bitmap()
                    || (group == 0 && self.boot_metadata.iter().any(|r| r.contains(&block)))
            }
        }
    }

    fn scan_blocks(
        &mut self,
        group: u64,
        desc: &GroupDescriptor,
        report: &mut GroupReport,
    ) -> Result<()> {
        let table = InodeTable::new(desc.inode_table(), &self.geometry);

        for j in 0..self.block_scan_len {
            let block = self.geometry.block_number(group, j);
            if block > self.geometry.block_count {
                break;
            }

            if self.is_metadata(group, desc, &table, block) {
                let flip = self.scratch.block_bitmap.reconcile(j, true);
                report.record_block(flip);
                continue;
            }

            match self.disk.read_block(block, &mut self.scratch.buffer) {
                Ok(()) => {}
                Err(e) if e.is_truncation() => {
                    warn!("group {}: block scan stops at block {}: {}", group, block, e);
                    report.block_scan_truncated = true;
                    break;
                }
                Err(e) => return Err(e),
            }

            let used = self.scratch.buffer.iter().any(|&b| b != 0);
            if !used {
                report.free_blocks += 1;
            }
            let flip = self.scratch.block_bitmap.reconcile(j, used);
            if let Some(flip) = flip {
                trace!("group {}: block {} (bit {}) {:?}", group, block, j, flip);
            }
            report.record_block(flip);
        }
        Ok(())
    }

    fn scan_inodes(
        &mut self,
        group: u64,
        desc: &GroupDescriptor,
        report: &mut GroupReport,
    ) -> Result<()> {
        let table = InodeTable::new(desc.inode_table(), &self.geometry);
        let record_len = self.geometry.inode_size as usize;

        for j in 0..self.inode_scan_len {
            let inode = self.geometry.inode_number(group, j);
            if inode > self.geometry.inode_count {
                break;
            }

            let record = &mut self.scratch.buffer[..record_len];
            let mode = match table.read_mode(self.disk, j, &self.geometry, record) {
                Ok(mode) => mode,
                Err(e) if e.is_truncation() => {
                    warn!("group {}: inode scan stops at inode {}: {}", group, inode, e);
                    report.inode_scan_truncated = true;
                    break;
                }
                Err(e) => return Err(e),
            };
            if mode.is_dir() {
                report.used_dirs += 1;
            }

            // already forced used; content never overrides that
            if inode <= RESERVED_INODES {
                continue;
            }

            let used = !mode.is_free();
            if !used {
                report.free_inodes += 1;
            }
            let flip = self.scratch.inode_bitmap.reconcile(j, used);
            if let Some(flip) = flip {
                trace!("group {}: inode {} (bit {}) {:?}", group, inode, j, flip);
            }
            report.record_inode(flip);
        }
        Ok(())
    }
}

/// Runs the verifier over every group in order, calling `on_group` after
/// each one. Earlier groups stay written if a later group fails.
pub fn verify_groups<D: BlockDevice>(
    disk: &mut D,
    geometry: Geometry,
    descriptors: &[GroupDescriptor],
    options: RepairOptions,
    mut on_group: impl FnMut(&GroupReport),
) -> Result<Vec<GroupReport>> {
    if (descriptors.len() as u64) < geometry.group_count {
        return Err(FsckError::InvalidGeometry(format!(
            "{} descriptors for {} groups",
            descriptors.len(),
            geometry.group_count
        )));
    }

    let mut verifier = Verifier::new(disk, geometry, options);
    let mut reports = Vec::with_capacity(descriptors.len());
    for (group, desc) in (0..geometry.group_count).zip(descriptors) {
        let report = verifier.check_group(group, desc)?;
        on_group(&report);
        reports.push(report);
    }
    Ok(reports)
}
