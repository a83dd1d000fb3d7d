use std::path::Path;

use bincode::Options;
use indicatif::ProgressBar;
use log::info;

use crate::{
    disk::{BlockDevice, FileDisk},
    fs::{
        config::{SUPER_BLOCK_OFFSET, SUPER_BLOCK_SIZE},
        error::Result,
        group_desc::{load_descriptors, store_descriptors, GroupDescriptor},
        report::ScanReport,
        super_block::{parse_superblock, Geometry, SuperBlock},
        verifier::{verify_groups, RepairOptions},
    },
};

pub mod bitmap;
pub mod config;
pub mod error;
pub mod group_desc;
pub mod inode_table;
pub mod report;
pub mod super_block;
pub mod verifier;

/// Fixed-width little-endian encoding shared by every on-disk record.
pub(crate) fn ondisk() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .allow_trailing_bytes()
}

/// An opened ext2 image: superblock and descriptor table loaded, bitmaps
/// still on disk.
#[derive(Debug)]
pub struct Ext2Image<D> {
    disk: D,
    raw_super_block: Vec<u8>, // full 1 KiB record, written back as read
    pub super_block: SuperBlock,
    pub geometry: Geometry,
    pub descriptors: Vec<GroupDescriptor>,
}

impl<D: BlockDevice> Ext2Image<D> {
    /// Reads the superblock and descriptor table. Any failure here happens
    /// before a single byte is written.
    pub fn mount(mut disk: D) -> Result<Self> {
        let mut raw_super_block = vec![0u8; SUPER_BLOCK_SIZE];
        disk.read_at(SUPER_BLOCK_OFFSET, &mut raw_super_block)?;
        let super_block = parse_superblock(&raw_super_block)?;
        let geometry = Geometry::from_super_block(&super_block)?;
        info!(
            "block size {}, {} blocks, {} inodes, {} groups",
            geometry.block_size, geometry.block_count, geometry.inode_count, geometry.group_count
        );

        let descriptors = load_descriptors(&mut disk, geometry.group_count)?;
        Ok(Self {
            disk,
            raw_super_block,
            super_block,
            geometry,
            descriptors,
        })
    }

    /// Verifies and repairs every group's bitmaps, then rewrites the
    /// superblock and descriptor table (unless this is a dry run).
    pub fn check_and_repair(
        &mut self,
        options: RepairOptions,
        progress: &ProgressBar,
    ) -> Result<ScanReport> {
        progress.set_length(self.geometry.group_count);
        let groups = verify_groups(
            &mut self.disk,
            self.geometry,
            &self.descriptors,
            options,
            |report| {
                progress.set_message(format!("group {}", report.group));
                progress.inc(1);
            },
        )?;
        progress.finish_and_clear();

        if !options.dry_run {
            self.sync()?;
        }

        Ok(ScanReport {
            groups,
            stored_free_blocks: u64::from(self.super_block.free_blocks_count),
            stored_free_inodes: u64::from(self.super_block.free_inodes_count),
            dry_run: options.dry_run,
        })
    }

    /// Writes the superblock and descriptor table back in place. Fields are
    /// never changed by a repair, so the bytes match what was read.
    pub fn sync(&mut self) -> Result<()> {
        self.super_block.encode_into(&mut self.raw_super_block)?;
        self.disk.write_at(SUPER_BLOCK_OFFSET, &self.raw_super_block)?;
        store_descriptors(&mut self.disk, &self.descriptors)?;
        self.disk.flush()
    }

    pub fn into_disk(self) -> D {
        self.disk
    }
}

/// Opens the image at `path`, repairs it, and closes it again.
pub fn repair_image(
    path: impl AsRef<Path>,
    options: RepairOptions,
    progress: &ProgressBar,
) -> Result<ScanReport> {
    let disk = FileDisk::open(path.as_ref(), !options.dry_run)?;
    info!(
        "checking {} ({} bytes){}",
        path.as_ref().display(),
        disk.image_len()?,
        if options.dry_run { ", dry run" } else { "" }
    );

    let mut image = Ext2Image::mount(disk)?;
    image.check_and_repair(options, progress)
}
