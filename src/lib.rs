//! Scans an ext2 image and rewrites its block and inode bitmaps to match
//! what the blocks and inode records actually contain.

pub mod disk;
pub mod fs;

pub use disk::{BlockDevice, FileDisk};
pub use fs::{
    error::{FsckError, Result},
    repair_image,
    report::{GroupReport, ScanReport},
    verifier::{MetadataPolicy, RepairOptions},
    Ext2Image,
};
