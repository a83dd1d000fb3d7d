use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use ext2_bitfix::{MetadataPolicy, RepairOptions};
use log::LevelFilter;

/// Rebuild ext2 block and inode bitmaps from block contents and inode modes
#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    /// ext2 image to check and repair in place
    pub image: PathBuf,

    /// Report corrections without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Blocks always treated as in use
    #[arg(long, value_enum, default_value_t = Metadata::InodeTable)]
    pub metadata: Metadata,

    /// No progress bar or summary
    #[arg(long, short)]
    pub quiet: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Metadata {
    /// Only inode tables
    InodeTable,
    /// Inode tables, bitmaps, superblock and descriptor table
    Full,
}

impl Cli {
    pub fn options(&self) -> RepairOptions {
        RepairOptions {
            metadata: match self.metadata {
                Metadata::InodeTable => MetadataPolicy::InodeTable,
                Metadata::Full => MetadataPolicy::Full,
            },
            dry_run: self.dry_run,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
