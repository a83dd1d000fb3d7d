use std::fmt;

use colored::*;

use crate::fs::{bitmap::BitFlip, group_desc::GroupDescriptor};

/// What one group pass found and changed.
///
/// The computed counters are the only record of ground truth totals; nothing
/// writes them back to the descriptor or superblock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupReport {
    pub group: u64,
    pub blocks_set: u64,
    pub blocks_cleared: u64,
    pub inodes_set: u64,
    pub inodes_cleared: u64,
    pub free_blocks: u64, // content-free, non-metadata blocks
    pub free_inodes: u64, // mode == 0 among scanned inodes
    pub used_dirs: u64,
    pub stored_free_blocks: u64,
    pub stored_free_inodes: u64,
    pub stored_used_dirs: u64,
    pub block_scan_truncated: bool,
    pub inode_scan_truncated: bool,
    pub skipped: bool, // bitmaps unreadable, nothing checked
}

impl GroupReport {
    pub fn new(group: u64, desc: &GroupDescriptor) -> Self {
        Self {
            group,
            stored_free_blocks: u64::from(desc.free_blocks_count),
            stored_free_inodes: u64::from(desc.free_inodes_count),
            stored_used_dirs: u64::from(desc.used_dirs_count),
            ..Self::default()
        }
    }

    pub fn record_block(&mut self, flip: Option<BitFlip>) {
        match flip {
            Some(BitFlip::Set) => self.blocks_set += 1,
            Some(BitFlip::Cleared) => self.blocks_cleared += 1,
            None => {}
        }
    }

    pub fn record_inode(&mut self, flip: Option<BitFlip>) {
        match flip {
            Some(BitFlip::Set) => self.inodes_set += 1,
            Some(BitFlip::Cleared) => self.inodes_cleared += 1,
            None => {}
        }
    }

    pub fn changes(&self) -> u64 {
        self.blocks_set + self.blocks_cleared + self.inodes_set + self.inodes_cleared
    }

    pub fn truncated(&self) -> bool {
        self.block_scan_truncated || self.inode_scan_truncated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterScope {
    Filesystem,
    Group(u64),
}

/// A stored counter that disagrees with the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterMismatch {
    pub scope: CounterScope,
    pub counter: &'static str,
    pub stored: u64,
    pub computed: u64,
}

impl fmt::Display for CounterMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            CounterScope::Filesystem => write!(f, "superblock")?,
            CounterScope::Group(g) => write!(f, "group {}", g)?,
        }
        write!(
            f,
            " {}: stored {}, computed {}",
            self.counter, self.stored, self.computed
        )
    }
}

/// Outcome of a full run over every block group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub groups: Vec<GroupReport>,
    pub stored_free_blocks: u64,
    pub stored_free_inodes: u64,
    pub dry_run: bool,
}

impl ScanReport {
    pub fn total_free_blocks(&self) -> u64 {
        self.groups.iter().map(|g| g.free_blocks).sum()
    }

    pub fn total_free_inodes(&self) -> u64 {
        self.groups.iter().map(|g| g.free_inodes).sum()
    }

    pub fn changes(&self) -> u64 {
        self.groups.iter().map(GroupReport::changes).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.changes() == 0
    }

    pub fn truncated_groups(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups.iter().filter(|g| g.truncated() || g.skipped)
    }

    /// Stored counters that differ from what the scan computed.
    ///
    /// Groups cut short by truncation are left out of the per-group
    /// comparison, since their computed tallies are partial.
    pub fn counter_mismatches(&self) -> Vec<CounterMismatch> {
        let mut out = Vec::new();
        let mut push = |scope, counter, stored, computed| {
            if stored != computed {
                out.push(CounterMismatch {
                    scope,
                    counter,
                    stored,
                    computed,
                });
            }
        };

        push(
            CounterScope::Filesystem,
            "free blocks",
            self.stored_free_blocks,
            self.total_free_blocks(),
        );
        push(
            CounterScope::Filesystem,
            "free inodes",
            self.stored_free_inodes,
            self.total_free_inodes(),
        );
        for g in self.groups.iter().filter(|g| !g.truncated() && !g.skipped) {
            let scope = CounterScope::Group(g.group);
            push(scope, "free blocks", g.stored_free_blocks, g.free_blocks);
            push(scope, "free inodes", g.stored_free_inodes, g.free_inodes);
            push(scope, "used dirs", g.stored_used_dirs, g.used_dirs);
        }
        out
    }

    /// Human-readable summary for the terminal.
    pub fn render(&self) -> String {
        let (blocks_set, blocks_cleared, inodes_set, inodes_cleared) =
            self.groups.iter().fold((0, 0, 0, 0), |acc, g| {
                (
                    acc.0 + g.blocks_set,
                    acc.1 + g.blocks_cleared,
                    acc.2 + g.inodes_set,
                    acc.3 + g.inodes_cleared,
                )
            });

        let mut out = String::new();
        out.push_str(&format!(
            "{} {} block groups checked\n",
            "ext2-bitfix".bright_cyan().bold(),
            self.groups.len()
        ));
        out.push_str(&format!(
            "  block bitmap: {} set, {} cleared\n",
            blocks_set.to_string().green(),
            blocks_cleared.to_string().red()
        ));
        out.push_str(&format!(
            "  inode bitmap: {} set, {} cleared\n",
            inodes_set.to_string().green(),
            inodes_cleared.to_string().red()
        ));

        for g in self.truncated_groups() {
            let what = if g.skipped {
                "bitmaps unreadable, group skipped"
            } else {
                "image ends inside group, scan truncated"
            };
            out.push_str(&format!("  {} group {}: {}\n", "!".yellow(), g.group, what));
        }

        let mismatches = self.counter_mismatches();
        if !mismatches.is_empty() {
            out.push_str(&format!(
                "  {}\n",
                "stored counters (reported only, not rewritten):".bright_black()
            ));
            for m in &mismatches {
                out.push_str(&format!("    {}\n", m.to_string().yellow()));
            }
        }

        let verdict = if self.is_clean() {
            "bitmaps consistent, nothing to fix".green().bold()
        } else if self.dry_run {
            format!("{} corrections found (dry run, not written)", self.changes())
                .yellow()
                .bold()
        } else {
            format!("{} corrections written", self.changes())
                .bright_green()
                .bold()
        };
        out.push_str(&format!("{}\n", verdict));
        out
    }
}
