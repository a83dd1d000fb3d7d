/// ext2 superblock signature.
pub const EXT2_SUPER_MAGIC: u16 = 0xEF53;

/// Boot region in front of the superblock, never touched.
pub const BOOT_BLOCK_SIZE: u64 = 1024;

// The superblock record occupies a fixed 1 KiB at byte 1024 regardless of
// block size; the descriptor table follows immediately after it.
pub const SUPER_BLOCK_OFFSET: u64 = BOOT_BLOCK_SIZE;
pub const SUPER_BLOCK_SIZE: usize = 1024;
pub const GROUP_DESC_TABLE_OFFSET: u64 = BOOT_BLOCK_SIZE + SUPER_BLOCK_SIZE as u64;

/// On-disk size of one block group descriptor.
pub const GROUP_DESC_SIZE: usize = 32;

/// Inodes 1..=10 are reserved for filesystem internals and always in use.
pub const RESERVED_INODES: u64 = 10;

/// Inode size of revision-0 filesystems, which carry no inode_size field.
pub const GOOD_OLD_INODE_SIZE: u32 = 128;

/// Largest `log_block_size` accepted (64 KiB blocks).
pub const MAX_LOG_BLOCK_SIZE: u32 = 6;
