#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

pub const EXT2_SUPER_MAGIC: u16 = 0xEF53;
pub const INODE_SIZE: usize = 128;

/// A synthetic ext2 image laid out like a tiny mkfs result.
///
/// Group `g` starts at `base = g * blocks_per_group + first_data_block`;
/// group 0 keeps the superblock and descriptor table in front, then every
/// group has block bitmap at `base + 2`, inode bitmap at `base + 3` and the
/// inode table from `base + 4`.
#[derive(Debug, Clone)]
pub struct TestImage {
    pub bytes: Vec<u8>,
    pub block_size: usize,
    pub blocks_per_group: u64,
    pub inodes_per_group: u64,
    pub block_count: u64,
    pub inode_count: u64,
}

impl TestImage {
    pub fn new(
        log_block_size: u32,
        blocks_per_group: u32,
        inodes_per_group: u32,
        block_count: u32,
    ) -> Self {
        let block_size = 1024usize << log_block_size;
        let groups = block_count.div_ceil(blocks_per_group);
        let inode_count = groups * inodes_per_group;

        let mut image = Self {
            bytes: vec![0u8; (block_count as usize + 1) * block_size],
            block_size,
            blocks_per_group: u64::from(blocks_per_group),
            inodes_per_group: u64::from(inodes_per_group),
            block_count: u64::from(block_count),
            inode_count: u64::from(inode_count),
        };

        let sb = &mut image.bytes[1024..2048];
        sb[0..4].copy_from_slice(&inode_count.to_le_bytes());
        sb[4..8].copy_from_slice(&block_count.to_le_bytes());
        sb[12..16].copy_from_slice(&1000_u32.to_le_bytes());
        sb[16..20].copy_from_slice(&500_u32.to_le_bytes());
        sb[20..24].copy_from_slice(&u32::from(block_size == 1024).to_le_bytes());
        sb[24..28].copy_from_slice(&log_block_size.to_le_bytes());
        sb[32..36].copy_from_slice(&blocks_per_group.to_le_bytes());
        sb[40..44].copy_from_slice(&inodes_per_group.to_le_bytes());
        sb[56..58].copy_from_slice(&EXT2_SUPER_MAGIC.to_le_bytes());
        sb[76..80].copy_from_slice(&1_u32.to_le_bytes());
        sb[84..88].copy_from_slice(&11_u32.to_le_bytes());
        sb[88..90].copy_from_slice(&(INODE_SIZE as u16).to_le_bytes());
        sb[120..128].copy_from_slice(b"testvol\0");

        for g in 0..u64::from(groups) {
            let at = 2048 + g as usize * 32;
            let base = image.group_base(g);
            let desc = &mut image.bytes[at..at + 32];
            desc[0..4].copy_from_slice(&((base + 2) as u32).to_le_bytes());
            desc[4..8].copy_from_slice(&((base + 3) as u32).to_le_bytes());
            desc[8..12].copy_from_slice(&((base + 4) as u32).to_le_bytes());
            desc[12..14].copy_from_slice(&42_u16.to_le_bytes());
            desc[14..16].copy_from_slice(&7_u16.to_le_bytes());
        }

        // mkfs marks the inode tables and reserved inodes as in use
        for g in 0..u64::from(groups) {
            let table = image.inode_table(g);
            for block in table {
                let j = image.block_bit(g, block);
                image.set_block_bit(g, j, true);
            }
        }
        for j in 0..10 {
            image.set_inode_bit(0, j, true);
        }
        image.set_inode_mode(0, 1, 0o040755); // root directory
        image
    }

    /// Lowers the superblock's inode count below `groups * inodes_per_group`.
    pub fn with_inode_count(mut self, inode_count: u32) -> Self {
        self.bytes[1024..1028].copy_from_slice(&inode_count.to_le_bytes());
        self.inode_count = u64::from(inode_count);
        self
    }

    pub fn first_data_block(&self) -> u64 {
        u64::from(self.block_size == 1024)
    }

    pub fn group_count(&self) -> u64 {
        self.block_count.div_ceil(self.blocks_per_group)
    }

    pub fn group_base(&self, group: u64) -> u64 {
        group * self.blocks_per_group + self.first_data_block()
    }

    pub fn block_bitmap(&self, group: u64) -> u64 {
        self.group_base(group) + 2
    }

    pub fn inode_bitmap(&self, group: u64) -> u64 {
        self.group_base(group) + 3
    }

    pub fn inode_table(&self, group: u64) -> std::ops::Range<u64> {
        let start = self.group_base(group) + 4;
        let blocks = (self.inodes_per_group as usize * INODE_SIZE).div_ceil(self.block_size) as u64;
        start..start + blocks
    }

    /// Bit index of `block` inside `group`'s block bitmap.
    pub fn block_bit(&self, group: u64, block: u64) -> u64 {
        block - self.group_base(group)
    }

    pub fn block(&self, n: u64) -> &[u8] {
        let at = n as usize * self.block_size;
        &self.bytes[at..at + self.block_size]
    }

    pub fn block_mut(&mut self, n: u64) -> &mut [u8] {
        let at = n as usize * self.block_size;
        &mut self.bytes[at..at + self.block_size]
    }

    pub fn fill_block(&mut self, n: u64, byte: u8) {
        self.block_mut(n).fill(byte);
    }

    fn bit_at(&self, bitmap: u64, j: u64) -> bool {
        self.block(bitmap)[(j / 8) as usize] & (1 << (j % 8)) != 0
    }

    fn set_bit_at(&mut self, bitmap: u64, j: u64, used: bool) {
        let byte = &mut self.block_mut(bitmap)[(j / 8) as usize];
        if used {
            *byte |= 1 << (j % 8);
        } else {
            *byte &= !(1 << (j % 8));
        }
    }

    pub fn block_bit_set(&self, group: u64, j: u64) -> bool {
        self.bit_at(self.block_bitmap(group), j)
    }

    pub fn set_block_bit(&mut self, group: u64, j: u64, used: bool) {
        self.set_bit_at(self.block_bitmap(group), j, used)
    }

    pub fn inode_bit_set(&self, group: u64, j: u64) -> bool {
        self.bit_at(self.inode_bitmap(group), j)
    }

    pub fn set_inode_bit(&mut self, group: u64, j: u64, used: bool) {
        self.set_bit_at(self.inode_bitmap(group), j, used)
    }

    fn inode_offset(&self, group: u64, j: u64) -> usize {
        self.inode_table(group).start as usize * self.block_size + j as usize * INODE_SIZE
    }

    pub fn inode_mode(&self, group: u64, j: u64) -> u16 {
        let at = self.inode_offset(group, j);
        u16::from_le_bytes([self.bytes[at], self.bytes[at + 1]])
    }

    pub fn set_inode_mode(&mut self, group: u64, j: u64, mode: u16) {
        let at = self.inode_offset(group, j);
        self.bytes[at..at + 2].copy_from_slice(&mode.to_le_bytes());
    }

    /// Marks a data block used in both content and bitmap.
    pub fn add_file_block(&mut self, group: u64, block: u64) {
        self.block_mut(block)[0] = 0x5A;
        let j = self.block_bit(group, block);
        self.set_block_bit(group, j, true);
    }

    /// Marks an inode used in both record and bitmap.
    pub fn add_inode(&mut self, group: u64, j: u64, mode: u16) {
        self.set_inode_mode(group, j, mode);
        self.set_inode_bit(group, j, true);
    }

    pub fn write_temp(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp image");
        file.write_all(&self.bytes).expect("write image");
        file.flush().expect("flush image");
        file
    }

    pub fn reload(&mut self, file: &NamedTempFile) {
        self.bytes = std::fs::read(file.path()).expect("read image back");
    }
}

/// Checks every testable property of a repaired image.
pub fn assert_bitmaps_match_ground_truth(image: &TestImage) {
    for g in 0..image.group_count() {
        let table = image.inode_table(g);
        for j in 0..image.blocks_per_group {
            let block = image.group_base(g) + j;
            if block > image.block_count {
                break;
            }
            let expected = if table.contains(&block) {
                true
            } else {
                image.block(block).iter().any(|&b| b != 0)
            };
            assert_eq!(
                image.block_bit_set(g, j),
                expected,
                "group {g} block {block} (bit {j})"
            );
        }

        for j in 0..image.inodes_per_group {
            let inode = g * image.inodes_per_group + j + 1;
            if inode > image.inode_count {
                break;
            }
            let expected = inode <= 10 || image.inode_mode(g, j) != 0;
            assert_eq!(image.inode_bit_set(g, j), expected, "group {g} inode {inode}");
        }
    }
}
