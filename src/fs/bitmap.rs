use crate::{
    disk::{BlockDevice, BlockId},
    fs::error::Result,
};

/// How a reconcile changed a bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitFlip {
    Set,     // was free, now used
    Cleared, // was used, now free
}

/// One bitmap block. Bit `i` lives in byte `i / 8`, bit `i % 8`.
///
/// The buffer is sized once to a block and reloaded for every group, so
/// the verifier owns exactly two of these for the whole run.
#[derive(Debug)]
pub struct Bitmap {
    bits: Vec<u8>,
    block: BlockId, // where the bits were loaded from
}

impl Bitmap {
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            bits: vec![0; block_size],
            block: 0,
        }
    }

    /// Loads the bitmap stored at `block`, replacing the current contents.
    pub fn load<D: BlockDevice>(&mut self, disk: &mut D, block: BlockId) -> Result<()> {
        disk.read_block(block, &mut self.bits)?;
        self.block = block;
        Ok(())
    }

    /// Writes the bitmap back to the block it was loaded from.
    pub fn sync<D: BlockDevice>(&self, disk: &mut D) -> Result<()> {
        disk.write_block(self.block, &self.bits)
    }

    #[cfg(test)]
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Number of bits one block can hold.
    pub fn capacity(&self) -> u64 {
        self.bits.len() as u64 * 8
    }

    #[cfg(test)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    fn locate(index: u64) -> (usize, u8) {
        ((index / 8) as usize, 1 << (index % 8))
    }

    pub fn is_used(&self, index: u64) -> bool {
        let (byte, mask) = Self::locate(index);
        self.bits[byte] & mask != 0
    }

    /// Forces bit `index` to match `used`, reporting what changed.
    pub fn reconcile(&mut self, index: u64, used: bool) -> Option<BitFlip> {
        let (byte, mask) = Self::locate(index);
        let was_used = self.bits[byte] & mask != 0;
        match (was_used, used) {
            (false, true) => {
                self.bits[byte] |= mask;
                Some(BitFlip::Set)
            }
            (true, false) => {
                self.bits[byte] &= !mask;
                Some(BitFlip::Cleared)
            }
            _ => None,
        }
    }
}
