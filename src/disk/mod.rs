pub mod block_device;
pub mod file_disk;
pub mod types;

pub use block_device::BlockDevice;
pub use file_disk::FileDisk;
pub use types::{BlockId, BASE_BLOCK_SIZE};
