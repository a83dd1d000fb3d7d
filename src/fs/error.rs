use std::{fmt, io};

/// Errors raised while checking or repairing an image.
#[derive(Debug)]
pub enum FsckError {
    Io(io::Error), // underlying device error
    ShortTransfer { offset: u64, expected: usize }, // image ended inside a transfer
    InvalidMagic(u16),
    InvalidGeometry(String),
    Decode(String), // record could not be decoded
}

impl FsckError {
    /// A short transfer means the image ended early. Inside a per-block or
    /// per-inode scan this only truncates that scan.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::ShortTransfer { .. })
    }
}

impl From<io::Error> for FsckError {
    fn from(e: io::Error) -> Self {
        FsckError::Io(e)
    }
}

impl From<bincode::Error> for FsckError {
    fn from(e: bincode::Error) -> Self {
        match *e {
            bincode::ErrorKind::Io(io) => FsckError::Io(io),
            other => FsckError::Decode(other.to_string()),
        }
    }
}

impl fmt::Display for FsckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "disk I/O error: {}", e),
            Self::ShortTransfer { offset, expected } => write!(
                f,
                "short transfer: expected {} bytes at offset {}",
                expected, offset
            ),
            Self::InvalidMagic(magic) => {
                write!(f, "not a valid ext2 filesystem (magic {:#06x})", magic)
            }
            Self::InvalidGeometry(desc) => write!(f, "unusable filesystem geometry: {}", desc),
            Self::Decode(desc) => write!(f, "cannot decode on-disk record: {}", desc),
        }
    }
}

impl std::error::Error for FsckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsckError>;
