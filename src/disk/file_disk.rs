use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
};

use crate::{
    disk::block_device::BlockDevice,
    fs::error::{FsckError, Result},
};

/// Image-backed block device. Usually wraps a `File`; tests wrap a
/// `Cursor<Vec<u8>>`.
#[derive(Debug)]
pub struct FileDisk<T = File> {
    inner: T,
}

impl FileDisk<File> {
    /// Opens an existing image. Read-only images reject writes at the OS
    /// level, so a dry run cannot modify the file.
    pub fn open(path: impl AsRef<Path>, writable: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path.as_ref())?;
        Ok(Self::new(file))
    }

    pub fn image_len(&self) -> Result<u64> {
        Ok(self.inner.metadata()?.len())
    }
}

impl<T> FileDisk<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn short_or_io(e: io::Error, offset: u64, expected: usize) -> FsckError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::WriteZero => {
            FsckError::ShortTransfer { offset, expected }
        }
        _ => FsckError::Io(e),
    }
}

impl<T: Read + Write + Seek> BlockDevice for FileDisk<T> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner
            .read_exact(buf)
            .map_err(|e| short_or_io(e, offset, buf.len()))
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner
            .write_all(buf)
            .map_err(|e| short_or_io(e, offset, buf.len()))
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}
