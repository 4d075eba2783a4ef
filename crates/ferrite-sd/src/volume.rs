//! Backing-store seam for the logical disks.
//!
//! The dispatcher is byte-addressed internally and sector-addressed at the
//! protocol boundary; [`Volume`] provides positional reads/writes plus the
//! 512-byte sector helpers. [`FileVolume`] is the production implementation;
//! [`MemVolume`] backs tests.

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::{DiskError, Result};

/// Sector size of the virtual SD protocol.
pub const SECTOR_SIZE: usize = 512;

fn sector_offset(lba: u32) -> u64 {
    u64::from(lba) * SECTOR_SIZE as u64
}

/// Byte-addressed backing store with synchronous semantics.
///
/// `create` exists on the trait so create-on-first-write disks work against
/// any implementation; the path is advisory for in-memory stores.
pub trait Volume: Sized {
    /// Create the backing store at `path`, read/write.
    fn create(path: &Path) -> Result<Self>;

    fn len(&self) -> Result<u64>;

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write at `offset`, growing the store when the write lands past the
    /// current end.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    fn read_sector(&mut self, lba: u32, buf: &mut [u8]) -> Result<()> {
        self.read_at(sector_offset(lba), buf)
    }

    fn write_sector(&mut self, lba: u32, buf: &[u8]) -> Result<()> {
        self.write_at(sector_offset(lba), buf)
    }
}

/// `std::fs`-backed volume using positional I/O; the file cursor is left
/// alone on platforms with native positional reads.
pub struct FileVolume {
    file: File,
}

impl FileVolume {
    /// Open an existing file read/write.
    pub fn open(path: impl AsRef<Path>) -> Result<FileVolume> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(FileVolume { file })
    }

    /// Open an existing file read-only; writes will fail with an I/O error.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<FileVolume> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(FileVolume { file })
    }

    pub fn from_file(file: File) -> FileVolume {
        FileVolume { file }
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

impl Volume for FileVolume {
    fn create(path: &Path) -> Result<FileVolume> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(FileVolume { file })
    }

    fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    #[cfg(unix)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    #[cfg(windows)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        use std::os::windows::fs::FileExt;
        let mut pos = 0;
        while pos < buf.len() {
            let read = self.file.seek_read(&mut buf[pos..], offset + pos as u64)?;
            if read == 0 {
                return Err(DiskError::Io("unexpected end of file".into()));
            }
            pos += read;
        }
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        use std::io::{Read, Seek, SeekFrom};
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    #[cfg(unix)]
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.write_all_at(buf, offset)?;
        Ok(())
    }

    #[cfg(windows)]
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        use std::os::windows::fs::FileExt;
        let mut pos = 0;
        while pos < buf.len() {
            let written = self.file.seek_write(&buf[pos..], offset + pos as u64)?;
            if written == 0 {
                return Err(DiskError::Io("write returned zero bytes".into()));
            }
            pos += written;
        }
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

/// In-memory volume for tests.
#[derive(Debug, Default, Clone)]
pub struct MemVolume {
    data: Vec<u8>,
}

impl MemVolume {
    pub fn new() -> MemVolume {
        MemVolume::default()
    }

    pub fn from_vec(data: Vec<u8>) -> MemVolume {
        MemVolume { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Volume for MemVolume {
    fn create(_path: &Path) -> Result<MemVolume> {
        Ok(MemVolume::new())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(DiskError::OffsetOverflow)?;
        if end > self.data.len() as u64 {
            return Err(DiskError::OutOfBounds {
                offset,
                len: buf.len(),
                size: self.data.len() as u64,
            });
        }
        let start = offset as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(DiskError::OffsetOverflow)?;
        let end = usize::try_from(end).map_err(|_| DiskError::OffsetOverflow)?;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        let start = offset as usize;
        self.data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
