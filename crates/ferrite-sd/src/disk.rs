use std::path::PathBuf;

use crate::volume::SECTOR_SIZE;

/// How a logical disk is backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskKind {
    /// Sector reads/writes against an attached volume.
    Plain,
    /// Reads served from the streaming ring buffer.
    Streaming,
    /// No backing file yet; the first write to LBA 0 creates it. The disk
    /// becomes `Plain` once creation succeeds.
    CreateOnWrite,
}

/// One of the four logical disks exposed to the core.
///
/// `cached_lba` tracks the sector currently held in `cache`; `None` means
/// the cache holds nothing useful and the next read must fetch.
pub(crate) struct LogicalDisk<V> {
    pub kind: DiskKind,
    pub volume: Option<V>,
    pub create_path: Option<PathBuf>,
    /// Backing size in bytes, maintained by the dispatcher as writes extend
    /// the volume.
    pub size: u64,
    pub cached_lba: Option<u32>,
    pub cache: Vec<u8>,
}

impl<V> LogicalDisk<V> {
    pub fn new(kind: DiskKind, cache_len: usize) -> LogicalDisk<V> {
        LogicalDisk {
            kind,
            volume: None,
            create_path: None,
            size: 0,
            cached_lba: None,
            cache: vec![0u8; cache_len],
        }
    }

    pub fn size_sectors(&self) -> u64 {
        self.size / SECTOR_SIZE as u64
    }
}
