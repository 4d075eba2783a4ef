//! Virtual SD-card dispatcher.
//!
//! The core polls for pending sector work through a bit-encoded status
//! word; the dispatcher answers with sector data for up to four logical
//! disks. Disk 1 carries the mounted audio track, disk 2 streams the MSU
//! data payload through a ring buffer instead of hitting the backing file
//! on every request.
//!
//! All cross-tick state (per-disk LBA cache, ring buffer, stream cursor)
//! is owned here and mutated only from [`SdDispatcher::poll`]; the single
//! polling context is what makes the lock-free ring buffer sound.

use std::path::PathBuf;

use ferrite_stream::{StreamBuffer, StreamError, StreamSource};
use tracing::{debug, warn};

use crate::command::{SdRequest, SdTransfer};
use crate::disk::{DiskKind, LogicalDisk};
use crate::host::HostBridge;
use crate::link::{commands, CoreLink};
use crate::volume::{Volume, SECTOR_SIZE};
use crate::{DiskError, Result};

/// Number of logical disks exposed to the core.
pub const DISK_COUNT: usize = 4;
/// Disk carrying the mounted audio track.
pub const AUDIO_TRACK_DISK: usize = 1;
/// Disk backed by the streaming data payload.
pub const STREAM_DISK: usize = 2;

/// Dispatcher sizing. Defaults to an 8 MiB ring (1 MiB replenishment
/// chunks) serving 2 KiB transfers.
#[derive(Debug, Clone)]
pub struct SdOptions {
    /// Total ring-buffer capacity for the streaming disk.
    pub stream_capacity: usize,
    /// Transfer length served to the core per streaming-disk read.
    pub stream_transfer_len: usize,
}

impl Default for SdOptions {
    fn default() -> Self {
        SdOptions {
            stream_capacity: 8 * 1024 * 1024,
            stream_transfer_len: 2048,
        }
    }
}

/// Polled dispatcher for the four logical disks.
///
/// Owned by the caller's poll loop; construct once per loaded image and
/// call [`poll`](SdDispatcher::poll) once per tick. Disk indices passed to
/// the attach methods must be below [`DISK_COUNT`].
pub struct SdDispatcher<V> {
    disks: [LogicalDisk<V>; DISK_COUNT],
    stream: StreamBuffer,
    /// Byte cursor into the streaming volume; advanced by top-up reads,
    /// repositioned by seeks.
    stream_pos: u64,
}

impl<V: Volume> SdDispatcher<V> {
    pub fn new(options: SdOptions) -> SdDispatcher<V> {
        SdDispatcher {
            disks: [
                LogicalDisk::new(DiskKind::Plain, SECTOR_SIZE),
                LogicalDisk::new(DiskKind::Plain, SECTOR_SIZE),
                LogicalDisk::new(DiskKind::Streaming, options.stream_transfer_len),
                LogicalDisk::new(DiskKind::Plain, SECTOR_SIZE),
            ],
            stream: StreamBuffer::new(options.stream_capacity),
            stream_pos: 0,
        }
    }

    /// Attach a backing volume to `disk`, replacing any previous one.
    pub fn attach(&mut self, disk: usize, volume: V) -> Result<()> {
        let size = volume.len()?;
        let slot = &mut self.disks[disk];
        slot.volume = Some(volume);
        slot.size = size;
        slot.cached_lba = None;
        if disk == STREAM_DISK {
            self.stream.reset();
            self.stream_pos = 0;
        }
        Ok(())
    }

    /// Detach the backing volume from `disk`.
    pub fn detach(&mut self, disk: usize) {
        let slot = &mut self.disks[disk];
        slot.volume = None;
        slot.size = 0;
        slot.cached_lba = None;
        if disk == STREAM_DISK {
            self.stream.reset();
        }
    }

    /// Put `disk` in create-on-first-write mode: no backing volume until
    /// the core writes LBA 0, at which point `path` is created.
    pub fn set_create_on_write(&mut self, disk: usize, path: PathBuf) {
        let slot = &mut self.disks[disk];
        slot.kind = DiskKind::CreateOnWrite;
        slot.create_path = Some(path);
        slot.volume = None;
        slot.size = 0;
        slot.cached_lba = None;
    }

    /// Current backing size of `disk` in bytes.
    pub fn disk_size(&self, disk: usize) -> u64 {
        self.disks[disk].size
    }

    /// LBA currently held in `disk`'s cache, if any.
    pub fn cached_lba(&self, disk: usize) -> Option<u32> {
        self.disks[disk].cached_lba
    }

    /// Bytes currently buffered for the streaming disk.
    pub fn stream_occupied(&self) -> usize {
        self.stream.occupied()
    }

    /// Service one poll tick: streaming seek first, then the status-word
    /// command, then top-up. Every failure is handled within the tick.
    pub fn poll<L: CoreLink, H: HostBridge>(&mut self, link: &mut L, host: &mut H) {
        self.handle_seek(link, host);

        link.begin(commands::SD_STATUS);
        let status = link.read_word();
        let lba = link.read_dword();
        link.end();

        if let Some(request) = SdRequest::decode(status, lba) {
            if request.config_requested {
                debug!("core requests sd configuration");
                host.sd_config_requested();
            }
            match request.transfer {
                Some(SdTransfer::Write { disk, lba }) if request.write_enabled => {
                    self.handle_write(link, host, disk, lba);
                }
                Some(SdTransfer::Write { .. }) => {} // gated off
                Some(SdTransfer::Read { disk, lba }) => {
                    self.handle_read(link, host, disk, lba);
                }
                None => {}
            }
        }

        self.top_up(host);
    }

    /// Streaming seek sub-command. Runs before the primary command and
    /// invalidates any buffered stream content and pending top-up state.
    fn handle_seek<L: CoreLink, H: HostBridge>(&mut self, link: &mut L, host: &mut H) {
        link.begin(commands::STREAM_SEEK);
        let pending = link.read_byte() != 0;
        let offset = link.read_dword();
        link.end();

        if !pending {
            return;
        }
        debug!(offset, "stream seek");

        let SdDispatcher {
            disks,
            stream,
            stream_pos,
        } = self;
        let disk = &mut disks[STREAM_DISK];
        match disk.volume.as_mut() {
            Some(volume) => {
                host.disk_activity();
                let mut source = VolumeSource {
                    volume,
                    pos: stream_pos,
                };
                if let Err(err) = stream.seek(&mut source, u64::from(offset)) {
                    warn!(offset, %err, "stream seek failed");
                }
            }
            None => {
                stream.reset();
                warn!(offset, "stream seek with no data volume attached");
            }
        }
        // Whatever the cache held predates the seek.
        disk.cached_lba = None;

        link.begin(commands::STREAM_SEEK_DONE);
        link.write_byte(1);
        link.end();
    }

    fn handle_write<L: CoreLink, H: HostBridge>(
        &mut self,
        link: &mut L,
        host: &mut H,
        disk_index: usize,
        lba: u32,
    ) {
        // Fetch the payload first; the frame must complete regardless of
        // what the backing store thinks of the write.
        let mut sector = [0u8; SECTOR_SIZE];
        link.begin(commands::SECTOR_WRITE);
        link.read_block(&mut sector);
        link.end();

        debug!(disk = disk_index, lba, "sector write");

        let disk = &mut self.disks[disk_index];
        let fresh_create = disk.kind == DiskKind::CreateOnWrite && disk.volume.is_none();
        let committed = if fresh_create && lba == 0 {
            Self::create_and_write(disk, host, &sector)
        } else {
            Self::write_existing(disk, host, lba, &sector)
        };

        match committed {
            Ok(()) => {
                if disk.kind == DiskKind::Streaming {
                    // The streaming cache holds ring data, not sectors.
                    disk.cached_lba = None;
                } else {
                    disk.cache.copy_from_slice(&sector);
                    disk.cached_lba = Some(lba);
                }
            }
            Err(err) => {
                warn!(disk = disk_index, lba, %err, "sector write failed");
                disk.cached_lba = None;
            }
        }
    }

    fn create_and_write(
        disk: &mut LogicalDisk<V>,
        host: &mut impl HostBridge,
        sector: &[u8],
    ) -> Result<()> {
        let path = disk.create_path.as_deref().ok_or(DiskError::NotAttached)?;
        host.disk_activity();
        let mut volume = V::create(path)?;
        volume.write_sector(0, sector)?;
        volume.flush()?;
        disk.volume = Some(volume);
        disk.size = SECTOR_SIZE as u64;
        // Creation consumed; from here on this is an ordinary disk.
        disk.kind = DiskKind::Plain;
        disk.create_path = None;
        Ok(())
    }

    fn write_existing(
        disk: &mut LogicalDisk<V>,
        host: &mut impl HostBridge,
        lba: u32,
        sector: &[u8],
    ) -> Result<()> {
        let size_sectors = disk.size_sectors();
        let volume = disk.volume.as_mut().ok_or(DiskError::NotAttached)?;
        // Writes may land anywhere inside the volume or exactly at its end.
        if size_sectors == 0 || u64::from(lba) > size_sectors {
            return Err(DiskError::OutOfBounds {
                offset: u64::from(lba) * SECTOR_SIZE as u64,
                len: SECTOR_SIZE,
                size: disk.size,
            });
        }
        host.disk_activity();
        volume.write_sector(lba, sector)?;
        if u64::from(lba) == size_sectors {
            disk.size += SECTOR_SIZE as u64;
        }
        Ok(())
    }

    fn handle_read<L: CoreLink, H: HostBridge>(
        &mut self,
        link: &mut L,
        host: &mut H,
        disk_index: usize,
        lba: u32,
    ) {
        let SdDispatcher { disks, stream, .. } = self;
        let disk = &mut disks[disk_index];

        if disk.cached_lba != Some(lba) {
            let fetched = if disk.kind == DiskKind::Streaming {
                Self::fetch_streaming(disk, stream)
            } else {
                Self::fetch_sector(disk, host, lba)
            };
            if let Err(err) = fetched {
                // The core expects a same-sized response no matter what;
                // serve zeros and keep the protocol framed.
                warn!(disk = disk_index, lba, %err, "sector fetch failed, serving zeros");
                disk.cache.fill(0);
            }
            disk.cached_lba = Some(lba);
        }

        link.begin(commands::SECTOR_READ);
        link.write_block(&disk.cache);
        link.end();

        if disk.kind != DiskKind::Streaming {
            Self::prefetch_next(disk, host, disk_index, lba);
        }
        if disk.kind == DiskKind::CreateOnWrite {
            // No caching benefit before the backing file exists.
            disk.cached_lba = None;
        }
    }

    fn fetch_streaming(disk: &mut LogicalDisk<V>, stream: &mut StreamBuffer) -> Result<()> {
        stream.drain(&mut disk.cache)?;
        Ok(())
    }

    fn fetch_sector(
        disk: &mut LogicalDisk<V>,
        host: &mut impl HostBridge,
        lba: u32,
    ) -> Result<()> {
        let volume = disk.volume.as_mut().ok_or(DiskError::NotAttached)?;
        if disk.size == 0 {
            return Err(DiskError::NotAttached);
        }
        host.disk_activity();
        volume.read_sector(lba, &mut disk.cache)
    }

    /// Load LBA+1 into the cache so the next sequential request is already
    /// served.
    fn prefetch_next(
        disk: &mut LogicalDisk<V>,
        host: &mut impl HostBridge,
        disk_index: usize,
        lba: u32,
    ) {
        let Some(next) = lba.checked_add(1) else {
            return;
        };
        if disk.size == 0 {
            return;
        }
        // The final two sectors of the audio track are the end-of-track
        // marker; there is nothing useful to prefetch past them.
        if disk_index == AUDIO_TRACK_DISK && u64::from(next) == disk.size_sectors().saturating_sub(2)
        {
            debug!(lba, "audio track reached end of file");
            return;
        }
        let Some(volume) = disk.volume.as_mut() else {
            return;
        };
        host.disk_activity();
        match volume.read_sector(next, &mut disk.cache) {
            Ok(()) => disk.cached_lba = Some(next),
            Err(_) => {
                // The cache may be partially clobbered; force a refetch.
                disk.cached_lba = None;
            }
        }
    }

    /// Run the streaming top-up policy once per tick.
    fn top_up(&mut self, host: &mut impl HostBridge) {
        let SdDispatcher {
            disks,
            stream,
            stream_pos,
        } = self;
        let disk = &mut disks[STREAM_DISK];
        let Some(volume) = disk.volume.as_mut() else {
            return;
        };
        if stream.wants_top_up() {
            host.disk_activity();
        }
        let mut source = VolumeSource {
            volume,
            pos: stream_pos,
        };
        if let Err(err) = stream.top_up(&mut source) {
            warn!(%err, "stream top-up failed");
        }
    }
}

/// Adapts a [`Volume`] plus a cursor into the sequential reader the stream
/// buffer consumes.
struct VolumeSource<'a, V> {
    volume: &'a mut V,
    pos: &'a mut u64,
}

impl<V: Volume> StreamSource for VolumeSource<'_, V> {
    fn seek(&mut self, pos: u64) -> ferrite_stream::Result<()> {
        *self.pos = pos;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> ferrite_stream::Result<usize> {
        let len = self.volume.len().map_err(source_err)?;
        let available = len.saturating_sub(*self.pos);
        let n = (buf.len() as u64).min(available) as usize;
        if n == 0 {
            return Ok(0);
        }
        self.volume
            .read_at(*self.pos, &mut buf[..n])
            .map_err(source_err)?;
        *self.pos += n as u64;
        Ok(n)
    }
}

fn source_err(err: DiskError) -> StreamError {
    StreamError::Source(err.to_string())
}
