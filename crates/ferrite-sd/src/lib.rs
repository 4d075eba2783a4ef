//! Virtual SD-card and MSU audio support for the FPGA core.
//!
//! The core sees up to four logical block-storage disks and a streaming
//! audio payload; this crate answers its polled command protocol on the
//! host side:
//!
//! - [`SdDispatcher`]: decodes the status word and serves sector
//!   reads/writes, routing the streaming disk through a ring buffer
//! - [`MsuContext`]: audio-track mount/seek signaling
//! - [`CoreLink`]: SPI-style transport seam
//! - [`Volume`]: file-system seam ([`FileVolume`] / [`MemVolume`])
//! - [`HostBridge`]: OSD, mount, and configuration collaborators
//!
//! Everything runs in one cooperative polling context; no operation blocks
//! beyond a synchronous file access, and no error outlives its tick.

mod command;
mod disk;
mod dispatcher;
mod error;
mod host;
mod link;
mod msu;
mod volume;

pub use command::{SdRequest, SdStatus, SdTransfer};
pub use disk::DiskKind;
pub use dispatcher::{SdDispatcher, SdOptions, AUDIO_TRACK_DISK, DISK_COUNT, STREAM_DISK};
pub use error::{DiskError, Result};
pub use host::HostBridge;
pub use link::{commands, CoreLink};
pub use msu::{MsuContext, TrackState, NOTIFY_TIMEOUT};
pub use volume::{FileVolume, MemVolume, Volume, SECTOR_SIZE};
