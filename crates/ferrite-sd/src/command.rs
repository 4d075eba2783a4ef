//! SD status-word decoding.
//!
//! The core reports pending work through a polled 16-bit status word. The
//! word is decoded exactly once per tick into a typed request; the
//! dispatcher pattern-matches on the result instead of re-masking bits.

use bitflags::bitflags;

bitflags! {
    /// Raw SD status word bits.
    ///
    /// Bits 4..=7 carry the command-class tag and are not flags; see
    /// [`SdRequest::decode`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SdStatus: u16 {
        const READ_DISK0 = 0x0001;
        const WRITE_DISK0 = 0x0002;
        /// SDHC/write-enable gate; writes are ignored while clear.
        const WRITE_ENABLE = 0x0004;
        const CONFIG_REQUEST = 0x0008;
        const READ_DISK1 = 0x0100;
        const READ_DISK2 = 0x0200;
        const READ_DISK3 = 0x0400;
        const WRITE_DISK1 = 0x0800;
        const WRITE_DISK2 = 0x1000;
        const WRITE_DISK3 = 0x2000;
    }
}

/// Valid status words carry this tag in bits 4..=7; anything else is a core
/// that does not implement the protocol and must be ignored.
const COMMAND_CLASS_MASK: u16 = 0x00f0;
const COMMAND_CLASS_TAG: u16 = 0x0050;

/// A decoded sector transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdTransfer {
    Write { disk: usize, lba: u32 },
    Read { disk: usize, lba: u32 },
}

/// One decoded status word. `transfer` is `None` for a status word that
/// requests no sector movement this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdRequest {
    pub config_requested: bool,
    pub write_enabled: bool,
    pub transfer: Option<SdTransfer>,
}

impl SdRequest {
    /// Decode a raw status word. Returns `None` when the command-class tag
    /// is absent. Write selects take precedence over read selects; within
    /// each class, lower disk numbers win and unknown select combinations
    /// fall back to disk 3.
    pub fn decode(status: u16, lba: u32) -> Option<SdRequest> {
        if status & COMMAND_CLASS_MASK != COMMAND_CLASS_TAG {
            return None;
        }
        let status = SdStatus::from_bits_truncate(status);

        let write_selects = SdStatus::WRITE_DISK0
            | SdStatus::WRITE_DISK1
            | SdStatus::WRITE_DISK2
            | SdStatus::WRITE_DISK3;
        let read_selects = SdStatus::READ_DISK0
            | SdStatus::READ_DISK1
            | SdStatus::READ_DISK2
            | SdStatus::READ_DISK3;

        let transfer = if status.intersects(write_selects) {
            let disk = if status.contains(SdStatus::WRITE_DISK0) {
                0
            } else if status.contains(SdStatus::WRITE_DISK1) {
                1
            } else if status.contains(SdStatus::WRITE_DISK2) {
                2
            } else {
                3
            };
            Some(SdTransfer::Write { disk, lba })
        } else if status.intersects(read_selects) {
            let disk = if status.contains(SdStatus::READ_DISK0) {
                0
            } else if status.contains(SdStatus::READ_DISK1) {
                1
            } else if status.contains(SdStatus::READ_DISK2) {
                2
            } else {
                3
            };
            Some(SdTransfer::Read { disk, lba })
        } else {
            None
        };

        Some(SdRequest {
            config_requested: status.contains(SdStatus::CONFIG_REQUEST),
            write_enabled: status.contains(SdStatus::WRITE_ENABLE),
            transfer,
        })
    }
}
