#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use ferrite_sd::{commands, CoreLink, HostBridge};

/// One transport frame: the command it was opened with and every byte the
/// dispatcher wrote into it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub command: u8,
    pub written: Vec<u8>,
}

/// Scripted core-side link: responses are taken from the public fields,
/// everything the dispatcher sends is recorded per frame.
#[derive(Default)]
pub struct FakeLink {
    pub seek_pending: bool,
    pub seek_offset: u32,
    pub status: u16,
    pub lba: u32,
    pub track: u8,
    pub track_pending: bool,
    /// Payload the core supplies inside a sector-write frame.
    pub sector_in: Vec<u8>,
    pub frames: Vec<Frame>,
    /// Active frame cursor; leave at the default when scripting a link.
    pub active: Option<(u8, usize)>,
}

impl FakeLink {
    pub fn new() -> FakeLink {
        FakeLink::default()
    }

    /// All frames opened with `command`, in order.
    pub fn frames_for(&self, command: u8) -> Vec<&Frame> {
        self.frames
            .iter()
            .filter(|frame| frame.command == command)
            .collect()
    }

    pub fn frame_count(&self, command: u8) -> usize {
        self.frames_for(command).len()
    }

    /// Bytes written into the first frame opened with `command`.
    pub fn first_written(&self, command: u8) -> Option<&[u8]> {
        self.frames_for(command)
            .first()
            .map(|frame| frame.written.as_slice())
    }

    /// Bytes written into the most recent frame opened with `command`.
    pub fn last_written(&self, command: u8) -> Option<&[u8]> {
        self.frames_for(command)
            .last()
            .map(|frame| frame.written.as_slice())
    }

    fn response_byte(&self, command: u8, index: usize) -> u8 {
        match command {
            commands::STREAM_SEEK => {
                let mut bytes = vec![u8::from(self.seek_pending)];
                bytes.extend_from_slice(&self.seek_offset.to_le_bytes());
                bytes.get(index).copied().unwrap_or(0)
            }
            commands::SD_STATUS => {
                let mut bytes = self.status.to_le_bytes().to_vec();
                bytes.extend_from_slice(&self.lba.to_le_bytes());
                bytes.get(index).copied().unwrap_or(0)
            }
            commands::TRACK_STATUS => match index {
                0 => self.track,
                1 => u8::from(self.track_pending),
                _ => 0,
            },
            commands::SECTOR_WRITE => self.sector_in.get(index).copied().unwrap_or(0),
            _ => 0,
        }
    }
}

impl CoreLink for FakeLink {
    fn begin(&mut self, command: u8) {
        assert!(self.active.is_none(), "frame opened inside another frame");
        self.active = Some((command, 0));
        self.frames.push(Frame {
            command,
            written: Vec::new(),
        });
    }

    fn end(&mut self) {
        assert!(self.active.is_some(), "end without begin");
        self.active = None;
    }

    fn read_byte(&mut self) -> u8 {
        let (command, index) = self.active.expect("read outside a frame");
        let value = self.response_byte(command, index);
        self.active = Some((command, index + 1));
        value
    }

    fn read_block(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = self.read_byte();
        }
    }

    fn write_byte(&mut self, value: u8) {
        assert!(self.active.is_some(), "write outside a frame");
        self.frames
            .last_mut()
            .expect("write outside a frame")
            .written
            .push(value);
    }

    fn write_block(&mut self, data: &[u8]) {
        assert!(self.active.is_some(), "write outside a frame");
        self.frames
            .last_mut()
            .expect("write outside a frame")
            .written
            .extend_from_slice(data);
    }
}

/// Host collaborator that records every callback.
#[derive(Default)]
pub struct RecordingHost {
    pub config_requests: usize,
    pub mounts: Vec<PathBuf>,
    pub notifications: Vec<String>,
    pub activity: usize,
}

impl RecordingHost {
    pub fn new() -> RecordingHost {
        RecordingHost::default()
    }
}

impl HostBridge for RecordingHost {
    fn sd_config_requested(&mut self) {
        self.config_requests += 1;
    }

    fn mount_track(&mut self, path: &std::path::Path) {
        self.mounts.push(path.to_path_buf());
    }

    fn notify(&mut self, message: &str, _timeout: Duration) {
        self.notifications.push(message.to_string());
    }

    fn disk_activity(&mut self) {
        self.activity += 1;
    }
}
