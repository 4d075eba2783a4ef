//! MSU audio track selection.
//!
//! The core signals which audio track it wants through a polled
//! (current track, request pending) pair. The controller resolves the
//! request to `<base>-<n>.pcm` next to the loaded image, acknowledges the
//! mount over the transport, and hands the actual mount to the host.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::host::HostBridge;
use crate::link::{commands, CoreLink};

/// How long track-related notifications stay on screen.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(2);

/// Length of the image filename extension stripped to form the base name
/// (".sfc" and friends).
const EXTENSION_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Idle,
    Requested,
    Mounted,
    Missing,
}

/// Per-image audio-track context.
///
/// Constructed once per loaded image and polled once per tick,
/// independently of the SD dispatcher.
pub struct MsuContext {
    base: Option<PathBuf>,
    has_audio: bool,
    requested_track: Option<u8>,
    state: TrackState,
}

impl MsuContext {
    /// Context with no image loaded. Track requests are rejected with a
    /// notification until an image is.
    pub fn new() -> MsuContext {
        MsuContext {
            base: None,
            has_audio: false,
            requested_track: None,
            state: TrackState::Idle,
        }
    }

    /// Build the context for a loaded image: derive the base name by
    /// stripping the final 4-character extension and probe for
    /// `<base>-1.pcm` to learn whether the title ships audio tracks.
    pub fn for_rom(rom_path: &Path) -> MsuContext {
        let base = base_name(rom_path);
        let has_audio = base
            .as_deref()
            .map(|base| track_path_for(base, 1).is_file())
            .unwrap_or(false);
        if has_audio {
            info!(rom = %rom_path.display(), "msu audio tracks present");
        }
        MsuContext {
            base,
            has_audio,
            requested_track: None,
            state: TrackState::Idle,
        }
    }

    /// Whether `<base>-1.pcm` existed at image load.
    pub fn has_audio_tracks(&self) -> bool {
        self.has_audio
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Path of the streaming data payload, `<base>.msu`.
    pub fn data_path(&self) -> Option<PathBuf> {
        self.base
            .as_deref()
            .map(|base| PathBuf::from(format!("{}.msu", base.display())))
    }

    /// Path of audio track `track`, `<base>-<track>.pcm`.
    pub fn track_path(&self, track: u8) -> Option<PathBuf> {
        self.base.as_deref().map(|base| track_path_for(base, track))
    }

    /// Poll the core for a track request and service it.
    pub fn poll(&mut self, link: &mut impl CoreLink, host: &mut impl HostBridge) {
        link.begin(commands::TRACK_STATUS);
        let track = link.read_byte();
        let pending = link.read_byte() != 0;
        link.end();

        if !pending {
            return;
        }
        if self.state == TrackState::Missing && self.requested_track == Some(track) {
            // Don't hammer the filesystem; wait for a distinct request.
            return;
        }
        self.handle_request(link, host, track);
    }

    fn handle_request(&mut self, link: &mut impl CoreLink, host: &mut impl HostBridge, track: u8) {
        self.state = TrackState::Requested;
        self.requested_track = Some(track);

        let Some(path) = self.track_path(track) else {
            warn!(track, "audio track requested with no image loaded");
            host.notify("Audio track requested with no image loaded", NOTIFY_TIMEOUT);
            self.state = TrackState::Idle;
            return; // no acknowledgment this tick
        };

        debug!(track, path = %path.display(), "audio track selected");

        if File::open(&path).is_err() {
            link.begin(commands::TRACK_MISSING);
            link.write_byte(1);
            link.end();
            host.notify(
                &format!("Missing audio track: {}", path.display()),
                NOTIFY_TIMEOUT,
            );
            self.state = TrackState::Missing;
            return;
        }

        link.begin(commands::TRACK_MOUNT_BEGIN);
        link.write_byte(1);
        link.end();

        host.mount_track(&path);

        link.begin(commands::TRACK_MOUNT_DONE);
        link.write_byte(1);
        link.end();

        self.state = TrackState::Mounted;
    }
}

impl Default for MsuContext {
    fn default() -> Self {
        MsuContext::new()
    }
}

fn base_name(rom_path: &Path) -> Option<PathBuf> {
    let raw = rom_path.to_str()?;
    let cut = raw.len().checked_sub(EXTENSION_LEN)?;
    if cut == 0 || !raw.is_char_boundary(cut) {
        return None;
    }
    Some(PathBuf::from(&raw[..cut]))
}

fn track_path_for(base: &Path, track: u8) -> PathBuf {
    PathBuf::from(format!("{}-{}.pcm", base.display(), track))
}
