use std::path::Path;
use std::time::Duration;

/// Host-side collaborator boundary.
///
/// Everything behind this trait is out of the dispatcher's hands: OSD
/// presentation, the platform's file-mount machinery, and the SD
/// configuration responder.
pub trait HostBridge {
    /// The core raised the configuration-request bit.
    fn sd_config_requested(&mut self);

    /// Mount `path` as the active audio track. The file has already been
    /// verified openable.
    fn mount_track(&mut self, path: &Path);

    /// Surface a user-visible notification for `timeout`.
    fn notify(&mut self, message: &str, timeout: Duration);

    /// Backing-store activity indicator (disk LED).
    fn disk_activity(&mut self) {}
}
