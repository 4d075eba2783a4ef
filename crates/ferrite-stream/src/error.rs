use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

/// Error type for the streaming ring buffer and its replenishment path.
///
/// `Overflow` and `Underrun` are contract violations on the caller's side:
/// the buffer never silently truncates a write or pads a read. `Source`
/// wraps failures from the backing reader as a human-readable `String` so
/// implementations are not tied to `std::io::Error`.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("ring buffer overflow: write of {requested} bytes with {free} free")]
    Overflow { requested: usize, free: usize },

    #[error("ring buffer underrun: read of {requested} bytes with {occupied} occupied")]
    Underrun { requested: usize, occupied: usize },

    #[error("stream source error: {0}")]
    Source(String),
}
