use ferrite_stream::StreamError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiskError>;

/// Unified error type for volume and dispatcher operations.
///
/// Note: [`DiskError::Io`] stores a human-readable `String` rather than
/// `std::io::Error` so alternate [`Volume`](crate::Volume) implementations
/// are not tied to a platform error type.
///
/// Every failure is scoped to the current poll tick: the dispatcher maps
/// errors to protocol-preserving responses (zero-filled sectors, cache
/// invalidation) and never aborts the poll loop.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("out of bounds: offset={offset} len={len} size={size}")]
    OutOfBounds {
        offset: u64,
        len: usize,
        size: u64,
    },

    #[error("integer overflow while computing byte offsets")]
    OffsetOverflow,

    #[error("no volume attached")]
    NotAttached,

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DiskError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}
