//! Streaming building blocks for the MSU data disk.
//!
//! The FPGA core consumes the streaming payload in small transfers at
//! playback rate, while the backing file lives on comparatively slow
//! storage. This crate provides the pieces that amortize that gap:
//!
//! - [`RingBuffer`]: fixed-capacity byte queue (write/read/clear/occupancy)
//! - [`StreamSource`]: seam for the sequential backing reader
//! - [`StreamBuffer`]: ring buffer plus the watermark-driven top-up policy
//!   and the clear-and-refill seek path
//!
//! Everything here assumes a single polling context; producer and consumer
//! calls are serialized by the caller's control loop.

mod error;
mod ring;

pub use error::{Result, StreamError};
pub use ring::RingBuffer;

#[cfg(test)]
mod proptests;

/// Sequential reader behind a [`StreamBuffer`].
///
/// Implementations maintain a cursor: `read` consumes from it, `seek` moves
/// it. A `read` returning `Ok(0)` means the payload is exhausted.
pub trait StreamSource {
    /// Reposition the cursor to the absolute byte offset `pos`.
    fn seek(&mut self, pos: u64) -> Result<()>;

    /// Read up to `buf.len()` bytes at the cursor, advancing it. Returns the
    /// number of bytes read; `Ok(0)` signals end of payload.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// A [`RingBuffer`] paired with the replenishment ("top-up") policy.
///
/// The policy refills one chunk (capacity/8) from the source whenever
/// occupancy has fallen below the low watermark (capacity/4) and a full
/// chunk fits. The band keeps file I/O off the per-tick path without
/// letting the buffer run close to empty.
///
/// A seek invalidates everything: the ring is cleared, the source cursor is
/// repositioned, and one chunk is loaded synchronously before top-up is
/// re-armed.
pub struct StreamBuffer {
    ring: RingBuffer,
    chunk_len: usize,
    low_watermark: usize,
    armed: bool,
    scratch: Vec<u8>,
}

impl StreamBuffer {
    pub fn new(capacity: usize) -> Self {
        let chunk_len = capacity / 8;
        Self {
            ring: RingBuffer::new(capacity),
            chunk_len,
            low_watermark: capacity / 4,
            armed: false,
            scratch: vec![0u8; chunk_len],
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn occupied(&self) -> usize {
        self.ring.occupied()
    }

    pub fn free_space(&self) -> usize {
        self.ring.free_space()
    }

    /// Replenishment chunk size (capacity/8).
    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    /// Whether top-up is armed (a seek has completed and the source has not
    /// reported end of payload).
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Whether the next [`StreamBuffer::top_up`] call would refill.
    pub fn wants_top_up(&self) -> bool {
        self.armed
            && self.ring.occupied() < self.low_watermark
            && self.ring.free_space() >= self.chunk_len
    }

    /// Drop all buffered data and disarm top-up without touching a source.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.armed = false;
    }

    /// Clear-and-refill at `pos`: discard buffered content, reposition the
    /// source, load one chunk, and re-arm top-up. Any in-flight top-up state
    /// is invalidated before the source is touched.
    pub fn seek(&mut self, source: &mut dyn StreamSource, pos: u64) -> Result<()> {
        self.reset();
        source.seek(pos)?;
        let loaded = self.refill_chunk(source)?;
        self.armed = loaded > 0;
        Ok(())
    }

    /// Run the top-up policy once. Returns whether a refill happened.
    ///
    /// Call once per poll tick. A source read of zero bytes (end of payload)
    /// disarms top-up until the next seek.
    pub fn top_up(&mut self, source: &mut dyn StreamSource) -> Result<bool> {
        if !self.wants_top_up() {
            return Ok(false);
        }
        let loaded = self.refill_chunk(source)?;
        if loaded == 0 {
            self.armed = false;
        }
        Ok(loaded > 0)
    }

    /// Dequeue exactly `out.len()` bytes of buffered payload.
    pub fn drain(&mut self, out: &mut [u8]) -> Result<()> {
        self.ring.read(out)
    }

    fn refill_chunk(&mut self, source: &mut dyn StreamSource) -> Result<usize> {
        let want = self.chunk_len.min(self.ring.free_space());
        let loaded = source.read(&mut self.scratch[..want])?;
        self.ring.write(&self.scratch[..loaded])?;
        Ok(loaded)
    }
}
