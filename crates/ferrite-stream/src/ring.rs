use crate::{Result, StreamError};

/// Fixed-capacity byte queue backing the streaming data disk.
///
/// The buffer is single-producer/single-consumer: the dispatcher's poll loop
/// serializes every producer and consumer call, so no internal locking is
/// needed. Writes that would exceed free space and reads that would exceed
/// occupancy fail without touching the buffer; callers check
/// [`RingBuffer::free_space`] / [`RingBuffer::occupied`] first.
///
/// Invariant: `occupied() + free_space() == capacity()` after every
/// operation.
pub struct RingBuffer {
    buf: Box<[u8]>,
    read_pos: usize,
    write_pos: usize,
    occupied: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            read_pos: 0,
            write_pos: 0,
            occupied: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn free_space(&self) -> usize {
        self.buf.len() - self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Reset occupancy to zero. The backing storage is retained.
    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
        self.occupied = 0;
    }

    /// Append `data`, failing with [`StreamError::Overflow`] (and committing
    /// nothing) when it does not fit.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.free_space() {
            return Err(StreamError::Overflow {
                requested: data.len(),
                free: self.free_space(),
            });
        }
        if data.is_empty() {
            return Ok(());
        }

        let first = data.len().min(self.buf.len() - self.write_pos);
        self.buf[self.write_pos..self.write_pos + first].copy_from_slice(&data[..first]);
        self.buf[..data.len() - first].copy_from_slice(&data[first..]);

        self.write_pos = (self.write_pos + data.len()) % self.buf.len();
        self.occupied += data.len();
        Ok(())
    }

    /// Dequeue exactly `out.len()` bytes, failing with
    /// [`StreamError::Underrun`] (and consuming nothing) when fewer are
    /// occupied.
    pub fn read(&mut self, out: &mut [u8]) -> Result<()> {
        if out.len() > self.occupied {
            return Err(StreamError::Underrun {
                requested: out.len(),
                occupied: self.occupied,
            });
        }
        if out.is_empty() {
            return Ok(());
        }

        let first = out.len().min(self.buf.len() - self.read_pos);
        out[..first].copy_from_slice(&self.buf[self.read_pos..self.read_pos + first]);
        let rest = out.len() - first;
        out[first..].copy_from_slice(&self.buf[..rest]);

        self.read_pos = (self.read_pos + out.len()) % self.buf.len();
        self.occupied -= out.len();
        Ok(())
    }
}
