use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

struct PoolShared {
    free: Mutex<Vec<Vec<u8>>>,
    capacity: usize,
    buffer_len: usize,
    acquired: AtomicU64,
    released: AtomicU64,
}

/// A pool of equally sized byte buffers.
#[derive(Clone)]
pub struct FramePool {
    shared: Arc<PoolShared>,
}

impl FramePool {
    /// Pre-allocate `capacity` zeroed buffers of `buffer_len` bytes each.
    pub fn new(buffer_len: usize, capacity: usize) -> Self {
        let free = (0..capacity).map(|_| vec![0u8; buffer_len]).collect();
        tracing::debug!(buffer_len, capacity, "frame pool allocated");
        FramePool {
            shared: Arc::new(PoolShared {
                free: Mutex::new(free),
                capacity,
                buffer_len,
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
            }),
        }
    }

    /// Take a free buffer, or `None` if every buffer is in flight.
    ///
    /// Never blocks: a source that finds the pool empty drops the capture.
    pub fn try_acquire(&self) -> Option<PooledBuffer> {
        let data = self.shared.free.lock().pop()?;
        self.shared.acquired.fetch_add(1, Ordering::Relaxed);
        Some(PooledBuffer {
            data,
            pool: Arc::clone(&self.shared),
        })
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn buffer_len(&self) -> usize {
        self.shared.buffer_len
    }

    /// Buffers currently held by consumers.
    pub fn outstanding(&self) -> usize {
        self.shared.capacity - self.shared.free.lock().len()
    }

    /// Total number of buffers handed out since creation.
    pub fn acquired(&self) -> u64 {
        self.shared.acquired.load(Ordering::Relaxed)
    }

    /// Total number of buffers returned since creation.
    pub fn released(&self) -> u64 {
        self.shared.released.load(Ordering::Relaxed)
    }
}

/// A buffer on loan from a [`FramePool`]. Dropping it returns it to the pool.
pub struct PooledBuffer {
    data: Vec<u8>,
    pool: Arc<PoolShared>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.pool.free.lock().push(data);
        self.pool.released.fetch_add(1, Ordering::Relaxed);
    }
}
