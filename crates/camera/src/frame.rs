use {
    crate::PixelFormat,
    base::Vec2,
    std::{
        fmt,
        ops::{Deref, DerefMut},
        sync::{
            Arc, Mutex, MutexGuard,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    },
};

struct PoolState {
    free: Vec<Vec<u8>>,
    in_use: usize,
    closed: bool,
}

struct PoolShared {
    capacity: usize,
    buffer_len: usize,
    state: Mutex<PoolState>,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Acquire mutex with poisoning recovery
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reclaim(&self, data: Vec<u8>) {
        let mut state = self.lock();
        state.in_use = state.in_use.saturating_sub(1);
        if !state.closed && state.free.len() < self.capacity {
            state.free.push(data);
        }
    }
}

/// Fixed-size pool of frame buffers backing a frame-queue target.
///
/// At most `capacity` buffers are ever handed out at once; `acquire` returns
/// `None` instead of allocating past that. Buffers come back when the
/// `PooledBuffer` (or the `Frame` wrapping it) is dropped.
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

impl BufferPool {
    pub fn new(capacity: usize, buffer_len: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                capacity,
                buffer_len,
                state: Mutex::new(PoolState {
                    free: Vec::with_capacity(capacity),
                    in_use: 0,
                    closed: false,
                }),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn buffer_len(&self) -> usize {
        self.shared.buffer_len
    }

    /// Take a free buffer, or `None` if the pool is exhausted or closed.
    pub fn acquire(&self) -> Option<PooledBuffer> {
        let mut state = self.shared.lock();
        if state.closed || state.in_use >= self.shared.capacity {
            return None;
        }
        let mut data = state.free.pop().unwrap_or_default();
        state.in_use += 1;
        drop(state);

        data.resize(self.shared.buffer_len, 0);
        Some(PooledBuffer {
            data,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Number of buffers currently held outside the pool.
    pub fn in_use(&self) -> usize {
        self.shared.lock().in_use
    }

    /// Number of allocated buffers waiting in the pool for reuse.
    pub fn idle(&self) -> usize {
        self.shared.lock().free.len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Free idle buffers and stop recycling. Buffers still held are freed
    /// when they are dropped.
    pub fn close(&self) {
        let mut state = self.shared.lock();
        state.closed = true;
        state.free.clear();
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("BufferPool")
            .field("capacity", &self.shared.capacity)
            .field("buffer_len", &self.shared.buffer_len)
            .field("in_use", &state.in_use)
            .field("closed", &state.closed)
            .finish()
    }
}

/// A buffer on loan from a `BufferPool`.
pub struct PooledBuffer {
    data: Vec<u8>,
    shared: Arc<PoolShared>,
}

impl PooledBuffer {
    /// Shorten the valid data, e.g. to the length of an encoded JPEG.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }
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
        self.shared.reclaim(std::mem::take(&mut self.data));
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.data.len())
            .finish()
    }
}

/// One captured frame, exclusively owned by the sink it was delivered to.
///
/// The buffer goes back to the pool on `release` or drop. Keep the data
/// beyond that with `to_vec`.
pub struct Frame {
    buffer: PooledBuffer,
    size: Vec2<usize>,
    format: PixelFormat,
    sequence: u64,
    timestamp: Duration,
}

impl Frame {
    pub(crate) fn new(
        buffer: PooledBuffer,
        size: Vec2<usize>,
        format: PixelFormat,
        sequence: u64,
        timestamp: Duration,
    ) -> Self {
        Self {
            buffer,
            size,
            format,
            sequence,
            timestamp,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    pub fn size(&self) -> Vec2<usize> {
        self.size
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Position of this frame in the stream, starting at 1 per session.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Capture time as reported by the producer.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Copy the frame data out of the pooled buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    /// Hand the buffer back to the pool.
    pub fn release(self) {
        drop(self);
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.sequence)
            .field("size", &self.size)
            .field("format", &self.format)
            .field("len", &self.buffer.len())
            .finish()
    }
}

/// Consumer of frames from the buffered frame queue.
///
/// `on_frame` runs on the camera worker thread, one frame at a time. Holding
/// on to frames keeps their buffers out of the pool; once the pool is
/// exhausted new frames are dropped.
pub trait FrameSink: Send {
    fn on_frame(&mut self, frame: Frame);
}

impl<F: FnMut(Frame) + Send> FrameSink for F {
    fn on_frame(&mut self, frame: Frame) {
        self(frame)
    }
}

/// Running frame counters for a controller.
#[derive(Debug, Default)]
pub struct FrameStats {
    delivered: AtomicU64,
    dropped: AtomicU64,
    discarded: AtomicU64,
}

/// Point-in-time copy of `FrameStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameCounts {
    /// Frames handed to the sink.
    pub delivered: u64,
    /// Frames lost because every pool buffer was in use.
    pub dropped: u64,
    /// Frames that arrived after streaming stopped.
    pub discarded: u64,
}

impl FrameStats {
    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FrameCounts {
        FrameCounts {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_never_exceeds_capacity() {
        let pool = BufferPool::new(2, 16);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
        assert_eq!(pool.in_use(), 2);

        drop(a);
        assert_eq!(pool.in_use(), 1);
        assert_eq!(pool.idle(), 1);

        let c = pool.acquire().unwrap();
        assert_eq!(c.len(), 16);
        assert_eq!(pool.in_use(), 2);
        assert_eq!(pool.idle(), 0);

        drop(b);
        drop(c);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_truncated_buffer_is_restored_on_reuse() {
        let pool = BufferPool::new(1, 32);
        let mut buffer = pool.acquire().unwrap();
        buffer.truncate(5);
        assert_eq!(buffer.len(), 5);
        drop(buffer);

        let buffer = pool.acquire().unwrap();
        assert_eq!(buffer.len(), 32);
    }

    #[test]
    fn test_closed_pool_frees_returned_buffers() {
        let pool = BufferPool::new(2, 8);
        let held = pool.acquire().unwrap();
        drop(pool.acquire().unwrap());
        assert_eq!(pool.idle(), 1);

        pool.close();
        assert_eq!(pool.idle(), 0);
        assert!(pool.acquire().is_none());

        drop(held);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_frame_release_reclaims_buffer() {
        let pool = BufferPool::new(1, 4);
        let mut buffer = pool.acquire().unwrap();
        buffer.copy_from_slice(&[1, 2, 3, 4]);

        let frame = Frame::new(
            buffer,
            Vec2::new(2, 2),
            PixelFormat::Yuyv,
            1,
            Duration::ZERO,
        );
        let copy = frame.to_vec();
        assert_eq!(pool.in_use(), 1);

        frame.release();
        assert_eq!(pool.in_use(), 0);
        assert_eq!(copy, vec![1, 2, 3, 4]);
    }
}
