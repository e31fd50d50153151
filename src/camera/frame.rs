use std::sync::{
    Arc,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

/// A single captured camera frame. The payload is a luma plane; none of the
/// consumers here look at pixel content, only at identity and timing.
#[derive(Debug)]
pub struct Frame {
    pub sequence: u64,
    /// Seconds since the capture source started.
    pub elapsed: f32,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Counters describing the lifetime of all frames that went through a pool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PoolStats {
    pub acquired: u64,
    pub released: u64,
}

impl PoolStats {
    /// True when every acquired frame has been released again.
    pub fn balanced(&self) -> bool {
        self.acquired == self.released
    }
}

struct PoolInner {
    capacity: usize,
    outstanding: AtomicUsize,
    acquired: AtomicU64,
    released: AtomicU64,
}

/// A bounded pool of in-flight frames. Holding a [FrameLease] occupies one
/// slot; dropping the lease is the one and only release. When all slots are
/// taken, acquisition fails and the source must drop the frame instead of
/// queuing it.
#[derive(Clone)]
pub struct FramePool {
    inner: Arc<PoolInner>,
}

impl FramePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                capacity: capacity.max(1),
                outstanding: AtomicUsize::new(0),
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
            }),
        }
    }

    pub fn acquire(&self, frame: Frame) -> Option<FrameLease> {
        let mut current = self.inner.outstanding.load(Ordering::Acquire);
        loop {
            if current >= self.inner.capacity {
                return None;
            }
            match self.inner.outstanding.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        self.inner.acquired.fetch_add(1, Ordering::Relaxed);
        Some(FrameLease {
            frame,
            pool: Arc::clone(&self.inner),
        })
    }

    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.inner.acquired.load(Ordering::Acquire),
            released: self.inner.released.load(Ordering::Acquire),
        }
    }
}

/// Exclusive access to one pooled frame. The slot is given back when the
/// lease is dropped, on every path: normal completion, error handling, or
/// unwinding.
pub struct FrameLease {
    frame: Frame,
    pool: Arc<PoolInner>,
}

impl FrameLease {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        self.pool.outstanding.fetch_sub(1, Ordering::AcqRel);
        self.pool.released.fetch_add(1, Ordering::Relaxed);
    }
}
