use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

struct Inner {
    free: Mutex<Vec<Vec<u8>>>,
    capacity: usize,
}

/// Bounded free-list of reusable byte buffers.
///
/// Consumer plugins that read raw bytes off a transport (sockets, files,
/// pipes) can draw a buffer here instead of allocating fresh on every read.
/// Dropping a [`PooledBuffer`] returns its storage to the pool if there's
/// room; otherwise it's simply deallocated.
#[derive(Clone)]
pub struct SlabPool {
    inner: Arc<Inner>,
}

impl SlabPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                free: Mutex::new(Vec::with_capacity(capacity)),
                capacity,
            }),
        }
    }

    /// Acquire a buffer with at least `hint_len` capacity, reused from the
    /// free list when possible.
    pub fn acquire(&self, hint_len: usize) -> PooledBuffer {
        let mut buf = {
            let mut free = self.inner.free.lock().unwrap_or_else(|p| p.into_inner());
            free.pop().unwrap_or_default()
        };
        buf.clear();
        if buf.capacity() < hint_len {
            buf.reserve(hint_len - buf.capacity());
        }
        PooledBuffer {
            buf: Some(buf),
            pool: self.inner.clone(),
        }
    }
}

pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: Arc<Inner>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        self.buf.as_ref().expect("buffer taken before drop")
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.buf.as_mut().expect("buffer taken before drop")
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            let mut free = self.pool.free.lock().unwrap_or_else(|p| p.into_inner());
            if free.len() < self.pool.capacity {
                free.push(buf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquired_buffer_is_reused_after_drop() {
        let pool = SlabPool::new(4);
        {
            let mut buf = pool.acquire(16);
            buf.extend_from_slice(b"hello");
        }
        let buf = pool.acquire(0);
        // Reused buffer was cleared, but its allocation should carry over.
        assert!(buf.capacity() >= 5);
        assert!(buf.is_empty());
    }

    #[test]
    fn pool_respects_capacity_bound() {
        let pool = SlabPool::new(1);
        let a = pool.acquire(0);
        let b = pool.acquire(0);
        drop(a);
        drop(b);
        // Only one slot of capacity — both drops must not panic or leak logically.
        let _c = pool.acquire(0);
    }
}
