use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Weak,
    },
};

/// The number of idle buffers a pool keeps unless configured otherwise.
pub const DEFAULT_POOL_CAPACITY: usize = 64;

static SHARED_CAPACITY: OnceCell<usize> = OnceCell::new();

pub(crate) static WORD_POOL: Lazy<ArrayPool<u64>> =
    Lazy::new(|| ArrayPool::with_capacity(shared_pool_capacity()));
pub(crate) static BYTE_POOL: Lazy<ArrayPool<u8>> =
    Lazy::new(|| ArrayPool::with_capacity(shared_pool_capacity()));

/// Sets the capacity of the pools used by storages created without an explicit pool.
///
/// Only the first call has an effect, and only if it happens before the first such storage is
/// created. Returns whether the capacity was set.
pub fn set_shared_pool_capacity(capacity: usize) -> bool {
    Lazy::get(&WORD_POOL).is_none() && Lazy::get(&BYTE_POOL).is_none() && SHARED_CAPACITY.set(capacity).is_ok()
}

/// The capacity of the pools used by storages created without an explicit pool.
pub fn shared_pool_capacity() -> usize {
    SHARED_CAPACITY.get().copied().unwrap_or(DEFAULT_POOL_CAPACITY)
}

/// A recycling pool for the fixed-size buffers backing block storages.
///
/// Buffers are handed out as [`PooledArray`]s, which return themselves to the pool when dropped.
/// The pool keeps at most `capacity` idle buffers; further releases are simply freed.
pub struct ArrayPool<T> {
    inner: Arc<PoolInner<T>>,
}

struct PoolInner<T> {
    idle: Mutex<HashMap<usize, Vec<Box<[T]>>>>,
    capacity: usize,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl<T> PoolInner<T> {
    fn release(&self, data: Box<[T]>) {
        self.released.fetch_add(1, Ordering::Relaxed);

        let mut idle = self.idle.lock();
        let count: usize = idle.values().map(Vec::len).sum();
        if count < self.capacity {
            idle.entry(data.len()).or_default().push(data);
        }
    }
}

impl<T: Copy + Default + Send + 'static> ArrayPool<T> {
    /// Creates a pool keeping up to [`DEFAULT_POOL_CAPACITY`] idle buffers.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Creates a pool keeping up to `capacity` idle buffers.
    pub fn with_capacity(capacity: usize) -> Self {
        ArrayPool {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(HashMap::new()),
                capacity,
                acquired: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }),
        }
    }

    /// Acquires a buffer of the given length filled with `T::default()`.
    pub fn acquire(&self, len: usize) -> PooledArray<T> {
        let recycled = self.inner.idle.lock().get_mut(&len).and_then(Vec::pop);
        let data = match recycled {
            Some(mut data) => {
                data.fill(T::default());
                data
            }
            None => vec![T::default(); len].into_boxed_slice(),
        };

        self.inner.acquired.fetch_add(1, Ordering::Relaxed);
        PooledArray {
            data,
            pool: Arc::downgrade(&self.inner),
        }
    }

    /// Acquires a buffer holding a copy of `src`.
    pub fn acquire_copy(&self, src: &[T]) -> PooledArray<T> {
        let mut array = self.acquire(src.len());
        array.copy_from_slice(src);
        array
    }

    /// The acquisition and release counters of this pool.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.inner.acquired.load(Ordering::Relaxed),
            released: self.inner.released.load(Ordering::Relaxed),
            idle: self.inner.idle.lock().values().map(Vec::len).sum(),
        }
    }
}

impl<T: Copy + Default + Send + 'static> Default for ArrayPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ArrayPool<T> {
    fn clone(&self) -> Self {
        ArrayPool {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Copy + Default + Send + 'static> Debug for ArrayPool<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayPool")
            .field("capacity", &self.inner.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Counters describing the use of an [`ArrayPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers handed out since the pool was created.
    pub acquired: usize,
    /// Buffers returned since the pool was created.
    pub released: usize,
    /// Buffers currently kept for reuse.
    pub idle: usize,
}

impl PoolStats {
    /// The number of buffers currently in use.
    pub fn outstanding(&self) -> usize {
        self.acquired - self.released
    }
}

/// A buffer on loan from an [`ArrayPool`], returned to it exactly once when dropped.
///
/// Cloning acquires a new buffer from the same pool and copies the contents. A buffer that
/// outlives its pool is freed normally.
pub struct PooledArray<T> {
    data: Box<[T]>,
    pool: Weak<PoolInner<T>>,
}

impl<T> Deref for PooledArray<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for PooledArray<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Copy + Default + Send + 'static> Clone for PooledArray<T> {
    fn clone(&self) -> Self {
        match self.pool.upgrade() {
            Some(inner) => ArrayPool { inner }.acquire_copy(&self.data),
            None => PooledArray {
                data: self.data.clone(),
                pool: Weak::new(),
            },
        }
    }
}

impl<T: Debug> Debug for PooledArray<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&*self.data, f)
    }
}

impl<T> Drop for PooledArray<T> {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        if let Some(pool) = self.pool.upgrade() {
            pool.release(data);
        }
    }
}
