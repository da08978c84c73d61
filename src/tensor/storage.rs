//! Storage: GPU buffer ownership with Arc-based sharing

use parking_lot::Mutex;
use std::sync::Arc;
use wgpu::SubmissionIndex;

use crate::device::GpuContext;
use crate::error::Result;

/// Device-resident storage for array data.
///
/// Storage wraps one GPU buffer with reference counting, enabling zero-copy
/// views (reshape, slice, transpose) that share the underlying memory, plus
/// the completion token of the most recent write to the buffer.
///
/// A write through one view of a storage is visible through every other view
/// sharing it. The buffer is released when the last referencing view drops.
pub struct Storage {
    inner: Arc<StorageInner>,
}

struct StorageInner {
    /// Context that allocated the buffer; all dispatches go through it
    ctx: Arc<GpuContext>,
    /// The device buffer
    buffer: wgpu::Buffer,
    /// Number of f32 elements
    len: usize,
    /// Completion token for the most recent write, if any.
    ///
    /// Set after every kernel dispatch targeting this buffer; cleared by
    /// [`Storage::synchronize`]. Host-side reads of the buffer contents
    /// without synchronizing first are a data race.
    write_token: Mutex<Option<SubmissionIndex>>,
}

impl Storage {
    /// Allocate uninitialized storage for `len` elements
    pub fn new(len: usize, ctx: &Arc<GpuContext>) -> Result<Self> {
        let buffer = ctx.create_storage_buffer("stridr array", len * std::mem::size_of::<f32>());
        Ok(Self {
            inner: Arc::new(StorageInner {
                ctx: ctx.clone(),
                buffer,
                len,
                write_token: Mutex::new(None),
            }),
        })
    }

    /// Allocate storage and upload host data into it
    pub fn from_slice(data: &[f32], ctx: &Arc<GpuContext>) -> Result<Self> {
        let storage = Self::new(data.len(), ctx)?;
        if !data.is_empty() {
            ctx.write_buffer(storage.buffer(), data);
        }
        Ok(storage)
    }

    /// Get the device buffer
    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.inner.buffer
    }

    /// Get the number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// Check if the storage holds no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Get the owning context
    #[inline]
    pub fn context(&self) -> &Arc<GpuContext> {
        &self.inner.ctx
    }

    /// Get the reference count
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Check whether two storages share the same buffer
    #[inline]
    pub fn same_buffer(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Record the completion token of a just-enqueued write.
    ///
    /// The previous token, if any, is superseded: the queue is FIFO, so the
    /// newest submission completing implies every earlier one has.
    pub fn set_write_token(&self, token: SubmissionIndex) {
        *self.inner.write_token.lock() = Some(token);
    }

    /// Block until the last write to this storage has completed.
    ///
    /// Clears the token once observed. Must be called before any host-side
    /// read of the buffer contents. A storage with no pending write returns
    /// immediately.
    pub fn synchronize(&self) -> Result<()> {
        let token = self.inner.write_token.lock().take();
        if let Some(token) = token {
            self.inner.ctx.wait(Some(token))?;
        }
        Ok(())
    }
}

impl Clone for Storage {
    /// Clone increments the reference count (zero-copy)
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("len", &self.inner.len)
            .field("pending_write", &self.inner.write_token.lock().is_some())
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}
