//! Core Array type: a strided view over GPU storage

use std::sync::Arc;

use super::{Layout, Shape, Storage, Strides};
use crate::device::GpuContext;
use crate::error::{Error, Result};
use crate::ops;

/// N-dimensional `f32` array resident on a compute device.
///
/// An `Array` is a view: a [`Layout`] (shape, strides, offset) over a
/// reference-counted [`Storage`]. Derived views (reshape, slice, transpose)
/// share the same storage with a different layout and never copy data;
/// mutating through one view is visible through every alias.
///
/// A scalar array has an empty shape; its single element lives at the
/// layout's offset.
///
/// # Example
///
/// ```ignore
/// let ctx = GpuContext::global()?;
/// let a = Array::from_slice(&[1.0, 2.0, 3.0], &[3, 1], &ctx)?;
/// let b = Array::from_slice(&[10.0, 20.0, 30.0, 40.0], &[1, 4], &ctx)?;
/// let sum = a.add(&b)?; // shape [3, 4] via broadcasting
/// ```
pub struct Array {
    /// Shared device memory
    storage: Storage,
    /// Shape, strides, offset
    layout: Layout,
}

/// Host-side nested representation of an array, row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested {
    /// A single element (innermost level)
    Value(f32),
    /// One dimension of nesting
    List(Vec<Nested>),
}

impl Array {
    /// Create an array from existing storage and layout
    pub fn from_parts(storage: Storage, layout: Layout) -> Self {
        Self { storage, layout }
    }

    /// Create a contiguous array by uploading host data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if `data.len()` does not equal the product
    /// of the shape dimensions.
    pub fn from_slice(data: &[f32], shape: &[usize], ctx: &Arc<GpuContext>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::format(format!(
                "buffer holds {} elements but shape {:?} needs {}",
                data.len(),
                shape,
                expected
            )));
        }

        let storage = Storage::from_slice(data, ctx)?;
        Ok(Self {
            storage,
            layout: Layout::contiguous(shape),
        })
    }

    /// Create a contiguous array from a raw host byte buffer.
    ///
    /// The buffer must hold 4-byte float32 elements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the byte length is not a multiple of 4
    /// or the element count does not match the shape.
    pub fn from_bytes(bytes: &[u8], shape: &[usize], ctx: &Arc<GpuContext>) -> Result<Self> {
        if bytes.len() % std::mem::size_of::<f32>() != 0 {
            return Err(Error::format(format!(
                "byte buffer of length {} is not a whole number of float32 elements",
                bytes.len()
            )));
        }
        let mut data = vec![0f32; bytes.len() / std::mem::size_of::<f32>()];
        bytemuck::cast_slice_mut::<f32, u8>(&mut data).copy_from_slice(bytes);
        Self::from_slice(&data, shape, ctx)
    }

    /// Create an uninitialized contiguous array.
    ///
    /// The contents are undefined until written, typically as the output of
    /// a kernel dispatch.
    pub fn empty(shape: &[usize], ctx: &Arc<GpuContext>) -> Result<Self> {
        let len: usize = shape.iter().product();
        let storage = Storage::new(len, ctx)?;
        Ok(Self {
            storage,
            layout: Layout::contiguous(shape),
        })
    }

    // ===== Accessors =====

    /// Get the storage
    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Get the layout
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Get the owning context
    #[inline]
    pub fn context(&self) -> &Arc<GpuContext> {
        self.storage.context()
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Get the strides (in elements)
    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.layout.strides()
    }

    /// Get the offset into storage (in elements)
    #[inline]
    pub fn offset(&self) -> usize {
        self.layout.offset()
    }

    /// Number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// Total number of logical elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.layout.elem_count()
    }

    /// Check if the view is contiguous (row-major, offset 0)
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    /// Check if this is a scalar (0-dimensional array)
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.layout.is_scalar()
    }

    // ===== Views =====

    /// Construct a derived view over the same storage.
    ///
    /// Only the rank agreement of `shape` and `strides` is validated;
    /// in-bounds access is checked by the dispatcher consuming the view.
    pub fn view(&self, shape: &[usize], strides: &[isize], offset: usize) -> Result<Self> {
        if shape.len() != strides.len() {
            return Err(Error::InvalidArgument {
                arg: "strides",
                reason: format!(
                    "strides rank {} does not match shape rank {}",
                    strides.len(),
                    shape.len()
                ),
            });
        }

        let layout = Layout::new(
            Shape::from_slice(shape),
            Strides::from_slice(strides),
            offset,
        );
        Ok(Self {
            storage: self.storage.clone(),
            layout,
        })
    }

    /// Reinterpret a logically contiguous array with a new shape (zero-copy).
    ///
    /// # Errors
    ///
    /// [`Error::NotContiguous`] if the view's strides are not row-major;
    /// [`Error::ShapeMismatch`] if the element counts differ.
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Self> {
        if !self.layout.has_row_major_strides() {
            return Err(Error::NotContiguous);
        }

        let layout = self
            .layout
            .reshape(new_shape)
            .ok_or_else(|| Error::shape_mismatch(new_shape, self.shape()))?;

        Ok(Self {
            storage: self.storage.clone(),
            layout,
        })
    }

    /// Swap two dimensions (zero-copy; generally non-contiguous)
    pub fn transpose(&self, d0: usize, d1: usize) -> Result<Self> {
        let layout = self
            .layout
            .transpose(d0, d1)
            .ok_or_else(|| Error::InvalidArgument {
                arg: "dim",
                reason: format!(
                    "dimensions ({}, {}) out of range for rank {}",
                    d0,
                    d1,
                    self.ndim()
                ),
            })?;

        Ok(Self {
            storage: self.storage.clone(),
            layout,
        })
    }

    /// Materialize this view as a contiguous array.
    ///
    /// Returns a zero-copy clone when the view is already contiguous.
    pub fn contiguous(&self) -> Result<Self> {
        let (out, _) = ops::prepare(self)?;
        Ok(out)
    }

    // ===== Operations =====

    /// Element-wise addition with broadcasting
    pub fn add(&self, other: &Array) -> Result<Array> {
        ops::binary_op(self, other, "add")
    }

    /// Element-wise subtraction with broadcasting
    pub fn sub(&self, other: &Array) -> Result<Array> {
        ops::binary_op(self, other, "sub")
    }

    /// Element-wise multiplication with broadcasting
    pub fn mul(&self, other: &Array) -> Result<Array> {
        ops::binary_op(self, other, "mul")
    }

    /// Element-wise division with broadcasting
    pub fn div(&self, other: &Array) -> Result<Array> {
        ops::binary_op(self, other, "div")
    }

    /// Batched matrix multiplication
    pub fn matmul(&self, other: &Array) -> Result<Array> {
        ops::matmul(self, other)
    }

    /// Copy `src` into the region of this array's storage described by
    /// `shape`/`strides`/`offset` (e.g. writing into a slice in place).
    ///
    /// `src` must hold exactly `shape.iter().product()` elements; it is
    /// materialized contiguous first if needed.
    pub fn copy_from(
        &self,
        src: &Array,
        shape: &[usize],
        strides: &[isize],
        offset: usize,
    ) -> Result<()> {
        ops::copy_into(self, src, shape, strides, offset)
    }

    // ===== Synchronization and host reads =====

    /// Block until the last write to this array's storage has completed.
    ///
    /// Must be called before any host-side read of the buffer contents.
    pub fn synchronize(&self) -> Result<()> {
        self.storage.synchronize()
    }

    /// Read the array back to the host in flat row-major logical order.
    ///
    /// Synchronizes first. Non-contiguous views are materialized through the
    /// strided copy kernel, so the result always reflects the logical
    /// element ordering.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        let numel = self.numel();
        if numel == 0 {
            return Ok(Vec::new());
        }

        let (contig, _) = ops::prepare(self)?;
        contig.synchronize()?;

        let ctx = self.context();
        let size = numel * std::mem::size_of::<f32>();
        let staging = ctx.create_staging_buffer("readback", size);

        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback"),
            });
        encoder.copy_buffer_to_buffer(contig.storage.buffer(), 0, &staging, 0, size as u64);
        let idx = ctx.submit(encoder);
        ctx.wait(Some(idx))?;

        let mut out = vec![0f32; numel];
        ctx.read_buffer(&staging, &mut out)?;
        Ok(out)
    }

    /// Read a scalar array's single element.
    ///
    /// Synchronizes first. Fails with a shape error on any non-empty shape;
    /// use [`Array::to_vec`] or [`Array::to_nested`] for dimensioned data.
    pub fn item(&self) -> Result<f32> {
        if !self.is_scalar() {
            return Err(Error::shape_mismatch(&[], self.shape()));
        }

        self.synchronize()?;

        let ctx = self.context();
        let elem = std::mem::size_of::<f32>();
        let staging = ctx.create_staging_buffer("item", elem);

        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("item") });
        encoder.copy_buffer_to_buffer(
            self.storage.buffer(),
            (self.offset() * elem) as u64,
            &staging,
            0,
            elem as u64,
        );
        let idx = ctx.submit(encoder);
        ctx.wait(Some(idx))?;

        let mut out = [0f32; 1];
        ctx.read_buffer(&staging, &mut out)?;
        Ok(out[0])
    }

    /// Convert to a nested host-side structure, row-major.
    ///
    /// Synchronizes first. Fails on scalar (empty-shape) arrays, which have
    /// no dimensions to nest; use [`Array::item`] for those.
    pub fn to_nested(&self) -> Result<Nested> {
        if self.is_scalar() {
            return Err(Error::InvalidArgument {
                arg: "shape",
                reason: "scalar array has no dimensions; use item()".into(),
            });
        }

        let data = self.to_vec()?;
        Ok(build_nested(self.shape(), &data))
    }
}

impl Clone for Array {
    /// Clone is zero-copy: the new array aliases the same storage
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            layout: self.layout.clone(),
        }
    }
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Array")
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .field("offset", &self.offset())
            .finish()
    }
}

/// Build the nested structure for one dimension level
fn build_nested(shape: &[usize], data: &[f32]) -> Nested {
    if shape.is_empty() {
        return Nested::Value(data[0]);
    }

    let chunk = data.len() / shape[0].max(1);
    let items = (0..shape[0])
        .map(|i| build_nested(&shape[1..], &data[i * chunk..(i + 1) * chunk]))
        .collect();
    Nested::List(items)
}
